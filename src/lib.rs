//! planwright - plan, curate and transform source trees into containerized
//! deployments
//!
//! A run has three phases:
//!
//! - **Plan**: every registered transformer inspects the source tree and
//!   proposes candidate transformation chains per service. The result is a
//!   persisted, human-editable [`Plan`].
//! - **Curate**: an operator (or an answers file) narrows the plan down to
//!   one mode, one set of transformers and one chain per service, and picks
//!   a target cluster type.
//! - **Transform**: the chosen transformers run generation by generation,
//!   passing artifacts to each other until a fixed point is reached. IR
//!   artifacts are merged into one project-wide [`Ir`].
//!
//! # Example Usage
//!
//! ```ignore
//! use planwright::{PlanBuilder, PlanCurator, PlanwrightConfig, RunContext};
//! use planwright::configuration::ClusterMdLoader;
//! use planwright::qa::build_engine;
//! use std::sync::Arc;
//!
//! async fn plan(source: &std::path::Path) -> anyhow::Result<()> {
//!     let config = PlanwrightConfig::default();
//!     let qa = build_engine(&config)?;
//!     let run = Arc::new(RunContext::new(&config, "shop", source, &source.join("out"))?);
//!
//!     let plan = PlanBuilder::new(run, qa.clone()).create_plan().await?.value;
//!     let curated = PlanCurator::new(qa.as_ref(), &ClusterMdLoader).curate_plan(plan);
//!     curated.value.save(std::path::Path::new("planwright.yaml"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`types`]: plan, artifact, config payload and IR records
//! - [`transformer`]: the transformer contract, definitions, registry and
//!   built-in classes
//! - [`planner`]: plan builder, curator and execution driver
//! - [`qa`]: question answering engines
//! - [`configuration`]: plan configuration loaders and cluster metadata

pub mod cli;
pub mod config;
pub mod configuration;
pub mod context;
pub mod diagnostics;
pub mod planner;
pub mod progress;
pub mod qa;
pub mod transformer;
pub mod types;
pub mod util;

pub use config::{ConfigError, PlanwrightConfig, QaMode};
pub use context::RunContext;
pub use diagnostics::{Outcome, Stage, Warning, Warnings};
pub use planner::{ExecutionResult, Executor, PlanBuilder, PlanCurator};
pub use transformer::{Transformer, TransformerError, TransformerRegistry};
pub use types::{Artifact, ArtifactType, Ir, Mode, PathMapping, Plan, PlanError};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_planwright() {
        assert_eq!(NAME, "planwright");
    }
}
