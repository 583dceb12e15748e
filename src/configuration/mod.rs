//! Configuration loaders that adjust a plan before detection runs, and the
//! cluster metadata collaborator.

pub mod cluster;

pub use cluster::{ClusterError, ClusterMdLoader, ClusterMetadata, ClusterMetadataSource};

use crate::diagnostics::{Stage, Warnings};
use crate::types::Plan;
use tracing::info;

/// Something that can refine a freshly created plan.
pub trait ConfigurationLoader: Send + Sync {
    fn name(&self) -> &str;

    fn update_plan(&self, plan: &mut Plan) -> anyhow::Result<()>;
}

/// Runs every loader in order; failures are recorded and the plan is used
/// as the loader left it.
pub fn apply_loaders(loaders: &[Box<dyn ConfigurationLoader>], plan: &mut Plan) -> Warnings {
    let mut warnings = Warnings::new();
    for loader in loaders {
        info!(loader = loader.name(), "Loading configuration");
        match loader.update_plan(plan) {
            Ok(()) => info!(loader = loader.name(), "Configuration loaded"),
            Err(err) => warnings.push(Stage::ConfigLoad, loader.name(), format!("{:#}", err)),
        }
    }
    warnings
}
