//! The three pipeline stages: build a plan from a source tree, curate it
//! down to one chain per service, and drive the transformers over it.

pub mod builder;
pub mod curator;
pub mod executor;

pub use builder::PlanBuilder;
pub use curator::{resolve_service, PlanCurator};
pub use executor::{ExecutionResult, Executor};
