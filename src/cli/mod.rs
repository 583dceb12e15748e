pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, CurateArgs, PlanArgs, TransformArgs};
pub use handlers::{handle_curate, handle_plan, handle_transform};
pub use output::{OutputFormat, OutputFormatter};
