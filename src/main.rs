use planwright::cli::commands::{CliArgs, Commands};
use planwright::cli::handlers::{handle_curate, handle_plan, handle_transform};
use planwright::util::{init_logging, LoggingConfig};
use planwright::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("planwright v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Plan(plan_args) => handle_plan(plan_args, args.quiet).await,
        Commands::Curate(curate_args) => handle_curate(curate_args, args.quiet).await,
        Commands::Transform(transform_args) => handle_transform(transform_args, args.quiet).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    init_logging(LoggingConfig::from_env().with_overrides(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));
}
