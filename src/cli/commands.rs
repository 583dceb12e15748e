use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_PLAN_FILE: &str = "planwright.yaml";
pub const DEFAULT_PROJECT_NAME: &str = "myproject";

/// Plans, curates and transforms source trees into deployable artifacts
#[derive(Parser, Debug)]
#[command(
    name = "planwright",
    about = "Plans, curates and transforms source trees into deployable artifacts",
    version,
    author,
    long_about = "planwright walks a source tree with a set of pluggable transformers, \
                  writes the candidate transformation chains per service into a plan, \
                  lets an operator narrow that plan down to one chain per service and \
                  finally runs the chosen transformers to produce an intermediate \
                  representation of services and container images."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect services and write a plan",
        long_about = "Runs every transformer's detection over the source tree and writes the \
                      merged plan.\n\n\
                      Examples:\n  \
                      planwright plan -s ./src\n  \
                      planwright plan -s ./src -n shop -c ./customizations -f shop.yaml"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Narrow a plan down to one chain per service",
        long_about = "Asks which modes, transformers, services and target cluster to keep and \
                      writes the curated plan.\n\n\
                      Examples:\n  \
                      planwright curate -f planwright.yaml\n  \
                      planwright curate -f planwright.yaml -o curated.yaml"
    )]
    Curate(CurateArgs),

    #[command(
        about = "Run the transformers of a plan",
        long_about = "Curates the plan (unless --skip-curation is given), runs the selected \
                      transformers and writes the merged IR and path mappings.\n\n\
                      Examples:\n  \
                      planwright transform -f planwright.yaml -o ./out\n  \
                      planwright transform -f curated.yaml -o ./out --skip-curation"
    )]
    Transform(TransformArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        short = 's',
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Source directory to analyse"
    )]
    pub source: PathBuf,

    #[arg(
        short = 'c',
        long,
        value_name = "DIR",
        help = "Directory with custom transformers and cluster metadata"
    )]
    pub customizations: Option<PathBuf>,

    #[arg(short = 'n', long, default_value = DEFAULT_PROJECT_NAME, help = "Project name")]
    pub name: String,

    #[arg(
        short = 'f',
        long = "plan",
        value_name = "FILE",
        default_value = DEFAULT_PLAN_FILE,
        help = "Plan file to write"
    )]
    pub plan_file: PathBuf,

    #[arg(long, value_enum, default_value = "human", help = "Summary format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct CurateArgs {
    #[arg(
        short = 'f',
        long = "plan",
        value_name = "FILE",
        default_value = DEFAULT_PLAN_FILE,
        help = "Plan file to curate"
    )]
    pub plan_file: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Where to write the curated plan (defaults to the input file)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "human", help = "Summary format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct TransformArgs {
    #[arg(
        short = 'f',
        long = "plan",
        value_name = "FILE",
        default_value = DEFAULT_PLAN_FILE,
        help = "Plan file to execute"
    )]
    pub plan_file: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Output directory"
    )]
    pub output: PathBuf,

    #[arg(long, help = "Use the plan as-is without asking any curation questions")]
    pub skip_curation: bool,

    #[arg(long, value_enum, default_value = "human", help = "Summary format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
