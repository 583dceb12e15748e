//! Command handlers. Each returns the process exit code.

use crate::cli::commands::{CurateArgs, PlanArgs, TransformArgs};
use crate::cli::output::{OutputFormat, OutputFormatter};
use crate::config::PlanwrightConfig;
use crate::configuration::{ClusterMdLoader, ClusterMetadataSource};
use crate::context::RunContext;
use crate::diagnostics::{Outcome, Warnings};
use crate::planner::{ExecutionResult, Executor, PlanBuilder, PlanCurator};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::qa::{build_engine, QaEngine};
use crate::transformer::TransformerRegistry;
use crate::types::Plan;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_EMPTY_PLAN: i32 = 2;

pub const IR_FILE: &str = "ir.yaml";
pub const PATH_MAPPINGS_FILE: &str = "pathmappings.yaml";

fn load_config() -> Option<PlanwrightConfig> {
    let config = PlanwrightConfig::default();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your PLANWRIGHT_* environment variables.");
        return None;
    }
    debug!("{}", config);
    Some(config)
}

fn qa_engine(config: &PlanwrightConfig) -> Option<Arc<dyn QaEngine>> {
    match build_engine(config) {
        Ok(engine) => Some(engine),
        Err(e) => {
            error!("Failed to prepare question answering: {}", e);
            None
        }
    }
}

fn print_summary(summary: Result<String>, quiet: bool) {
    match summary {
        Ok(text) if !quiet => println!("{}", text),
        Ok(_) => {}
        Err(e) => error!("Failed to format output: {:#}", e),
    }
}

pub async fn handle_plan(args: &PlanArgs, quiet: bool) -> i32 {
    info!("Planning {}", args.source.display());

    let Some(config) = load_config() else {
        return EXIT_FAILURE;
    };
    let Some(qa) = qa_engine(&config) else {
        return EXIT_FAILURE;
    };

    let outcome = match create_plan(args, &config, qa).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Planning failed: {:#}", e);
            LoggingHandler.on_progress(&ProgressEvent::Failed {
                error: format!("{:#}", e),
            });
            return EXIT_FAILURE;
        }
    };
    let (plan, warnings) = outcome.into_parts();

    if let Err(e) = plan.save(&args.plan_file) {
        error!("{}", e);
        return EXIT_FAILURE;
    }
    info!("Plan written to {}", args.plan_file.display());

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    print_summary(formatter.format_plan(&plan, &warnings), quiet);

    if plan.is_empty() {
        error!("No services detected in {}", args.source.display());
        return EXIT_EMPTY_PLAN;
    }
    EXIT_OK
}

async fn create_plan(
    args: &PlanArgs,
    config: &PlanwrightConfig,
    qa: Arc<dyn QaEngine>,
) -> Result<Outcome<Plan>> {
    // Planning writes nothing here; the dir is only excluded from the walk
    let run = RunContext::new(config, &args.name, &args.source, &config.assets_dir.join("out"))?
        .with_customizations(args.customizations.as_deref())?;
    debug!(run_id = %run.run_id, "Run context ready");

    PlanBuilder::new(Arc::new(run), qa)
        .with_progress(Arc::new(LoggingHandler))
        .create_plan()
        .await
}

pub async fn handle_curate(args: &CurateArgs, quiet: bool) -> i32 {
    let Some(config) = load_config() else {
        return EXIT_FAILURE;
    };
    let Some(qa) = qa_engine(&config) else {
        return EXIT_FAILURE;
    };

    let plan = match Plan::load(&args.plan_file) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            return EXIT_FAILURE;
        }
    };

    let (plan, warnings) = curate(plan, qa.as_ref(), &ClusterMdLoader);

    let output = args.output.as_deref().unwrap_or(args.plan_file.as_path());
    if let Err(e) = plan.save(output) {
        error!("{}", e);
        return EXIT_FAILURE;
    }
    info!("Curated plan written to {}", output.display());

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    print_summary(formatter.format_plan(&plan, &warnings), quiet);

    if plan.is_empty() {
        error!("Nothing left to transform after curation");
        return EXIT_EMPTY_PLAN;
    }
    EXIT_OK
}

fn curate(plan: Plan, qa: &dyn QaEngine, clusters: &dyn ClusterMetadataSource) -> (Plan, Warnings) {
    let before = plan.service_count();
    let (plan, warnings) = PlanCurator::new(qa, clusters).curate_plan(plan).into_parts();
    LoggingHandler.on_progress(&ProgressEvent::CurationComplete {
        services: plan.service_count(),
        dropped: before.saturating_sub(plan.service_count()),
    });
    (plan, warnings)
}

pub async fn handle_transform(args: &TransformArgs, quiet: bool) -> i32 {
    let Some(config) = load_config() else {
        return EXIT_FAILURE;
    };
    let Some(qa) = qa_engine(&config) else {
        return EXIT_FAILURE;
    };

    let plan = match Plan::load(&args.plan_file) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            return EXIT_FAILURE;
        }
    };

    let plan = if args.skip_curation {
        debug!("Skipping curation");
        plan
    } else {
        curate(plan, qa.as_ref(), &ClusterMdLoader).0
    };

    if plan.is_empty() {
        error!("Plan {} has no services to transform", args.plan_file.display());
        return EXIT_EMPTY_PLAN;
    }

    let project_dir = args.output.join(plan.name());
    let result = match transform(&plan, &config, qa, &project_dir).await {
        Ok(result) => result,
        Err(e) => {
            error!("Transformation failed: {:#}", e);
            LoggingHandler.on_progress(&ProgressEvent::Failed {
                error: format!("{:#}", e),
            });
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = write_results(&result, &project_dir) {
        error!("{:#}", e);
        return EXIT_FAILURE;
    }

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    print_summary(formatter.format_execution(&result), quiet);
    EXIT_OK
}

async fn transform(
    plan: &Plan,
    config: &PlanwrightConfig,
    qa: Arc<dyn QaEngine>,
    project_dir: &Path,
) -> Result<ExecutionResult> {
    let run = Arc::new(
        RunContext::new(config, plan.name(), &plan.spec.root_dir, project_dir)?
            .with_customizations(plan.spec.customizations_dir.as_deref())?,
    );

    let cluster = ClusterMdLoader.target_cluster_metadata_for_plan(plan).ok();
    let (registry, warnings) = TransformerRegistry::from_plan(plan, run.clone(), cluster, qa)
        .context("Failed to load transformers")?
        .into_parts();

    let mut result = Executor::new(Arc::new(registry), run)
        .with_progress(Arc::new(LoggingHandler))
        .execute(plan)
        .await;

    let mut all = warnings;
    all.extend(std::mem::take(&mut result.warnings));
    result.warnings = all;
    Ok(result)
}

/// Writes the merged IR and the path mappings under `project_dir`.
pub fn write_results(result: &ExecutionResult, project_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let ir_path = project_dir.join(IR_FILE);
    let ir = serde_yaml::to_string(&result.ir).context("Failed to serialize IR")?;
    std::fs::write(&ir_path, ir).with_context(|| format!("Failed to write {}", ir_path.display()))?;

    let mappings_path = project_dir.join(PATH_MAPPINGS_FILE);
    let mappings =
        serde_yaml::to_string(&result.path_mappings).context("Failed to serialize path mappings")?;
    std::fs::write(&mappings_path, mappings)
        .with_context(|| format!("Failed to write {}", mappings_path.display()))?;

    info!("Results written to {}", project_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ir, PathMapping, PathMappingKind, ServiceIr};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_write_results() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join("out").join("shop");

        let mut ir = Ir::new("shop");
        ir.add_service(ServiceIr::new("web"));
        let result = ExecutionResult {
            ir,
            path_mappings: vec![PathMapping {
                kind: PathMappingKind::Source,
                source_path: PathBuf::from("/src/shop"),
                dest_path: PathBuf::from("source"),
                template_config: None,
            }],
            ..Default::default()
        };

        write_results(&result, &project_dir).unwrap();

        let ir: Ir =
            serde_yaml::from_str(&std::fs::read_to_string(project_dir.join(IR_FILE)).unwrap())
                .unwrap();
        assert!(ir.services.contains_key("web"));

        let mappings: Vec<PathMapping> = serde_yaml::from_str(
            &std::fs::read_to_string(project_dir.join(PATH_MAPPINGS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].kind, PathMappingKind::Source);
    }
}
