//! Execution driver.
//!
//! Generation 0 hands each service's planned transformers a `Service`
//! artifact built from their plan. Every later generation routes the
//! artifacts produced by the previous one to each transformer that accepts
//! their type, until nothing new is produced or the generation cap is hit.
//! Services run independently; the transforms of one service run in order.

use crate::context::RunContext;
use crate::diagnostics::{Stage, Warnings};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::transformer::{TransformOutput, TransformerError, TransformerRegistry};
use crate::types::{
    Artifact, ArtifactConfig, ArtifactType, Ir, PathMapping, Plan, ServiceConfig, ServicePlan,
    TransformerPlan,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Everything the transform phase produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Project-wide IR merged from every IR artifact
    pub ir: Ir,
    /// Deferred file operations, without duplicates
    pub path_mappings: Vec<PathMapping>,
    /// Every artifact produced, in service order
    pub artifacts: Vec<Artifact>,
    pub warnings: Warnings,
}

/// Output of one service's chain.
#[derive(Debug, Default)]
struct ServiceRun {
    service: String,
    artifacts: Vec<Artifact>,
    path_mappings: Vec<PathMapping>,
    warnings: Warnings,
}

pub struct Executor {
    registry: Arc<TransformerRegistry>,
    run: Arc<RunContext>,
    progress: Arc<dyn ProgressHandler>,
}

impl Executor {
    pub fn new(registry: Arc<TransformerRegistry>, run: Arc<RunContext>) -> Self {
        Self {
            registry,
            run,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn execute(&self, plan: &Plan) -> ExecutionResult {
        let start = Instant::now();
        info!(services = plan.service_count(), "Transforming plan");

        let mut runs = Vec::with_capacity(plan.service_count());
        if self.run.parallel {
            let mut tasks = JoinSet::new();
            for (service, chain) in plan.services() {
                let registry = self.registry.clone();
                let service = service.clone();
                let chain = chain.clone();
                let max_generations = self.run.max_generations;
                tasks.spawn_blocking(move || {
                    run_service(&registry, service, &chain, max_generations)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(run) => runs.push(run),
                    Err(err) => warn!(error = %err, "Transform task failed"),
                }
            }
            runs.sort_by(|a, b| a.service.cmp(&b.service));
        } else {
            for (service, chain) in plan.services() {
                runs.push(run_service(
                    &self.registry,
                    service.clone(),
                    chain,
                    self.run.max_generations,
                ));
            }
        }

        let mut result = ExecutionResult {
            ir: Ir::new(self.run.project_name.clone()),
            ..Default::default()
        };
        for run in runs {
            self.progress.on_progress(&ProgressEvent::ServiceTransformed {
                service: run.service.clone(),
                artifacts: run.artifacts.len(),
                duration: start.elapsed(),
            });
            for artifact in &run.artifacts {
                if artifact.artifact_type == ArtifactType::Ir {
                    if let Some(fragment) = artifact.configs.ir() {
                        result.ir.merge(fragment.clone());
                    }
                }
            }
            for mapping in run.path_mappings {
                if !result.path_mappings.contains(&mapping) {
                    result.path_mappings.push(mapping);
                }
            }
            result.artifacts.extend(run.artifacts);
            result.warnings.extend(run.warnings);
        }

        self.progress.on_progress(&ProgressEvent::Completed {
            warnings: result.warnings.len(),
            total_time: start.elapsed(),
        });
        info!(
            services = result.ir.services.len(),
            containers = result.ir.containers.len(),
            path_mappings = result.path_mappings.len(),
            "Transformation complete"
        );
        result
    }
}

/// The `Service` artifact a planned transformer starts from.
fn service_artifact(service: &str, plan: &TransformerPlan) -> Artifact {
    let mut artifact = Artifact::new(service, ArtifactType::Service).with_paths(plan.paths.clone());
    artifact.configs = plan.configs.clone();
    if artifact.configs.service().is_none() {
        artifact.configs.insert(ArtifactConfig::Service(ServiceConfig {
            service_name: service.to_string(),
            ..Default::default()
        }));
    }
    artifact
}

fn run_service(
    registry: &TransformerRegistry,
    service: String,
    chain: &ServicePlan,
    max_generations: usize,
) -> ServiceRun {
    let mut run = ServiceRun {
        service: service.clone(),
        ..Default::default()
    };
    let mut seen: Vec<Artifact> = Vec::new();
    let mut frontier: Vec<Artifact> = Vec::new();

    for plan in chain {
        let Some(transformer) = registry.get(&plan.transformer_name) else {
            run.warnings.push(
                Stage::Transform,
                plan.transformer_name.as_str(),
                format!("Transformer is not loaded, skipping it for service {}", service),
            );
            continue;
        };
        let artifact = service_artifact(&service, plan);
        let result = transformer
            .transform(std::slice::from_ref(&artifact), &[])
            .map(|output| {
                narrow_to_plan(output, &transformer.metadata().artifact_types, plan)
            });
        seen.push(artifact);
        collect(&mut run, &mut frontier, transformer.name(), result);
    }

    let mut generation = 1;
    while !frontier.is_empty() {
        if generation >= max_generations {
            run.warnings.push(
                Stage::Transform,
                service.as_str(),
                format!(
                    "Stopped after {} generations with {} artifacts unconsumed",
                    generation,
                    frontier.len()
                ),
            );
            break;
        }
        let old = seen.clone();
        let current = std::mem::take(&mut frontier);
        for transformer in registry.iter() {
            let new: Vec<Artifact> = current
                .iter()
                .filter(|a| transformer.metadata().accepts(&a.artifact_type))
                .cloned()
                .collect();
            if new.is_empty() {
                continue;
            }
            debug!(
                service = %service,
                transformer = transformer.name(),
                generation,
                artifacts = new.len(),
                "Invoking transformer"
            );
            let result = transformer.transform(&new, &old);
            collect(&mut run, &mut frontier, transformer.name(), result);
        }
        seen.extend(current);
        generation += 1;
    }
    run
}

/// Drops produced artifacts whose type the transformer declares but curation
/// removed from `plan`.
fn narrow_to_plan(
    mut output: TransformOutput,
    declared: &[ArtifactType],
    plan: &TransformerPlan,
) -> TransformOutput {
    let removed: Vec<&ArtifactType> = declared
        .iter()
        .filter(|t| !plan.artifact_types.contains(t))
        .collect();
    if removed.is_empty() {
        return output;
    }
    let before = output.artifacts.len();
    output
        .artifacts
        .retain(|a| !removed.contains(&&a.artifact_type));
    if output.artifacts.len() < before {
        debug!(
            transformer = %plan.transformer_name,
            dropped = before - output.artifacts.len(),
            "Artifacts outside the curated plan dropped"
        );
    }
    output
}

fn collect(
    run: &mut ServiceRun,
    frontier: &mut Vec<Artifact>,
    transformer: &str,
    result: Result<TransformOutput, TransformerError>,
) {
    match result {
        Ok(output) => {
            run.warnings.extend(output.warnings);
            run.path_mappings.extend(output.path_mappings);
            run.artifacts.extend(output.artifacts.iter().cloned());
            frontier.extend(output.artifacts);
        }
        Err(err) => run.warnings.push(Stage::Transform, transformer, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanwrightConfig;
    use crate::qa::DefaultEngine;
    use crate::transformer::{Environment, Transformer, TransformerClass, TransformerMetadata};
    use crate::types::{Mode, ServiceIr};
    use tempfile::TempDir;

    /// Emits one artifact of `produces` per input, or fails.
    struct Relay {
        metadata: TransformerMetadata,
        env: Environment,
        produces: Option<ArtifactType>,
    }

    impl Transformer for Relay {
        fn metadata(&self) -> &TransformerMetadata {
            &self.metadata
        }

        fn environment(&self) -> &Environment {
            &self.env
        }

        fn transform(
            &self,
            new_artifacts: &[Artifact],
            _old_artifacts: &[Artifact],
        ) -> Result<TransformOutput, TransformerError> {
            let Some(produces) = &self.produces else {
                return Err(TransformerError::MissingInput {
                    artifact: new_artifacts[0].name.clone(),
                    what: "everything".into(),
                });
            };
            let mut output = TransformOutput::default();
            for artifact in new_artifacts {
                let mut produced = Artifact::new(artifact.name.clone(), produces.clone());
                if *produces == ArtifactType::Ir {
                    let mut ir = Ir::new("shop");
                    ir.add_service(ServiceIr::new(artifact.name.clone()));
                    produced = produced.with_config(ArtifactConfig::Ir(ir));
                }
                output.artifacts.push(produced);
            }
            Ok(output)
        }
    }

    fn run_context(dir: &TempDir, max_generations: usize) -> Arc<RunContext> {
        let config = PlanwrightConfig::default().with_assets_dir(dir.path().join("assets"));
        let mut run = RunContext::new(&config, "shop", dir.path(), &dir.path().join("out")).unwrap();
        run.max_generations = max_generations;
        Arc::new(run)
    }

    fn relay(
        run: &Arc<RunContext>,
        name: &str,
        consumes: ArtifactType,
        produces: Option<ArtifactType>,
    ) -> Arc<dyn Transformer> {
        let declared: Vec<ArtifactType> = produces.iter().cloned().collect();
        relay_declaring(run, name, consumes, produces, &declared)
    }

    fn relay_declaring(
        run: &Arc<RunContext>,
        name: &str,
        consumes: ArtifactType,
        produces: Option<ArtifactType>,
        declared: &[ArtifactType],
    ) -> Arc<dyn Transformer> {
        let mut metadata = TransformerMetadata::new(name, TransformerClass::DockerfileDetector);
        metadata.consumes = vec![consumes];
        metadata.artifact_types = declared.to_vec();
        Arc::new(Relay {
            metadata,
            env: Environment::new(run.clone(), "/assets", None, Arc::new(DefaultEngine)),
            produces,
        })
    }

    fn plan_with(services: &[(&str, &str)], artifact_types: &[ArtifactType]) -> Plan {
        let mut plan = Plan::new("shop", "/src");
        for (service, transformer) in services {
            plan.spec.services.insert(
                service.to_string(),
                vec![TransformerPlan {
                    transformer_name: transformer.to_string(),
                    mode: Some(Mode::Container),
                    artifact_types: artifact_types.to_vec(),
                    ..Default::default()
                }],
            );
        }
        plan
    }

    #[tokio::test]
    async fn test_chain_reaches_ir_despite_failing_sibling() {
        let dir = TempDir::new().unwrap();
        let run = run_context(&dir, 16);
        let registry = TransformerRegistry::from_transformers([
            relay(&run, "gen", ArtifactType::Service, Some(ArtifactType::DockerfileForService)),
            relay(&run, "ir", ArtifactType::DockerfileForService, Some(ArtifactType::Ir)),
            relay(&run, "broken", ArtifactType::DockerfileForService, None),
        ]);

        let result = Executor::new(Arc::new(registry), run)
            .execute(&plan_with(
                &[("web", "gen"), ("api", "gen")],
                &[ArtifactType::DockerfileForService],
            ))
            .await;

        assert_eq!(result.ir.services.keys().collect::<Vec<_>>(), vec!["api", "web"]);
        assert_eq!(result.warnings.count(Stage::Transform), 2);
        assert_eq!(result.artifacts.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_transformer_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let run = run_context(&dir, 16);
        let result = Executor::new(Arc::new(TransformerRegistry::new()), run)
            .execute(&plan_with(&[("web", "missing")], &[ArtifactType::DockerfileForService]))
            .await;
        assert!(result.ir.is_empty());
        assert_eq!(result.warnings.count(Stage::Transform), 1);
    }

    #[tokio::test]
    async fn test_generation_cap_stops_cycles() {
        let dir = TempDir::new().unwrap();
        let run = run_context(&dir, 4);
        let ping = ArtifactType::Custom("Ping".into());
        let pong = ArtifactType::Custom("Pong".into());
        let registry = TransformerRegistry::from_transformers([
            relay(&run, "gen", ArtifactType::Service, Some(ping.clone())),
            relay(&run, "ping", ping.clone(), Some(pong.clone())),
            relay(&run, "pong", pong, Some(ping)),
        ]);

        let result = Executor::new(Arc::new(registry), run)
            .execute(&plan_with(&[("web", "gen")], &[ArtifactType::Custom("Ping".into())]))
            .await;
        assert_eq!(result.warnings.count(Stage::Transform), 1);
        assert!(result.warnings.iter().any(|w| w.message.contains("Stopped after 4")));
    }

    #[tokio::test]
    async fn test_narrowed_plan_does_not_contribute_removed_type() {
        let dir = TempDir::new().unwrap();
        let run = run_context(&dir, 16);
        let declared = [ArtifactType::Ir, ArtifactType::ContainerBuild];
        let registry = Arc::new(TransformerRegistry::from_transformers([relay_declaring(
            &run,
            "compose",
            ArtifactType::Service,
            Some(ArtifactType::Ir),
            &declared,
        )]));

        let narrowed = Executor::new(registry.clone(), run.clone())
            .execute(&plan_with(&[("web", "compose")], &[ArtifactType::ContainerBuild]))
            .await;
        assert!(narrowed.ir.is_empty());
        assert!(narrowed.artifacts.is_empty());

        let full = Executor::new(registry, run)
            .execute(&plan_with(&[("web", "compose")], &declared))
            .await;
        assert_eq!(full.ir.services.keys().collect::<Vec<_>>(), vec!["web"]);
        assert_eq!(full.artifacts.len(), 1);
    }
}
