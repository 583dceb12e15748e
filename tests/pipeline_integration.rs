//! Plan, curate and transform a mixed source tree through the library API.

mod common;

use common::{write, Workspace};
use planwright::configuration::ClusterMdLoader;
use planwright::qa::{keys, DefaultEngine, ScriptedQaEngine};
use planwright::types::{PathKind, PathMappingKind};
use planwright::{
    ArtifactType, Executor, Mode, Plan, PlanBuilder, PlanCurator, RunContext, Stage,
    TransformerRegistry,
};
use std::path::Path;
use std::sync::Arc;

async fn create_plan(ws: &Workspace) -> (Plan, planwright::Warnings) {
    let builder = PlanBuilder::new(ws.run(&ws.out()), Arc::new(DefaultEngine));
    builder.create_plan().await.unwrap().into_parts()
}

fn transformer_names(plan: &Plan, service: &str) -> Vec<String> {
    plan.services()[service]
        .iter()
        .map(|t| t.transformer_name.clone())
        .collect()
}

#[tokio::test]
async fn test_plan_collects_candidates_per_service() {
    let ws = Workspace::new();
    let (plan, warnings) = create_plan(&ws).await;

    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    assert_eq!(
        plan.services().keys().cloned().collect::<Vec<_>>(),
        vec!["blog", "cache", "orders-api", "web"]
    );
    assert_eq!(
        transformer_names(&plan, "web"),
        vec!["ComposeAnalyser", "PhpDockerfileGenerator"]
    );
    assert_eq!(transformer_names(&plan, "orders-api"), vec!["MavenAnalyser"]);
    assert_eq!(transformer_names(&plan, "blog"), vec!["PhpDockerfileGenerator"]);
    assert_eq!(plan.spec.target_cluster.cluster_type, "Kubernetes");
    assert_eq!(plan.spec.configuration.transformers.len(), 5);
}

#[tokio::test]
async fn test_compose_dockerfile_resolves_against_build_context() {
    let ws = Workspace::new();
    let (plan, _) = create_plan(&ws).await;

    let compose = &plan.services()["web"][0];
    let source = ws.source().canonicalize().unwrap();
    assert_eq!(
        compose.paths[&PathKind::Dockerfile],
        vec![source.join("web").join("Dockerfile.prod")]
    );
    assert_eq!(compose.paths[&PathKind::ProjectPath], vec![source.join("web")]);
    assert_eq!(
        compose.paths[&PathKind::DockerCompose],
        vec![source.join("docker-compose.yml")]
    );
}

#[tokio::test]
async fn test_planning_is_idempotent() {
    let ws = Workspace::new();
    let (first, _) = create_plan(&ws).await;
    let (second, _) = create_plan(&ws).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_saved_plan_round_trips() {
    let ws = Workspace::new();
    let (plan, _) = create_plan(&ws).await;
    let curated = PlanCurator::new(&DefaultEngine, &ClusterMdLoader)
        .curate_plan(plan)
        .value;

    let path = ws.path().join("plan.yaml");
    curated.save(&path).unwrap();
    let loaded = Plan::load(&path).unwrap();

    assert_eq!(loaded.services(), curated.services());
    assert_eq!(loaded.spec.target_cluster, curated.spec.target_cluster);
    assert_eq!(loaded, curated);
}

#[tokio::test]
async fn test_curation_drops_redundant_plans() {
    let ws = Workspace::new();
    let (plan, _) = create_plan(&ws).await;
    let (curated, warnings) = PlanCurator::new(&DefaultEngine, &ClusterMdLoader)
        .curate_plan(plan)
        .into_parts();

    assert!(warnings.is_empty());
    assert_eq!(curated.service_count(), 4);
    // The compose plan already yields the container build for web
    assert_eq!(transformer_names(&curated, "web"), vec!["ComposeAnalyser"]);
}

#[tokio::test]
async fn test_deselecting_every_mode_empties_the_plan() {
    let ws = Workspace::new();
    let (plan, _) = create_plan(&ws).await;
    let qa = ScriptedQaEngine::new().with_multi(keys::MODES, &[]);
    let (curated, warnings) = PlanCurator::new(&qa, &ClusterMdLoader)
        .curate_plan(plan)
        .into_parts();

    assert!(curated.is_empty());
    assert_eq!(warnings.count(Stage::Curation), 4);
}

#[tokio::test]
async fn test_transform_produces_merged_ir() {
    let ws = Workspace::new();
    let (plan, _) = create_plan(&ws).await;
    let qa: Arc<DefaultEngine> = Arc::new(DefaultEngine);
    let plan = PlanCurator::new(qa.as_ref(), &ClusterMdLoader)
        .curate_plan(plan)
        .value;

    let output = ws.out().join("shop");
    let run = ws.run(&output);
    let registry = TransformerRegistry::from_plan(&plan, run.clone(), None, qa)
        .unwrap()
        .value;
    assert!(registry.get("DockerfileServiceGenerator").is_some());
    assert!(registry.get("DockerfileDetector").is_none());

    let result = Executor::new(Arc::new(registry), run).execute(&plan).await;
    assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);

    let ir = &result.ir;
    assert_eq!(ir.name, "shop");
    assert_eq!(
        ir.services.keys().cloned().collect::<Vec<_>>(),
        vec!["blog", "cache", "orders-api", "web"]
    );

    let web = &ir.services["web"];
    assert!(web.images.contains("shop-web:latest"));
    assert!(web.ports.contains(&80));
    assert_eq!(web.environment["APP_ENV"], "prod");
    let source = ws.source().canonicalize().unwrap();
    let web_build = ir.containers["shop-web:latest"].build.as_ref().unwrap();
    assert_eq!(web_build.dockerfile, source.join("web/Dockerfile.prod"));

    assert!(ir.services["cache"].images.contains("redis:7"));

    let blog = &ir.services["blog"];
    assert!(blog.images.contains("blog:latest"));
    assert!(blog.ports.contains(&8081));
    let blog_build = ir.containers["blog:latest"].build.as_ref().unwrap();
    assert_eq!(blog_build.context, output.join("source").join("blog"));

    let api = &ir.services["orders-api"];
    assert!(api.images.contains("orders-api:latest"));
    assert!(api.ports.contains(&8080));

    let sources = result
        .path_mappings
        .iter()
        .filter(|m| m.kind == PathMappingKind::Source)
        .count();
    let templates: Vec<&Path> = result
        .path_mappings
        .iter()
        .filter(|m| m.kind == PathMappingKind::Template)
        .map(|m| m.dest_path.as_path())
        .collect();
    assert_eq!(sources, 1);
    assert!(templates.contains(&Path::new("source/blog")));
    assert!(templates.contains(&Path::new("source/api")));

    assert!(result
        .artifacts
        .iter()
        .any(|a| a.artifact_type == ArtifactType::DockerfileForService && a.name == "blog"));
}

#[tokio::test]
async fn test_first_selected_mode_wins_per_service() {
    let ws = Workspace::new();
    let custom = ws.path().join("custom");
    write(
        &custom,
        "serverless.yaml",
        r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: ServerlessDockerfile
spec:
  class: DockerfileDetector
  mode: Serverless
  consumes: [Service]
  artifactTypes: [ContainerBuild]
  baseArtifactTypes: [ContainerBuild]
"#,
    );
    write(&ws.source(), "fn/Dockerfile", "FROM scratch\n");

    let run = Arc::new(
        RunContext::new(&ws.config(), "shop", &ws.source(), &ws.out())
            .unwrap()
            .with_customizations(Some(&custom))
            .unwrap(),
    );
    let (plan, _) = PlanBuilder::new(run, Arc::new(DefaultEngine))
        .create_plan()
        .await
        .unwrap()
        .into_parts();
    assert_eq!(
        transformer_names(&plan, "fn"),
        vec!["DockerfileDetector", "ServerlessDockerfile"]
    );

    let both = PlanCurator::new(&DefaultEngine, &ClusterMdLoader)
        .curate_plan(plan.clone())
        .value;
    assert_eq!(transformer_names(&both, "fn"), vec!["DockerfileDetector"]);

    let qa = ScriptedQaEngine::new().with_multi(keys::MODES, &["Serverless"]);
    let serverless = PlanCurator::new(&qa, &ClusterMdLoader)
        .curate_plan(plan)
        .value;
    assert_eq!(transformer_names(&serverless, "fn"), vec!["ServerlessDockerfile"]);
    assert_eq!(serverless.services()["fn"][0].mode(), Some(&Mode::Serverless));
    // Every other service only offers Container
    assert_eq!(serverless.service_count(), 1);
}
