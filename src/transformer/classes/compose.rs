//! Docker Compose analyser.
//!
//! Root detection names one service per compose service. Compose files are
//! read with an ordered parser chain: the `services:` schema (versions 2 and
//! 3) first, then the legacy top-level schema. The first parser that accepts
//! a file wins.

use crate::diagnostics::{Stage, Warnings};
use crate::transformer::common::{files_by_ext, make_image_name_compliant, resolve};
use crate::transformer::{
    DetectedServices, Environment, TransformOutput, Transformer, TransformerError,
    TransformerMetadata,
};
use crate::types::{
    merge_services, Artifact, ArtifactConfig, ArtifactType, ComposeConfig, ContainerBuild,
    ContainerImage, ImageInfo, Ir, Mode, PathKind, ServiceIr, ServicePlan, TransformerPlan,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ComposeAnalyser {
    metadata: TransformerMetadata,
    env: Environment,
}

/// A compose service, independent of the file format version it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeService {
    pub name: String,
    pub image: Option<String>,
    pub build_context: Option<String>,
    pub dockerfile: Option<String>,
    pub ports: Vec<u16>,
    pub environment: BTreeMap<String, String>,
}

type ComposeParser = fn(&str) -> Result<Vec<ComposeService>, String>;

/// Parsers tried in order until one succeeds.
const PARSERS: &[(&str, ComposeParser)] = &[("v3", parse_v3), ("v1", parse_v1)];

/// Parses `content` with the first parser that accepts it.
///
/// On failure every parser's error is returned for diagnostics.
pub fn parse_compose(content: &str) -> Result<(&'static str, Vec<ComposeService>), Vec<String>> {
    let mut errors = Vec::new();
    for (version, parser) in PARSERS {
        match parser(content) {
            Ok(services) => return Ok((*version, services)),
            Err(err) => errors.push(format!("{}: {}", version, err)),
        }
    }
    Err(errors)
}

#[derive(Deserialize)]
struct ComposeV3 {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<serde_yaml::Value>,
    services: BTreeMap<String, ServiceV3>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServiceV3 {
    image: Option<String>,
    build: Option<BuildV3>,
    ports: Vec<serde_yaml::Value>,
    environment: Option<EnvSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildV3 {
    Context(String),
    Full {
        context: Option<String>,
        dockerfile: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvSpec {
    List(Vec<String>),
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServiceV1 {
    image: Option<String>,
    build: Option<String>,
    dockerfile: Option<String>,
    ports: Vec<serde_yaml::Value>,
    environment: Option<EnvSpec>,
}

fn parse_v3(content: &str) -> Result<Vec<ComposeService>, String> {
    let doc: ComposeV3 = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    Ok(doc
        .services
        .into_iter()
        .map(|(name, svc)| {
            let (build_context, dockerfile) = match svc.build {
                Some(BuildV3::Context(ctx)) => (Some(ctx), None),
                Some(BuildV3::Full {
                    context,
                    dockerfile,
                }) => (context.or_else(|| Some(".".to_string())), dockerfile),
                None => (None, None),
            };
            ComposeService {
                name,
                image: svc.image,
                build_context,
                dockerfile,
                ports: container_ports(&svc.ports),
                environment: environment(svc.environment),
            }
        })
        .collect())
}

fn parse_v1(content: &str) -> Result<Vec<ComposeService>, String> {
    let doc: BTreeMap<String, ServiceV1> =
        serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    if doc.is_empty() {
        return Err("no services".to_string());
    }
    if let Some((name, _)) = doc.iter().find(|(_, s)| s.image.is_none() && s.build.is_none()) {
        return Err(format!("service {} has neither image nor build", name));
    }
    Ok(doc
        .into_iter()
        .map(|(name, svc)| ComposeService {
            name,
            image: svc.image,
            build_context: svc.build,
            dockerfile: svc.dockerfile,
            ports: container_ports(&svc.ports),
            environment: environment(svc.environment),
        })
        .collect())
}

/// Files that are expected to hold compose services, so a parse failure is
/// worth reporting.
fn is_compose_file_name(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains("compose"))
        .unwrap_or(false)
}

/// Container-side port of each port spec (`80`, `"8080:80"`,
/// `"127.0.0.1:8080:80/tcp"`, `{target: 80}`).
fn container_ports(specs: &[serde_yaml::Value]) -> Vec<u16> {
    let mut ports: Vec<u16> = specs
        .iter()
        .filter_map(|spec| match spec {
            serde_yaml::Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            serde_yaml::Value::String(s) => s
                .split('/')
                .next()
                .and_then(|s| s.rsplit(':').next())
                .and_then(|p| p.trim().parse().ok()),
            serde_yaml::Value::Mapping(_) => spec
                .get("target")
                .and_then(|t| t.as_u64())
                .and_then(|p| u16::try_from(p).ok()),
            _ => None,
        })
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

fn environment(spec: Option<EnvSpec>) -> BTreeMap<String, String> {
    match spec {
        Some(EnvSpec::List(items)) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (item, String::new()),
            })
            .collect(),
        Some(EnvSpec::Map(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Some(serde_yaml::Value::String(s)) => s,
                    Some(serde_yaml::Value::Number(n)) => n.to_string(),
                    Some(serde_yaml::Value::Bool(b)) => b.to_string(),
                    _ => String::new(),
                };
                (k, value)
            })
            .collect(),
        None => BTreeMap::new(),
    }
}

impl ComposeAnalyser {
    pub fn new(metadata: TransformerMetadata, env: Environment) -> Result<Self, TransformerError> {
        Ok(Self { metadata, env })
    }

    fn plan_for(
        &self,
        compose_path: &Path,
        service: &ComposeService,
        image_info_paths: &BTreeMap<String, PathBuf>,
    ) -> TransformerPlan {
        let mut plan = TransformerPlan {
            transformer_name: self.metadata.name.clone(),
            mode: self.metadata.mode.clone().or(Some(Mode::Container)),
            artifact_types: self.metadata.artifact_types.clone(),
            base_artifact_types: self.metadata.base_artifact_types.clone(),
            ..Default::default()
        }
        .with_config(ArtifactConfig::ComposeService(ComposeConfig {
            service_name: service.name.clone(),
        }))
        .with_path(PathKind::DockerCompose, compose_path);

        if let Some(info_path) = service.image.as_ref().and_then(|i| image_info_paths.get(i)) {
            plan = plan.with_path(PathKind::ImageInfo, info_path.clone());
        }

        if let Some(context) = service.build_context.as_deref().filter(|c| !c.is_empty()) {
            let compose_dir = compose_path.parent().unwrap_or_else(|| Path::new(""));
            let context_path = resolve(compose_dir, context);
            let dockerfile = resolve(
                &context_path,
                service.dockerfile.as_deref().unwrap_or("Dockerfile"),
            );
            plan = plan
                .with_path(PathKind::Dockerfile, dockerfile)
                .with_path(PathKind::ProjectPath, context_path);
        }
        debug!(service = %service.name, "Found a docker compose service");
        plan
    }

    fn services_from_file(
        &self,
        path: &Path,
        image_info_paths: &BTreeMap<String, PathBuf>,
        warnings: &mut Warnings,
    ) -> BTreeMap<String, ServicePlan> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        match parse_compose(&content) {
            Ok((version, services)) => {
                debug!(path = %path.display(), version, "Found a docker compose file");
                services
                    .iter()
                    .map(|s| (s.name.clone(), vec![self.plan_for(path, s, image_info_paths)]))
                    .collect()
            }
            Err(errors) if is_compose_file_name(path) => {
                warnings.push(
                    Stage::ParseFallback,
                    self.metadata.name.as_str(),
                    format!(
                        "Unable to parse compose file {}: {}",
                        path.display(),
                        errors.join("; ")
                    ),
                );
                BTreeMap::new()
            }
            Err(errors) => {
                debug!(path = %path.display(), errors = ?errors, "Not a docker compose file");
                BTreeMap::new()
            }
        }
    }

    fn ir_for(&self, artifact: &Artifact, config: &ComposeConfig, warnings: &mut Warnings) -> Ir {
        let mut ir = Ir::new(self.env.project_name());
        for path in artifact.paths.get(&PathKind::DockerCompose).into_iter().flatten() {
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| vec![e.to_string()])
                .and_then(|content| parse_compose(&content));
            match parsed {
                Ok((_, services)) => {
                    let compose_dir = path.parent().unwrap_or_else(|| Path::new(""));
                    for service in services.into_iter().filter(|s| s.name == config.service_name) {
                        self.add_service(&mut ir, compose_dir, service);
                    }
                }
                Err(errors) => warnings.push(
                    Stage::ParseFallback,
                    self.metadata.name.as_str(),
                    format!("Unable to parse compose file {}: {}", path.display(), errors.join("; ")),
                ),
            }
        }

        for path in artifact.paths.get(&PathKind::ImageInfo).into_iter().flatten() {
            match ImageInfo::read(path) {
                Ok(Some(info)) => {
                    for tag in &info.spec.tags {
                        ir.add_container(tag.clone(), container_from_image_info(&info));
                    }
                }
                Ok(None) => {}
                Err(err) => warnings.push(
                    Stage::Transform,
                    self.metadata.name.as_str(),
                    format!("Failed to read image info {}: {}", path.display(), err),
                ),
            }
        }
        ir
    }

    fn add_service(&self, ir: &mut Ir, compose_dir: &Path, service: ComposeService) {
        let image = service.image.clone().unwrap_or_else(|| {
            format!(
                "{}-{}:latest",
                make_image_name_compliant(self.env.project_name()),
                make_image_name_compliant(&service.name)
            )
        });
        let mut svc = ServiceIr::new(service.name.clone());
        svc.images.insert(image.clone());
        svc.ports.extend(service.ports.iter().copied());
        svc.environment = service.environment;

        if let Some(context) = service.build_context.as_deref() {
            let context_path = resolve(compose_dir, context);
            let dockerfile = resolve(
                &context_path,
                service.dockerfile.as_deref().unwrap_or("Dockerfile"),
            );
            ir.add_container(
                image,
                ContainerImage {
                    exposed_ports: service.ports.into_iter().collect(),
                    build: Some(ContainerBuild {
                        context: context_path,
                        dockerfile,
                    }),
                    ..Default::default()
                },
            );
        }
        ir.add_service(svc);
    }
}

fn container_from_image_info(info: &ImageInfo) -> ContainerImage {
    ContainerImage {
        exposed_ports: info.spec.ports_to_expose.iter().copied().collect(),
        user_id: info.spec.user_id,
        accessed_dirs: info.spec.accessed_dirs.iter().cloned().collect(),
        build: None,
    }
}

impl Transformer for ComposeAnalyser {
    fn metadata(&self) -> &TransformerMetadata {
        &self.metadata
    }

    fn environment(&self) -> &Environment {
        &self.env
    }

    fn detect_at_root(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let yaml_paths = files_by_ext(dir, &["yaml", "yml"], &self.env.run.excluded_dirs());

        let mut image_info_paths = BTreeMap::new();
        for path in &yaml_paths {
            if let Ok(Some(info)) = ImageInfo::read(path) {
                for tag in info.spec.tags {
                    image_info_paths.insert(tag, path.clone());
                }
            }
        }

        let mut detected = DetectedServices::none();
        for path in &yaml_paths {
            let services =
                self.services_from_file(path, &image_info_paths, &mut detected.warnings);
            merge_services(&mut detected.named, services);
        }
        debug!(services = detected.named.len(), "Docker compose services detected");
        Ok(detected)
    }

    fn transform(
        &self,
        new_artifacts: &[Artifact],
        _old_artifacts: &[Artifact],
    ) -> Result<TransformOutput, TransformerError> {
        let mut output = TransformOutput::default();
        for artifact in new_artifacts {
            if artifact.artifact_type != ArtifactType::Service {
                continue;
            }
            let Some(config) = artifact.configs.compose_service() else {
                output.warnings.push(
                    Stage::Transform,
                    self.metadata.name.as_str(),
                    format!("Artifact {} has no compose service config", artifact.name),
                );
                continue;
            };
            let ir = self.ir_for(artifact, config, &mut output.warnings);
            output.artifacts.push(
                Artifact::new(self.env.project_name(), ArtifactType::Ir)
                    .with_config(ArtifactConfig::Ir(ir)),
            );
        }
        Ok(output)
    }
}
