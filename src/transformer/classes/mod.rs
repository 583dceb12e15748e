//! Built-in transformer implementations.

mod compose;
mod dockerfile;
mod maven;
mod php;
mod service_generator;

pub use compose::{parse_compose, ComposeAnalyser, ComposeService};
pub use dockerfile::{DockerfileDetector, DOCKERFILE_NAME};
pub use maven::{MavenAnalyser, PomInfo};
pub use php::PhpDockerfileGenerator;
pub use service_generator::DockerfileServiceGenerator;

use super::common::{make_image_name_compliant, relative_to, DEFAULT_SOURCE_DIR};
use super::Environment;
use crate::types::{
    Artifact, ArtifactConfig, ArtifactType, ImageName, PathKind, PathMapping, PathMappingKind,
    Paths, ServiceConfig,
};
use std::path::{Path, PathBuf};

/// The `Dockerfile` and `DockerfileForService` artifacts for `service`.
///
/// `ports`, when non-empty, replace the ports in the service config.
pub(crate) fn dockerfile_artifacts(
    service: &Artifact,
    dockerfile: &Path,
    context: &Path,
    ports: &[u16],
) -> [Artifact; 2] {
    let mut paths = Paths::new();
    paths.insert(PathKind::Dockerfile, vec![dockerfile.to_path_buf()]);
    paths.insert(PathKind::ProjectPath, vec![context.to_path_buf()]);

    let mut service_config = service.configs.service().cloned().unwrap_or_else(|| ServiceConfig {
        service_name: service.name.clone(),
        ..Default::default()
    });
    if !ports.is_empty() {
        service_config.ports = ports.to_vec();
    }
    let image_name = service
        .configs
        .image_name()
        .cloned()
        .unwrap_or_else(|| ImageName {
            image_name: make_image_name_compliant(&service_config.service_name),
        });

    let dockerfile_artifact =
        Artifact::new(service.name.clone(), ArtifactType::Dockerfile).with_paths(paths.clone());
    let mut for_service = Artifact::new(service.name.clone(), ArtifactType::DockerfileForService)
        .with_paths(paths)
        .with_config(ArtifactConfig::Service(service_config))
        .with_config(ArtifactConfig::ImageName(image_name));
    for config in service.configs.iter() {
        if !for_service.configs.contains(config.kind()) {
            for_service.configs.insert(config.clone());
        }
    }
    [dockerfile_artifact, for_service]
}

/// Output directory, relative to the output root, mirroring `project_dir`.
pub(crate) fn output_project_dir(env: &Environment, project_dir: &Path) -> PathBuf {
    Path::new(DEFAULT_SOURCE_DIR).join(relative_to(env.source(), project_dir))
}

/// Copies the whole source tree into the output.
pub(crate) fn source_mapping(env: &Environment) -> PathMapping {
    PathMapping {
        kind: PathMappingKind::Source,
        source_path: env.source().to_path_buf(),
        dest_path: PathBuf::from(DEFAULT_SOURCE_DIR),
        template_config: None,
    }
}

/// Renders the transformer's templates into `dest` with `config`.
pub(crate) fn template_mapping(
    env: &Environment,
    templates: Option<&Path>,
    dest: PathBuf,
    config: ArtifactConfig,
) -> PathMapping {
    PathMapping {
        kind: PathMappingKind::Template,
        source_path: templates
            .map(Path::to_path_buf)
            .unwrap_or_else(|| env.context.join("templates")),
        dest_path: dest,
        template_config: Some(config),
    }
}
