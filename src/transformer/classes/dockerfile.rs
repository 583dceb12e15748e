//! Picks up hand-written Dockerfiles already present in the source tree.

use super::dockerfile_artifacts;
use crate::diagnostics::Stage;
use crate::transformer::{
    DetectedServices, Environment, TransformOutput, Transformer, TransformerError,
    TransformerMetadata,
};
use crate::types::{Artifact, ArtifactType, Mode, PathKind, TransformerPlan};
use std::path::Path;
use tracing::debug;

pub const DOCKERFILE_NAME: &str = "Dockerfile";

pub struct DockerfileDetector {
    metadata: TransformerMetadata,
    env: Environment,
}

impl DockerfileDetector {
    pub fn new(metadata: TransformerMetadata, env: Environment) -> Result<Self, TransformerError> {
        Ok(Self { metadata, env })
    }
}

impl Transformer for DockerfileDetector {
    fn metadata(&self) -> &TransformerMetadata {
        &self.metadata
    }

    fn environment(&self) -> &Environment {
        &self.env
    }

    fn detect_in_subdir(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let dockerfile = dir.join(DOCKERFILE_NAME);
        if !dockerfile.is_file() {
            return Ok(DetectedServices::none());
        }
        debug!(dir = %dir.display(), "Found a Dockerfile");
        let plan = TransformerPlan {
            transformer_name: self.metadata.name.clone(),
            mode: self.metadata.mode.clone().or(Some(Mode::Container)),
            artifact_types: self.metadata.artifact_types.clone(),
            base_artifact_types: self.metadata.base_artifact_types.clone(),
            ..Default::default()
        }
        .with_path(PathKind::Dockerfile, dockerfile)
        .with_path(PathKind::ProjectPath, dir);
        Ok(DetectedServices::unnamed(plan))
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
            let (Some(dockerfile), Some(context)) = (
                artifact.first_path(&PathKind::Dockerfile),
                artifact.first_path(&PathKind::ProjectPath),
            ) else {
                output.warnings.push(
                    Stage::Transform,
                    self.metadata.name.as_str(),
                    format!("Artifact {} has no Dockerfile or project path", artifact.name),
                );
                continue;
            };
            output
                .artifacts
                .extend(dockerfile_artifacts(artifact, dockerfile, context, &[]));
        }
        Ok(output)
    }
}
