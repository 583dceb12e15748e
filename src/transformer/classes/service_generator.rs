use crate::diagnostics::Stage;
use crate::transformer::common::make_image_name_compliant;
use crate::transformer::{
    Environment, TransformOutput, Transformer, TransformerError, TransformerMetadata,
};
use crate::types::{
    Artifact, ArtifactConfig, ArtifactType, ContainerBuild, ContainerImage, Ir, PathKind,
    ServiceIr,
};

/// Turns `DockerfileForService` artifacts into IR services backed by a
/// locally built image.
pub struct DockerfileServiceGenerator {
    metadata: TransformerMetadata,
    env: Environment,
}

impl DockerfileServiceGenerator {
    pub fn new(metadata: TransformerMetadata, env: Environment) -> Result<Self, TransformerError> {
        Ok(Self { metadata, env })
    }

    fn ir_for(&self, artifact: &Artifact) -> Result<Ir, TransformerError> {
        let missing = |what: &str| TransformerError::MissingInput {
            artifact: artifact.name.clone(),
            what: what.to_string(),
        };
        let dockerfile = artifact
            .first_path(&PathKind::Dockerfile)
            .ok_or_else(|| missing("a Dockerfile path"))?;
        let context = artifact
            .first_path(&PathKind::ProjectPath)
            .or_else(|| dockerfile.parent())
            .ok_or_else(|| missing("a build context"))?;

        let service_name = artifact
            .configs
            .service()
            .map(|s| s.service_name.clone())
            .unwrap_or_else(|| artifact.name.clone());
        let ports = artifact
            .configs
            .service()
            .map(|s| s.ports.clone())
            .unwrap_or_default();
        let image = artifact
            .configs
            .image_name()
            .map(|i| i.image_name.clone())
            .unwrap_or_else(|| make_image_name_compliant(&service_name));
        let image = if image.contains(':') {
            image
        } else {
            format!("{}:latest", image)
        };

        let mut ir = Ir::new(self.env.project_name());
        let mut service = ServiceIr::new(service_name);
        service.images.insert(image.clone());
        service.ports.extend(ports.iter().copied());
        ir.add_service(service);
        ir.add_container(
            image,
            ContainerImage {
                exposed_ports: ports.into_iter().collect(),
                build: Some(ContainerBuild {
                    context: context.to_path_buf(),
                    dockerfile: dockerfile.to_path_buf(),
                }),
                ..Default::default()
            },
        );
        Ok(ir)
    }
}

impl Transformer for DockerfileServiceGenerator {
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
        let mut output = TransformOutput::default();
        for artifact in new_artifacts
            .iter()
            .filter(|a| a.artifact_type == ArtifactType::DockerfileForService)
        {
            match self.ir_for(artifact) {
                Ok(ir) => output.artifacts.push(
                    Artifact::new(artifact.name.clone(), ArtifactType::Ir)
                        .with_config(ArtifactConfig::Ir(ir)),
                ),
                Err(err) => {
                    output
                        .warnings
                        .push(Stage::Transform, self.metadata.name.as_str(), err.to_string())
                }
            }
        }
        Ok(output)
    }
}
