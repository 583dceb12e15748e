//! Dockerfile generator for PHP projects served by Apache.

use super::{dockerfile_artifacts, output_project_dir, source_mapping, template_mapping};
use crate::diagnostics::Stage;
use crate::qa::{fetch_input, fetch_select, keys};
use crate::transformer::common::{files_by_ext, files_in_dir, relative_to};
use crate::transformer::{
    DetectedServices, Environment, TransformOutput, Transformer, TransformerError,
    TransformerMetadata,
};
use crate::types::{
    Artifact, ArtifactConfig, ArtifactType, Mode, PathKind, PhpTemplateConfig, TransformerPlan,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_PORT: u16 = 8080;
const NONE_OF_THE_ABOVE: &str = "none of the above";

pub struct PhpDockerfileGenerator {
    metadata: TransformerMetadata,
    env: Environment,
    virtual_host: Regex,
}

impl PhpDockerfileGenerator {
    pub fn new(metadata: TransformerMetadata, env: Environment) -> Result<Self, TransformerError> {
        let virtual_host = Regex::new(r"(?i)<VirtualHost\s+[^>]*:(\d+)\s*>").map_err(|e| {
            TransformerError::Init {
                name: metadata.name.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            metadata,
            env,
            virtual_host,
        })
    }

    /// Apache config files below `project_dir` that declare a virtual host.
    fn apache_conf_files(&self, project_dir: &Path) -> Vec<PathBuf> {
        files_by_ext(project_dir, &["conf"], &self.env.run.excluded_dirs())
            .into_iter()
            .filter(|path| {
                std::fs::read_to_string(path)
                    .map(|c| c.contains("<VirtualHost"))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn port_from_conf(&self, path: &Path) -> Option<u16> {
        let content = std::fs::read_to_string(path).ok()?;
        self.virtual_host
            .captures(&content)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn select_conf_file(
        &self,
        service: &str,
        project_dir: &Path,
        confs: &[PathBuf],
    ) -> Option<PathBuf> {
        match confs {
            [] => None,
            [only] => Some(only.clone()),
            many => {
                let mut options: Vec<String> = many
                    .iter()
                    .map(|p| relative_to(project_dir, p).display().to_string())
                    .collect();
                let default = options[0].clone();
                options.push(NONE_OF_THE_ABOVE.to_string());
                let choice = fetch_select(
                    self.env.qa(),
                    &keys::service_key(service, keys::APACHE_CONF_FILE_SEGMENT),
                    &format!("Choose the apache config file to use for service {}", service),
                    &["Selected file is copied into the image"],
                    &default,
                    &options,
                );
                (choice != NONE_OF_THE_ABOVE).then(|| project_dir.join(choice))
            }
        }
    }

    fn ask_port(&self, service: &str) -> u16 {
        let answer = fetch_input(
            self.env.qa(),
            &keys::service_key(service, keys::PORT_SEGMENT),
            &format!("Enter the port to be exposed for service {}", service),
            &["The service is reachable on this port"],
            &DEFAULT_PORT.to_string(),
        );
        answer.trim().parse().unwrap_or(DEFAULT_PORT)
    }

    fn transform_service(&self, artifact: &Artifact, output: &mut TransformOutput) {
        let Some(project_dir) = artifact.first_path(&PathKind::ProjectPath) else {
            output.warnings.push(
                Stage::Transform,
                self.metadata.name.as_str(),
                format!("Artifact {} has no project path", artifact.name),
            );
            return;
        };
        let service = artifact
            .configs
            .service()
            .map(|s| s.service_name.clone())
            .unwrap_or_else(|| artifact.name.clone());

        let confs = self.apache_conf_files(project_dir);
        let conf = self.select_conf_file(&service, project_dir, &confs);
        let port = conf
            .as_deref()
            .and_then(|c| self.port_from_conf(c))
            .unwrap_or_else(|| self.ask_port(&service));
        let conf_file = conf
            .as_deref()
            .map(|c| relative_to(project_dir, c).display().to_string())
            .unwrap_or_default();
        info!(service = %service, port, conf_file = %conf_file, "Generating PHP Dockerfile");

        let dest = output_project_dir(&self.env, project_dir);
        output.path_mappings.push(source_mapping(&self.env));
        output.path_mappings.push(template_mapping(
            &self.env,
            self.metadata.templates_location.as_deref(),
            dest.clone(),
            ArtifactConfig::Php(PhpTemplateConfig {
                conf_file,
                conf_file_port: port,
            }),
        ));

        let context = self.env.output().join(dest);
        output.artifacts.extend(dockerfile_artifacts(
            artifact,
            &context.join("Dockerfile"),
            &context,
            &[port],
        ));
    }
}

impl Transformer for PhpDockerfileGenerator {
    fn metadata(&self) -> &TransformerMetadata {
        &self.metadata
    }

    fn environment(&self) -> &Environment {
        &self.env
    }

    fn detect_in_subdir(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let php_files = files_in_dir(dir, &["php"]).map_err(|e| TransformerError::io(dir, e))?;
        if php_files.is_empty() {
            return Ok(DetectedServices::none());
        }
        debug!(dir = %dir.display(), files = php_files.len(), "Found PHP sources");
        let plan = TransformerPlan {
            transformer_name: self.metadata.name.clone(),
            mode: self.metadata.mode.clone().or(Some(Mode::Container)),
            artifact_types: self.metadata.artifact_types.clone(),
            base_artifact_types: self.metadata.base_artifact_types.clone(),
            ..Default::default()
        }
        .with_path(PathKind::ProjectPath, dir);
        Ok(DetectedServices::unnamed(plan))
    }

    fn transform(
        &self,
        new_artifacts: &[Artifact],
        _old_artifacts: &[Artifact],
    ) -> Result<TransformOutput, TransformerError> {
        let mut output = TransformOutput::default();
        for artifact in new_artifacts
            .iter()
            .filter(|a| a.artifact_type == ArtifactType::Service)
        {
            self.transform_service(artifact, &mut output);
        }
        Ok(output)
    }
}
