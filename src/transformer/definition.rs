//! Transformer definition documents.

use super::classes::{
    ComposeAnalyser, DockerfileDetector, DockerfileServiceGenerator, MavenAnalyser,
    PhpDockerfileGenerator,
};
use super::{Environment, Transformer, TransformerError};
use crate::types::{ArtifactType, Mode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TRANSFORMER_KIND: &str = "Transformer";

/// Built-in implementations a definition can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformerClass {
    ComposeAnalyser,
    DockerfileDetector,
    PhpDockerfileGenerator,
    MavenAnalyser,
    DockerfileServiceGenerator,
}

impl TransformerClass {
    pub fn instantiate(
        self,
        metadata: TransformerMetadata,
        env: Environment,
    ) -> Result<Arc<dyn Transformer>, TransformerError> {
        Ok(match self {
            TransformerClass::ComposeAnalyser => Arc::new(ComposeAnalyser::new(metadata, env)?),
            TransformerClass::DockerfileDetector => {
                Arc::new(DockerfileDetector::new(metadata, env)?)
            }
            TransformerClass::PhpDockerfileGenerator => {
                Arc::new(PhpDockerfileGenerator::new(metadata, env)?)
            }
            TransformerClass::MavenAnalyser => Arc::new(MavenAnalyser::new(metadata, env)?),
            TransformerClass::DockerfileServiceGenerator => {
                Arc::new(DockerfileServiceGenerator::new(metadata, env)?)
            }
        })
    }
}

/// The YAML document as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerDefinition {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    pub metadata: DefinitionName,
    pub spec: TransformerSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerSpec {
    pub class: TransformerClass,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub consumes: Vec<ArtifactType>,
    #[serde(default)]
    pub artifact_types: Vec<ArtifactType>,
    #[serde(default)]
    pub base_artifact_types: Vec<ArtifactType>,
    /// Template directory, relative to the definition file
    #[serde(default)]
    pub templates: Option<PathBuf>,
    #[serde(default)]
    pub config_schema: Option<serde_json::Value>,
}

/// Immutable metadata of a loaded transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerMetadata {
    pub name: String,
    pub class: TransformerClass,
    pub mode: Option<Mode>,
    pub consumes: Vec<ArtifactType>,
    pub artifact_types: Vec<ArtifactType>,
    pub base_artifact_types: Vec<ArtifactType>,
    pub config_schema: Option<serde_json::Value>,
    /// Absolute template directory, if the definition names one
    pub templates_location: Option<PathBuf>,
    /// Definition file this transformer was loaded from
    pub file_path: PathBuf,
}

impl TransformerDefinition {
    pub fn parse(content: &str) -> Result<Option<Self>, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let is_transformer = value
            .get("kind")
            .and_then(|k| k.as_str())
            .map(|k| k == TRANSFORMER_KIND)
            .unwrap_or(false);
        if !is_transformer {
            return Ok(None);
        }
        serde_yaml::from_value(value).map(Some)
    }

    pub fn into_metadata(self, file_path: &Path) -> TransformerMetadata {
        let base_dir = file_path.parent().unwrap_or_else(|| Path::new(""));
        TransformerMetadata {
            name: self.metadata.name,
            class: self.spec.class,
            mode: self.spec.mode,
            consumes: self.spec.consumes,
            artifact_types: self.spec.artifact_types,
            base_artifact_types: self.spec.base_artifact_types,
            config_schema: self.spec.config_schema,
            templates_location: self.spec.templates.map(|t| base_dir.join(t)),
            file_path: file_path.to_path_buf(),
        }
    }
}

impl TransformerMetadata {
    /// Whether artifacts of `artifact_type` are routed to this transformer.
    ///
    /// A transformer never receives the types it produces itself.
    pub fn accepts(&self, artifact_type: &ArtifactType) -> bool {
        self.consumes.contains(artifact_type) && !self.artifact_types.contains(artifact_type)
    }

    /// Minimal metadata for transformers assembled in code.
    pub fn new(name: impl Into<String>, class: TransformerClass) -> Self {
        Self {
            name: name.into(),
            class,
            mode: Some(Mode::Container),
            consumes: Vec::new(),
            artifact_types: Vec::new(),
            base_artifact_types: Vec::new(),
            config_schema: None,
            templates_location: None,
            file_path: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"
apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: Php-Dockerfile
spec:
  class: PhpDockerfileGenerator
  mode: Container
  consumes: [Service]
  artifactTypes: [ContainerBuild]
  baseArtifactTypes: [ContainerBuild]
  templates: templates
"#;

    #[test]
    fn test_parse_definition() {
        let def = TransformerDefinition::parse(DEFINITION).unwrap().unwrap();
        let md = def.into_metadata(Path::new("/assets/php/transformer.yaml"));

        assert_eq!(md.name, "Php-Dockerfile");
        assert_eq!(md.class, TransformerClass::PhpDockerfileGenerator);
        assert_eq!(md.mode, Some(Mode::Container));
        assert_eq!(md.templates_location, Some(PathBuf::from("/assets/php/templates")));
        assert!(md.accepts(&ArtifactType::Service));
        assert!(!md.accepts(&ArtifactType::ContainerBuild));
    }

    #[test]
    fn test_other_kinds_are_skipped() {
        assert!(TransformerDefinition::parse("kind: Plan\nmetadata: {name: x}\n")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unknown_class_is_an_error() {
        let doc = DEFINITION.replace("PhpDockerfileGenerator", "CobolGenerator");
        assert!(TransformerDefinition::parse(&doc).is_err());
    }

    #[test]
    fn test_own_products_are_not_accepted() {
        let mut md = TransformerMetadata::new("loop", TransformerClass::DockerfileServiceGenerator);
        md.consumes = vec![ArtifactType::Ir];
        md.artifact_types = vec![ArtifactType::Ir];
        assert!(!md.accepts(&ArtifactType::Ir));
    }
}
