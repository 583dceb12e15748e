//! Plan and artifact records exchanged between the planner stages and
//! transformers.

use super::config::{ArtifactConfig, Configs};
use super::ids::{ArtifactType, Mode, PathKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordered file paths keyed by their role
pub type Paths = BTreeMap<PathKind, Vec<PathBuf>>;

/// One transformer's proposed participation for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerPlan {
    pub transformer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    pub artifact_types: Vec<ArtifactType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_artifact_types: Vec<ArtifactType>,
    #[serde(default, skip_serializing_if = "Configs::is_empty")]
    pub configs: Configs,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: Paths,
}

/// Candidate plans for one service; earlier entries are preferred.
pub type ServicePlan = Vec<TransformerPlan>;

impl TransformerPlan {
    /// The declared mode, treating an empty string as unset.
    pub fn mode(&self) -> Option<&Mode> {
        self.mode.as_ref().filter(|m| !m.as_str().is_empty())
    }

    pub fn with_config(mut self, config: ArtifactConfig) -> Self {
        self.configs.insert(config);
        self
    }

    pub fn with_path(mut self, kind: PathKind, path: impl Into<PathBuf>) -> Self {
        merge_path(&mut self.paths, kind, path.into());
        self
    }
}

/// Appends `path` under `kind` unless it is already present.
pub fn merge_path(paths: &mut Paths, kind: PathKind, path: PathBuf) {
    let entry = paths.entry(kind).or_default();
    if !entry.contains(&path) {
        entry.push(path);
    }
}

/// Unit of work passed between transformer invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "artifact")]
    pub artifact_type: ArtifactType,
    #[serde(default, skip_serializing_if = "Configs::is_empty")]
    pub configs: Configs,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: Paths,
}

impl Artifact {
    pub fn new(name: impl Into<String>, artifact_type: ArtifactType) -> Self {
        Self {
            name: name.into(),
            artifact_type,
            configs: Configs::new(),
            paths: Paths::new(),
        }
    }

    pub fn with_config(mut self, config: ArtifactConfig) -> Self {
        self.configs.insert(config);
        self
    }

    pub fn with_paths(mut self, paths: Paths) -> Self {
        self.paths = paths;
        self
    }

    pub fn first_path(&self, kind: &PathKind) -> Option<&Path> {
        self.paths
            .get(kind)
            .and_then(|p| p.first())
            .map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMappingKind {
    /// Copy the file or directory as-is
    #[default]
    Default,
    /// Copy the whole source tree into the output
    Source,
    /// Render a template directory with `template_config`
    Template,
}

/// Deferred file operation applied once every transform has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMapping {
    #[serde(rename = "type")]
    pub kind: PathMappingKind,
    #[serde(default, skip_serializing_if = "is_empty_path")]
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_config: Option<ArtifactConfig>,
}

fn is_empty_path(p: &Path) -> bool {
    p.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::ServiceConfig;

    #[test]
    fn test_empty_mode_is_unset() {
        let plan = TransformerPlan {
            mode: Some(Mode::Custom(String::new())),
            ..Default::default()
        };
        assert!(plan.mode().is_none());

        let plan = TransformerPlan {
            mode: Some(Mode::Container),
            ..Default::default()
        };
        assert_eq!(plan.mode(), Some(&Mode::Container));
    }

    #[test]
    fn test_with_path_skips_duplicates() {
        let plan = TransformerPlan::default()
            .with_path(PathKind::ProjectPath, "/src/a")
            .with_path(PathKind::ProjectPath, "/src/a")
            .with_path(PathKind::ProjectPath, "/src/b");
        assert_eq!(plan.paths[&PathKind::ProjectPath].len(), 2);
    }

    #[test]
    fn test_artifact_yaml_field_names() {
        let artifact = Artifact::new("web", ArtifactType::Service).with_config(
            ArtifactConfig::Service(ServiceConfig {
                service_name: "web".into(),
                ..Default::default()
            }),
        );
        let yaml = serde_yaml::to_string(&artifact).unwrap();
        assert!(yaml.contains("artifact: Service"));
        assert!(yaml.contains("serviceName: web"));
    }

    #[test]
    fn test_new_artifact_starts_empty() {
        let artifact = Artifact::new("web", ArtifactType::DockerfileForService);
        assert_eq!(artifact.artifact_type, ArtifactType::DockerfileForService);
        assert!(artifact.configs.is_empty());
        assert!(artifact.first_path(&PathKind::Dockerfile).is_none());

        let artifact = artifact.with_paths(Paths::from([(
            PathKind::Dockerfile,
            vec![PathBuf::from("/out/web/Dockerfile")],
        )]));
        assert_eq!(
            artifact.first_path(&PathKind::Dockerfile),
            Some(Path::new("/out/web/Dockerfile"))
        );
    }
}
