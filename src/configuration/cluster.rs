//! Cluster metadata: built-in target types plus `kind: ClusterMetadata`
//! documents dropped into the customizations directory.

use super::ConfigurationLoader;
use crate::types::Plan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CLUSTER_METADATA_KIND: &str = "ClusterMetadata";
pub const DEFAULT_CLUSTER_TYPE: &str = "Kubernetes";

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Unknown cluster type '{0}'")]
    UnknownClusterType(String),

    #[error("Failed to read cluster metadata {path}: {message}")]
    Read { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    pub metadata: ClusterName,
    #[serde(default)]
    pub spec: ClusterMetadataSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterName {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadataSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub storage_classes: Vec<String>,
    /// Supported API kinds
    #[serde(default)]
    pub api_kinds: Vec<String>,
}

impl ClusterMetadata {
    fn builtin(name: &str, storage_classes: &[&str], extra_kinds: &[&str]) -> Self {
        let mut api_kinds = vec!["Deployment", "Service", "Ingress", "ConfigMap", "Secret"];
        api_kinds.extend_from_slice(extra_kinds);
        Self {
            api_version: crate::types::plan::PLAN_API_VERSION.to_string(),
            kind: CLUSTER_METADATA_KIND.to_string(),
            metadata: ClusterName {
                name: name.to_string(),
            },
            spec: ClusterMetadataSpec {
                host: None,
                storage_classes: storage_classes.iter().map(|s| s.to_string()).collect(),
                api_kinds: api_kinds.into_iter().map(String::from).collect(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Source of cluster metadata consulted during planning and curation.
pub trait ClusterMetadataSource: Send + Sync {
    fn get_clusters(&self, plan: &Plan) -> BTreeMap<String, ClusterMetadata>;

    fn target_cluster_metadata_for_plan(&self, plan: &Plan) -> Result<ClusterMetadata, ClusterError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterMdLoader;

impl ClusterMdLoader {
    fn builtins() -> BTreeMap<String, ClusterMetadata> {
        [
            ClusterMetadata::builtin(DEFAULT_CLUSTER_TYPE, &["default"], &[]),
            ClusterMetadata::builtin("Openshift", &["gp2"], &["Route", "BuildConfig", "ImageStream"]),
            ClusterMetadata::builtin("AWS-EKS", &["gp2"], &[]),
            ClusterMetadata::builtin("Azure-AKS", &["default", "managed-premium"], &[]),
            ClusterMetadata::builtin("GCP-GKE", &["standard"], &[]),
        ]
        .into_iter()
        .map(|c| (c.metadata.name.clone(), c))
        .collect()
    }

    fn read(path: &Path) -> Result<Option<ClusterMetadata>, ClusterError> {
        let content = std::fs::read_to_string(path).map_err(|e| ClusterError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match serde_yaml::from_str::<ClusterMetadata>(&content) {
            Ok(md) if md.kind == CLUSTER_METADATA_KIND => Ok(Some(md)),
            _ => Ok(None),
        }
    }

    fn from_dir(dir: &Path) -> Vec<ClusterMetadata> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        paths
            .iter()
            .filter_map(|p| match Self::read(p) {
                Ok(md) => md,
                Err(err) => {
                    debug!(error = %err, "Skipping cluster metadata candidate");
                    None
                }
            })
            .collect()
    }
}

impl ClusterMetadataSource for ClusterMdLoader {
    fn get_clusters(&self, plan: &Plan) -> BTreeMap<String, ClusterMetadata> {
        let mut clusters = Self::builtins();
        if let Some(dir) = &plan.spec.customizations_dir {
            for md in Self::from_dir(dir) {
                clusters.insert(md.metadata.name.clone(), md);
            }
        }
        clusters
    }

    fn target_cluster_metadata_for_plan(&self, plan: &Plan) -> Result<ClusterMetadata, ClusterError> {
        let target = &plan.spec.target_cluster;
        if let Some(path) = &target.path {
            return Self::read(path)?.ok_or_else(|| ClusterError::Read {
                path: path.clone(),
                message: "not a ClusterMetadata document".to_string(),
            });
        }
        let cluster_type = if target.cluster_type.is_empty() {
            DEFAULT_CLUSTER_TYPE
        } else {
            target.cluster_type.as_str()
        };
        self.get_clusters(plan)
            .remove(cluster_type)
            .ok_or_else(|| ClusterError::UnknownClusterType(cluster_type.to_string()))
    }
}

impl ConfigurationLoader for ClusterMdLoader {
    fn name(&self) -> &str {
        "ClusterMdLoader"
    }

    fn update_plan(&self, plan: &mut Plan) -> anyhow::Result<()> {
        if plan.spec.target_cluster.cluster_type.is_empty() && plan.spec.target_cluster.path.is_none() {
            plan.spec.target_cluster.cluster_type = DEFAULT_CLUSTER_TYPE.to_string();
        }
        self.target_cluster_metadata_for_plan(plan)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_clusters() {
        let plan = Plan::new("p", "/src");
        let clusters = ClusterMdLoader.get_clusters(&plan);
        assert!(clusters.contains_key("Kubernetes"));
        assert!(clusters["Openshift"].spec.api_kinds.contains(&"Route".to_string()));
    }

    #[test]
    fn test_customizations_add_cluster() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("edge.yaml"),
            "kind: ClusterMetadata\nmetadata:\n  name: edge\nspec:\n  storageClasses: [local]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("noise.yaml"), "kind: Other\n").unwrap();

        let mut plan = Plan::new("p", "/src");
        plan.spec.customizations_dir = Some(dir.path().to_path_buf());
        plan.spec.target_cluster.cluster_type = "edge".into();

        let md = ClusterMdLoader.target_cluster_metadata_for_plan(&plan).unwrap();
        assert_eq!(md.name(), "edge");
        assert_eq!(md.spec.storage_classes, vec!["local"]);
    }

    #[test]
    fn test_loader_sets_default_target() {
        let mut plan = Plan::new("p", "/src");
        ClusterMdLoader.update_plan(&mut plan).unwrap();
        assert_eq!(plan.spec.target_cluster.cluster_type, DEFAULT_CLUSTER_TYPE);
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let mut plan = Plan::new("p", "/src");
        plan.spec.target_cluster.cluster_type = "Mainframe".into();
        assert!(matches!(
            ClusterMdLoader.target_cluster_metadata_for_plan(&plan),
            Err(ClusterError::UnknownClusterType(_))
        ));
    }
}
