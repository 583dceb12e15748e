//! The persisted, human-editable Plan document.

use super::transformer::{ServicePlan, TransformerPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PLAN_API_VERSION: &str = "planwright/v1alpha1";
pub const PLAN_KIND: &str = "Plan";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read plan {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write plan {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid plan document {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize plan: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Unexpected document kind '{found}' in {path}, expected 'Plan'")]
    WrongKind { path: PathBuf, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub api_version: String,
    pub kind: String,
    pub metadata: PlanMetadata,
    pub spec: PlanSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    pub root_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations_dir: Option<PathBuf>,
    #[serde(default)]
    pub services: BTreeMap<String, ServicePlan>,
    #[serde(default)]
    pub configuration: PlanConfiguration,
    #[serde(default)]
    pub target_cluster: TargetCluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConfiguration {
    /// Transformer name to the definition file it was loaded from
    #[serde(default)]
    pub transformers: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCluster {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub cluster_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            api_version: PLAN_API_VERSION.to_string(),
            kind: PLAN_KIND.to_string(),
            metadata: PlanMetadata::default(),
            spec: PlanSpec::default(),
        }
    }
}

impl Plan {
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        let mut plan = Self::default();
        plan.metadata.name = name.into();
        plan.spec.root_dir = root_dir.into();
        plan
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn services(&self) -> &BTreeMap<String, ServicePlan> {
        &self.spec.services
    }

    /// True when no service survived detection or curation.
    pub fn is_empty(&self) -> bool {
        self.spec.services.is_empty()
    }

    pub fn service_count(&self) -> usize {
        self.spec.services.len()
    }

    /// Names of the transformers referenced by any service plan.
    pub fn used_transformers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .spec
            .services
            .values()
            .flatten()
            .map(|t| t.transformer_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn merge_services(&mut self, discovered: BTreeMap<String, ServicePlan>) {
        merge_services(&mut self.spec.services, discovered);
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: Plan = serde_yaml::from_str(&content).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if plan.kind != PLAN_KIND {
            return Err(PlanError::WrongKind {
                path: path.to_path_buf(),
                found: plan.kind,
            });
        }
        Ok(plan)
    }

    pub fn to_yaml(&self) -> Result<String, PlanError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let content = self.to_yaml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PlanError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| PlanError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Unions `discovered` into `services`.
///
/// Plans for a known service are appended in order, skipping any plan that is
/// already present; unknown services are inserted as-is.
pub fn merge_services(
    services: &mut BTreeMap<String, ServicePlan>,
    discovered: BTreeMap<String, ServicePlan>,
) {
    for (name, plans) in discovered {
        let existing = services.entry(name).or_default();
        for plan in plans {
            append_unique(existing, plan);
        }
    }
}

fn append_unique(plans: &mut ServicePlan, plan: TransformerPlan) {
    if !plans.contains(&plan) {
        plans.push(plan);
    }
}
