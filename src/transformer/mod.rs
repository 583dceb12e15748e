//! Pluggable transformers and the registry that binds them to a run.
//!
//! A transformer is described by a YAML definition (name, mode, artifact
//! types) and implemented by one of the built-in [`TransformerClass`]es. All
//! transformers share the same four hooks; they never call each other and
//! only communicate through the artifacts they produce.

pub mod classes;
pub mod common;
pub mod definition;
pub mod environment;
pub mod registry;

pub use definition::{TransformerClass, TransformerDefinition, TransformerMetadata};
pub use environment::Environment;
pub use registry::{RegistryError, TransformerRegistry};

use crate::diagnostics::Warnings;
use crate::types::{Artifact, PathMapping, ServicePlan, TransformerPlan};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformerError {
    #[error("Failed to initialise transformer {name}: {message}")]
    Init { name: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Artifact {artifact} is missing {what}")]
    MissingInput { artifact: String, what: String },
}

impl TransformerError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        TransformerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a detection hook found in one directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedServices {
    /// Services the transformer could name itself
    pub named: BTreeMap<String, ServicePlan>,
    /// Candidates that still need a name
    pub unnamed: Vec<TransformerPlan>,
    pub warnings: Warnings,
}

impl DetectedServices {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn unnamed(plan: TransformerPlan) -> Self {
        Self {
            unnamed: vec![plan],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.unnamed.is_empty()
    }
}

/// Everything one transform invocation returned.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub path_mappings: Vec<PathMapping>,
    pub artifacts: Vec<Artifact>,
    pub warnings: Warnings,
}

/// Capability set shared by every transformer.
pub trait Transformer: Send + Sync {
    fn metadata(&self) -> &TransformerMetadata;

    fn environment(&self) -> &Environment;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn config(&self) -> (&TransformerMetadata, &Environment) {
        (self.metadata(), self.environment())
    }

    /// Runs once at the root of the source tree.
    fn detect_at_root(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let _ = dir;
        Ok(DetectedServices::none())
    }

    /// Runs once per directory below the root.
    fn detect_in_subdir(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let _ = dir;
        Ok(DetectedServices::none())
    }

    /// Consumes `new_artifacts` (already filtered to the types this
    /// transformer consumes); `old_artifacts` is everything seen before.
    fn transform(
        &self,
        new_artifacts: &[Artifact],
        old_artifacts: &[Artifact],
    ) -> Result<TransformOutput, TransformerError>;
}
