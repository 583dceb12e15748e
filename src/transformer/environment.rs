use crate::configuration::ClusterMetadata;
use crate::context::RunContext;
use crate::qa::QaEngine;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Execution environment bound to a transformer at init.
#[derive(Clone)]
pub struct Environment {
    pub run: Arc<RunContext>,
    /// Directory holding the transformer's definition and templates
    pub context: PathBuf,
    pub target_cluster: Option<ClusterMetadata>,
    pub qa: Arc<dyn QaEngine>,
}

impl Environment {
    pub fn new(
        run: Arc<RunContext>,
        context: impl Into<PathBuf>,
        target_cluster: Option<ClusterMetadata>,
        qa: Arc<dyn QaEngine>,
    ) -> Self {
        Self {
            run,
            context: context.into(),
            target_cluster,
            qa,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.run.project_name
    }

    pub fn source(&self) -> &Path {
        &self.run.source_dir
    }

    pub fn output(&self) -> &Path {
        &self.run.output_dir
    }

    pub fn qa(&self) -> &dyn QaEngine {
        self.qa.as_ref()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("project", &self.run.project_name)
            .field("source", &self.run.source_dir)
            .field("context", &self.context)
            .field(
                "target_cluster",
                &self.target_cluster.as_ref().map(|c| c.metadata.name.as_str()),
            )
            .finish()
    }
}
