//! Per-run context threaded through planning, curation and execution.

use crate::config::PlanwrightConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Everything a run needs to know about where it reads and writes.
///
/// Built once per invocation and shared read-only (behind `Arc`) with the
/// registry, the detection workers and the execution driver.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub project_name: String,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub customizations_dir: Option<PathBuf>,
    pub assets_dir: PathBuf,
    pub max_depth: usize,
    pub max_generations: usize,
    pub parallel: bool,
}

impl RunContext {
    pub fn new(
        config: &PlanwrightConfig,
        project_name: impl Into<String>,
        source_dir: &Path,
        output_dir: &Path,
    ) -> Result<Self> {
        if !source_dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", source_dir.display());
        }
        let source_dir = source_dir
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize {}", source_dir.display()))?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            project_name: project_name.into(),
            source_dir,
            output_dir: absolute(output_dir)?,
            customizations_dir: None,
            assets_dir: config.assets_dir.clone(),
            max_depth: config.max_depth,
            max_generations: config.max_generations,
            parallel: config.parallel,
        })
    }

    pub fn with_customizations(mut self, dir: Option<&Path>) -> Result<Self> {
        self.customizations_dir = match dir {
            Some(d) => Some(
                d.canonicalize()
                    .with_context(|| format!("Customizations dir not found: {}", d.display()))?,
            ),
            None => None,
        };
        Ok(self)
    }

    /// Directory holding transformer definition files
    pub fn transformers_dir(&self) -> PathBuf {
        self.assets_dir.join("transformers")
    }

    /// Directories that detection must never descend into
    pub fn excluded_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.output_dir.clone()];
        if let Some(custom) = &self.customizations_dir {
            dirs.push(custom.clone());
        }
        dirs
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_dirs().iter().any(|d| path.starts_with(d))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        path.canonicalize()
            .with_context(|| format!("Failed to canonicalize {}", path.display()))
    } else if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path))
    }
}
