//! Plan creation.
//!
//! Every transformer's detection hooks run independently (in parallel when
//! enabled) and report back to a single aggregation step that owns the plan.
//! Aggregation follows registry order with all root results first, so the
//! resulting plan does not depend on task scheduling.

use crate::configuration::{
    apply_loaders, ClusterMdLoader, ClusterMetadataSource, ConfigurationLoader,
};
use crate::context::RunContext;
use crate::diagnostics::{Outcome, Stage, Warnings};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::qa::QaEngine;
use crate::transformer::common::make_dns_compliant;
use crate::transformer::{DetectedServices, Transformer, TransformerError, TransformerRegistry};
use crate::types::Plan;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Everything one transformer's hooks reported.
struct Detection {
    transformer: String,
    root: Result<DetectedServices, TransformerError>,
    subdirs: Vec<(PathBuf, Result<DetectedServices, TransformerError>)>,
}

pub struct PlanBuilder {
    run: Arc<RunContext>,
    qa: Arc<dyn QaEngine>,
    clusters: Arc<dyn ClusterMetadataSource>,
    loaders: Vec<Box<dyn ConfigurationLoader>>,
    registry: Option<TransformerRegistry>,
    progress: Arc<dyn ProgressHandler>,
}

impl PlanBuilder {
    pub fn new(run: Arc<RunContext>, qa: Arc<dyn QaEngine>) -> Self {
        Self {
            run,
            qa,
            clusters: Arc::new(ClusterMdLoader),
            loaders: vec![Box::new(ClusterMdLoader)],
            registry: None,
            progress: Arc::new(NoOpHandler),
        }
    }

    /// Uses `registry` instead of loading definitions from disk.
    pub fn with_registry(mut self, registry: TransformerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_loaders(mut self, loaders: Vec<Box<dyn ConfigurationLoader>>) -> Self {
        self.loaders = loaders;
        self
    }

    pub fn with_cluster_source(mut self, clusters: Arc<dyn ClusterMetadataSource>) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs detection over the source tree and returns the merged plan.
    ///
    /// Only a failure to prepare the transformer registry is fatal; every
    /// other problem is returned as a warning.
    pub async fn create_plan(&self) -> Result<Outcome<Plan>> {
        let start = Instant::now();
        let source = self.run.source_dir.clone();
        self.progress.on_progress(&ProgressEvent::PlanStarted {
            source: source.display().to_string(),
        });

        let mut plan = Plan::new(self.run.project_name.clone(), source.clone());
        plan.spec.customizations_dir = self.run.customizations_dir.clone();
        let mut warnings = apply_loaders(&self.loaders, &mut plan);

        let cluster = match self.clusters.target_cluster_metadata_for_plan(&plan) {
            Ok(md) => Some(md),
            Err(err) => {
                warnings.push(Stage::ConfigLoad, "target-cluster", err.to_string());
                None
            }
        };

        let registry = match &self.registry {
            Some(registry) => registry.clone(),
            None => {
                let (registry, load_warnings) =
                    TransformerRegistry::load(self.run.clone(), cluster, self.qa.clone())
                        .context("Failed to load transformers")?
                        .into_parts();
                warnings.extend(load_warnings);
                registry
            }
        };
        self.progress.on_progress(&ProgressEvent::RegistryLoaded {
            transformers: registry.len(),
        });
        plan.spec.configuration.transformers = registry.configuration();

        let dirs = Arc::new(directories(
            &source,
            self.run.max_depth,
            &self.run.excluded_dirs(),
        ));
        debug!(dirs = dirs.len(), "Directories to scan");

        let detections = self.detect(&registry, dirs).await;
        warnings.extend(self.aggregate(&mut plan, detections));

        info!(services = plan.service_count(), "Plan created");
        self.progress.on_progress(&ProgressEvent::DetectionComplete {
            services: plan.service_count(),
            warnings: warnings.len(),
            duration: start.elapsed(),
        });
        Ok(Outcome::new(plan, warnings))
    }

    async fn detect(
        &self,
        registry: &TransformerRegistry,
        dirs: Arc<Vec<PathBuf>>,
    ) -> Vec<Detection> {
        let root = self.run.source_dir.clone();
        let mut detections = Vec::with_capacity(registry.len());

        if !self.run.parallel {
            for transformer in registry.iter() {
                detections.push(detect_with(transformer.as_ref(), &root, &dirs));
            }
            return detections;
        }

        let mut tasks = JoinSet::new();
        for transformer in registry.iter() {
            let transformer = transformer.clone();
            let root = root.clone();
            let dirs = dirs.clone();
            tasks.spawn_blocking(move || detect_with(transformer.as_ref(), &root, &dirs));
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(detection) => detections.push(detection),
                Err(err) => warn!(error = %err, "Detection task failed"),
            }
        }
        detections.sort_by(|a, b| a.transformer.cmp(&b.transformer));
        detections
    }

    /// Single writer: folds every detection into `plan`.
    fn aggregate(&self, plan: &mut Plan, detections: Vec<Detection>) -> Warnings {
        let mut warnings = Warnings::new();
        let root = self.run.source_dir.clone();

        let mut subdir_results = Vec::new();
        for detection in detections {
            let name = detection.transformer;
            match detection.root {
                Ok(found) => self.merge_detected(plan, &root, found, &mut warnings),
                Err(err) => warnings.push(Stage::Detection, name.as_str(), err.to_string()),
            }
            subdir_results.push((name, detection.subdirs));
        }

        for (name, subdirs) in subdir_results {
            for (dir, result) in subdirs {
                match result {
                    Ok(found) => self.merge_detected(plan, &dir, found, &mut warnings),
                    Err(err) => warnings.push(Stage::Detection, name.as_str(), err.to_string()),
                }
            }
        }
        warnings
    }

    fn merge_detected(
        &self,
        plan: &mut Plan,
        dir: &Path,
        found: DetectedServices,
        warnings: &mut Warnings,
    ) {
        warnings.extend(found.warnings);
        plan.merge_services(found.named);
        if found.unnamed.is_empty() {
            return;
        }
        let name = self.service_name_for(dir);
        let mut named = BTreeMap::new();
        named.insert(name, found.unnamed);
        plan.merge_services(named);
    }

    /// DNS-compliant name for candidates found in `dir`.
    fn service_name_for(&self, dir: &Path) -> String {
        let project = make_dns_compliant(&self.run.project_name);
        if dir == self.run.source_dir {
            return project;
        }
        let name = dir
            .file_name()
            .map(|n| make_dns_compliant(&n.to_string_lossy()))
            .unwrap_or_default();
        if name.is_empty() {
            project
        } else {
            name
        }
    }
}

/// Runs one transformer's hooks over the tree.
///
/// Once a directory yields something, its subtree is skipped for this
/// transformer.
fn detect_with(transformer: &dyn Transformer, root: &Path, dirs: &[PathBuf]) -> Detection {
    let name = transformer.name().to_string();
    let root_result = transformer.detect_at_root(root);

    let mut claimed: Vec<&Path> = Vec::new();
    let mut subdirs = Vec::new();
    for dir in dirs {
        if claimed.iter().any(|c| dir.starts_with(c)) {
            continue;
        }
        let result = transformer.detect_in_subdir(dir);
        match &result {
            Ok(found) if found.is_empty() => continue,
            Ok(_) => {
                debug!(transformer = %name, dir = %dir.display(), "Services found");
                claimed.push(dir);
            }
            Err(_) => {}
        }
        subdirs.push((dir.clone(), result));
    }

    Detection {
        transformer: name,
        root: root_result,
        subdirs,
    }
}

/// Every directory under `root` (root included) up to `max_depth`, sorted so
/// parents precede their children.
fn directories(root: &Path, max_depth: usize, excluded: &[PathBuf]) -> Vec<PathBuf> {
    let excluded = excluded.to_vec();
    let mut dirs: Vec<PathBuf> = WalkBuilder::new(root)
        .max_depth(Some(max_depth))
        .git_ignore(true)
        .filter_entry(move |entry| !excluded.iter().any(|x| entry.path().starts_with(x)))
        .build()
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .collect();
    dirs.sort();
    dirs
}
