//! Loads transformer definitions and binds them to a run.
//!
//! Built-in definitions are written to `<assets>/transformers/<name>/` on
//! every load so they can be inspected and replayed like custom ones.
//! Definitions in the customizations directory are read afterwards and win
//! on name collisions.

use super::common::files_by_ext;
use super::{Environment, Transformer, TransformerDefinition, TransformerError};
use crate::configuration::ClusterMetadata;
use crate::context::RunContext;
use crate::diagnostics::{Outcome, Stage, Warnings};
use crate::qa::QaEngine;
use crate::types::{ArtifactType, Plan};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFINITION_FILE: &str = "transformer.yaml";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to write built-in transformer assets to {path}: {source}")]
    Assets {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid transformer definition {path}: {message}")]
    Definition { path: PathBuf, message: String },

    #[error(transparent)]
    Init(#[from] TransformerError),
}

struct BuiltinAsset {
    dir: &'static str,
    definition: &'static str,
    template: Option<&'static str>,
}

const BUILTINS: &[BuiltinAsset] = &[
    BuiltinAsset {
        dir: "compose",
        definition: r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: ComposeAnalyser
spec:
  class: ComposeAnalyser
  mode: Container
  consumes: [Service]
  artifactTypes: [IR, ContainerBuild]
  baseArtifactTypes: [IR, ContainerBuild]
"#,
        template: None,
    },
    BuiltinAsset {
        dir: "dockerfile",
        definition: r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: DockerfileDetector
spec:
  class: DockerfileDetector
  mode: Container
  consumes: [Service]
  artifactTypes: [ContainerBuild]
  baseArtifactTypes: [ContainerBuild]
"#,
        template: None,
    },
    BuiltinAsset {
        dir: "php",
        definition: r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: PhpDockerfileGenerator
spec:
  class: PhpDockerfileGenerator
  mode: Container
  consumes: [Service]
  artifactTypes: [ContainerBuild]
  baseArtifactTypes: [ContainerBuild]
  templates: templates
  configSchema:
    confFile: string
    confFilePort: integer
"#,
        template: Some(
            r#"FROM php:8-apache
{{#if confFile}}
COPY {{ confFile }} /etc/apache2/sites-available/000-default.conf
{{/if}}
COPY . /var/www/html/
RUN sed -i 's/Listen 80/Listen {{ confFilePort }}/' /etc/apache2/ports.conf
EXPOSE {{ confFilePort }}
"#,
        ),
    },
    BuiltinAsset {
        dir: "maven",
        definition: r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: MavenAnalyser
spec:
  class: MavenAnalyser
  mode: Container
  consumes: [Service]
  artifactTypes: [ContainerBuild]
  baseArtifactTypes: [ContainerBuild]
  templates: templates
  configSchema:
    mavenAppName: string
    artifactType: string
"#,
        template: Some(
            r#"FROM maven:3-eclipse-temurin-17 AS build
WORKDIR /app
COPY . .
RUN mvn -B -DskipTests package

FROM eclipse-temurin:17-jre
COPY --from=build /app/target/{{ mavenAppName }}*.{{ artifactType }} /app/app.{{ artifactType }}
CMD ["java", "-jar", "/app/app.{{ artifactType }}"]
"#,
        ),
    },
    BuiltinAsset {
        dir: "dockerfile-service",
        definition: r#"apiVersion: planwright/v1alpha1
kind: Transformer
metadata:
  name: DockerfileServiceGenerator
spec:
  class: DockerfileServiceGenerator
  mode: Container
  consumes: [DockerfileForService]
  artifactTypes: [IR]
"#,
        template: None,
    },
];

/// Shared inputs every transformer is bound to.
struct Binding<'a> {
    run: &'a Arc<RunContext>,
    cluster: &'a Option<ClusterMetadata>,
    qa: &'a Arc<dyn QaEngine>,
}

impl Binding<'_> {
    fn instantiate(&self, path: &Path) -> Result<Option<Arc<dyn Transformer>>, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Definition {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let Some(definition) =
            TransformerDefinition::parse(&content).map_err(|e| RegistryError::Definition {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        else {
            return Ok(None);
        };
        let class = definition.spec.class;
        let metadata = definition.into_metadata(path);
        let context = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let env = Environment::new(self.run.clone(), context, self.cluster.clone(), self.qa.clone());
        Ok(Some(class.instantiate(metadata, env)?))
    }
}

/// Transformers available to a run, keyed and iterated by name.
#[derive(Default, Clone)]
pub struct TransformerRegistry {
    transformers: BTreeMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-ins plus any definitions in the customizations directory.
    pub fn load(
        run: Arc<RunContext>,
        cluster: Option<ClusterMetadata>,
        qa: Arc<dyn QaEngine>,
    ) -> Result<Outcome<Self>, RegistryError> {
        let mut registry = Self::new();
        let mut warnings = Warnings::new();
        let binding = Binding {
            run: &run,
            cluster: &cluster,
            qa: &qa,
        };

        let mut paths = materialize_builtins(&run.transformers_dir())?;
        if let Some(custom) = &run.customizations_dir {
            paths.extend(files_by_ext(custom, &["yaml", "yml"], &[]));
        }

        for path in paths {
            match binding.instantiate(&path) {
                Ok(Some(transformer)) => registry.insert(transformer),
                Ok(None) => debug!(path = %path.display(), "Not a transformer definition"),
                Err(err) => {
                    warnings.push(Stage::ConfigLoad, path.display().to_string(), err.to_string())
                }
            }
        }
        info!(count = registry.len(), "Transformers loaded");
        Ok(Outcome::new(registry, warnings))
    }

    /// Rebuilds the registry recorded in a plan.
    ///
    /// Definition files that disappeared fall back to the built-in of the
    /// same name. Only transformers the plan uses are kept, together with
    /// downstream transformers that never consume `Service` artifacts.
    pub fn from_plan(
        plan: &Plan,
        run: Arc<RunContext>,
        cluster: Option<ClusterMetadata>,
        qa: Arc<dyn QaEngine>,
    ) -> Result<Outcome<Self>, RegistryError> {
        let (builtins, mut warnings) =
            Self::load(run.clone(), cluster.clone(), qa.clone())?.into_parts();
        let binding = Binding {
            run: &run,
            cluster: &cluster,
            qa: &qa,
        };

        let mut registry = Self::new();
        for (name, path) in &plan.spec.configuration.transformers {
            match binding.instantiate(path) {
                Ok(Some(transformer)) => registry.insert(transformer),
                Ok(None) | Err(_) if builtins.get(name).is_some() => {
                    debug!(transformer = %name, "Using built-in definition");
                    if let Some(builtin) = builtins.get(name) {
                        registry.insert(builtin.clone());
                    }
                }
                Ok(None) => warnings.push(
                    Stage::ConfigLoad,
                    name.as_str(),
                    format!("{} is not a transformer definition", path.display()),
                ),
                Err(err) => warnings.push(Stage::ConfigLoad, name.as_str(), err.to_string()),
            }
        }
        for (name, transformer) in builtins.transformers {
            registry.transformers.entry(name).or_insert(transformer);
        }

        let used = plan.used_transformers();
        registry.retain(|t| {
            used.iter().any(|u| u == t.name())
                || !t.metadata().consumes.contains(&ArtifactType::Service)
        });
        Ok(Outcome::new(registry, warnings))
    }

    pub fn from_transformers(transformers: impl IntoIterator<Item = Arc<dyn Transformer>>) -> Self {
        let mut registry = Self::new();
        for transformer in transformers {
            registry.insert(transformer);
        }
        registry
    }

    /// Adds `transformer`, replacing one with the same name.
    pub fn insert(&mut self, transformer: Arc<dyn Transformer>) {
        let name = transformer.name().to_string();
        if self.transformers.insert(name.clone(), transformer).is_some() {
            debug!(transformer = %name, "Transformer definition overridden");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.transformers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Transformer>> {
        self.transformers.values()
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Arc<dyn Transformer>) -> bool) {
        self.transformers.retain(|_, t| keep(t));
    }

    /// Definition file of every transformer, as recorded in a plan.
    pub fn configuration(&self) -> BTreeMap<String, PathBuf> {
        self.transformers
            .iter()
            .map(|(name, t)| (name.clone(), t.metadata().file_path.clone()))
            .collect()
    }
}

/// Writes the built-in definitions and templates below `dir` and returns the
/// definition paths.
fn materialize_builtins(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let write = |path: &Path, content: &str| -> Result<(), RegistryError> {
        let err = |source| RegistryError::Assets {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(err)?;
        }
        std::fs::write(path, content).map_err(err)
    };

    let mut paths = Vec::with_capacity(BUILTINS.len());
    for asset in BUILTINS {
        let base = dir.join(asset.dir);
        let definition = base.join(DEFINITION_FILE);
        write(&definition, asset.definition)?;
        if let Some(template) = asset.template {
            write(&base.join("templates").join("Dockerfile"), template)?;
        }
        paths.push(definition);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanwrightConfig;
    use crate::qa::DefaultEngine;
    use crate::transformer::TransformerClass;
    use tempfile::TempDir;

    fn run(dir: &TempDir) -> Arc<RunContext> {
        let config = PlanwrightConfig::default().with_assets_dir(dir.path().join("assets"));
        let source = dir.path().join("src");
        std::fs::create_dir_all(&source).unwrap();
        Arc::new(RunContext::new(&config, "shop", &source, &dir.path().join("out")).unwrap())
    }

    #[test]
    fn test_load_materializes_builtins() {
        let dir = TempDir::new().unwrap();
        let run = run(&dir);
        let (registry, warnings) = TransformerRegistry::load(run.clone(), None, Arc::new(DefaultEngine))
            .unwrap()
            .into_parts();

        assert!(warnings.is_empty());
        assert_eq!(registry.len(), BUILTINS.len());
        let php = registry.get("PhpDockerfileGenerator").unwrap();
        assert_eq!(php.metadata().class, TransformerClass::PhpDockerfileGenerator);
        let templates = php.metadata().templates_location.clone().unwrap();
        assert!(templates.join("Dockerfile").is_file());
        assert!(run.transformers_dir().join("compose").join(DEFINITION_FILE).is_file());
    }

    #[test]
    fn test_customization_overrides_and_bad_definitions_warn() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("custom");
        std::fs::create_dir_all(&custom).unwrap();
        std::fs::write(
            custom.join("compose.yaml"),
            "kind: Transformer\nmetadata:\n  name: ComposeAnalyser\nspec:\n  class: ComposeAnalyser\n  mode: Serverless\n  artifactTypes: [IR]\n",
        )
        .unwrap();
        std::fs::write(
            custom.join("broken.yaml"),
            "kind: Transformer\nmetadata:\n  name: X\nspec:\n  class: Nope\n",
        )
        .unwrap();
        std::fs::write(custom.join("cluster.yaml"), "kind: ClusterMetadata\nmetadata:\n  name: c\n").unwrap();

        let config = PlanwrightConfig::default().with_assets_dir(dir.path().join("assets"));
        let source = dir.path().join("src");
        std::fs::create_dir_all(&source).unwrap();
        let run = RunContext::new(&config, "shop", &source, &dir.path().join("out"))
            .unwrap()
            .with_customizations(Some(&custom))
            .unwrap();

        let (registry, warnings) = TransformerRegistry::load(Arc::new(run), None, Arc::new(DefaultEngine))
            .unwrap()
            .into_parts();
        let compose = registry.get("ComposeAnalyser").unwrap();
        assert_eq!(compose.metadata().mode.as_ref().map(|m| m.as_str()), Some("Serverless"));
        assert_eq!(warnings.count(Stage::ConfigLoad), 1);
    }

    #[test]
    fn test_configuration_lists_definition_files() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::load(run(&dir), None, Arc::new(DefaultEngine))
            .unwrap()
            .value;
        let configuration = registry.configuration();
        assert!(configuration["MavenAnalyser"].ends_with("maven/transformer.yaml"));
    }
}
