//! Maven and Spring Boot project analyser.
//!
//! Each `pom.xml` with a deployable packaging becomes a named service. Spring
//! Boot projects additionally carry the boot version, application name and
//! the profiles found next to `application.properties`.

use super::{dockerfile_artifacts, output_project_dir, source_mapping, template_mapping};
use crate::diagnostics::Stage;
use crate::transformer::common::make_dns_compliant;
use crate::transformer::{
    DetectedServices, Environment, TransformOutput, Transformer, TransformerError,
    TransformerMetadata,
};
use crate::types::{
    Artifact, ArtifactConfig, ArtifactType, MavenConfig, Mode, PathKind, SpringBootConfig,
    TransformerPlan,
};
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const POM_FILE: &str = "pom.xml";
const RESOURCES_DIR: &str = "src/main/resources";
const SPRING_BOOT_GROUP: &str = "org.springframework.boot";
const SPRING_BOOT_PARENT: &str = "spring-boot-starter-parent";
const DEFAULT_PORT: u16 = 8080;

/// The parts of a POM the analyser cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomInfo {
    pub artifact_id: String,
    pub packaging: String,
    pub profiles: Vec<String>,
    /// Spring Boot version; `Some("")` when boot is used without a version
    pub spring_boot: Option<String>,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn text(node: Option<Node<'_, '_>>) -> Option<String> {
    node.and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl PomInfo {
    pub fn parse(content: &str) -> Result<Self, String> {
        let doc = Document::parse(content).map_err(|e| e.to_string())?;
        let project = doc.root_element();
        if project.tag_name().name() != "project" {
            return Err(format!(
                "unexpected root element {}",
                project.tag_name().name()
            ));
        }

        let artifact_id =
            text(child(project, "artifactId")).ok_or_else(|| "missing artifactId".to_string())?;
        let packaging = text(child(project, "packaging")).unwrap_or_else(|| "jar".to_string());

        let profiles = child(project, "profiles")
            .map(|p| {
                children(p, "profile")
                    .filter_map(|profile| text(child(profile, "id")))
                    .collect()
            })
            .unwrap_or_default();

        let from_parent = child(project, "parent")
            .filter(|p| text(child(*p, "artifactId")).as_deref() == Some(SPRING_BOOT_PARENT))
            .map(|p| text(child(p, "version")).unwrap_or_default());
        let from_dependencies = || {
            child(project, "dependencies").and_then(|deps| {
                children(deps, "dependency")
                    .find(|d| text(child(*d, "groupId")).as_deref() == Some(SPRING_BOOT_GROUP))
                    .map(|d| text(child(d, "version")).unwrap_or_default())
            })
        };

        Ok(Self {
            artifact_id,
            packaging,
            profiles,
            spring_boot: from_parent.or_else(from_dependencies),
        })
    }
}

/// `key=value` pairs of a Java properties file; comments are skipped.
fn read_properties(path: &Path) -> BTreeMap<String, String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
        .filter_map(|l| {
            l.split_once(|c: char| c == '=' || c == ':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Profiles declared by `application-<profile>.{properties,yml,yaml}` files.
fn spring_profiles(resources: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(resources) else {
        return Vec::new();
    };
    let mut profiles: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter_map(|name| {
            let stem = name
                .strip_suffix(".properties")
                .or_else(|| name.strip_suffix(".yml"))
                .or_else(|| name.strip_suffix(".yaml"))?;
            stem.strip_prefix("application-").map(str::to_string)
        })
        .collect();
    profiles.sort();
    profiles.dedup();
    profiles
}

pub struct MavenAnalyser {
    metadata: TransformerMetadata,
    env: Environment,
}

impl MavenAnalyser {
    pub fn new(metadata: TransformerMetadata, env: Environment) -> Result<Self, TransformerError> {
        Ok(Self { metadata, env })
    }

    fn spring_boot_config(&self, dir: &Path, version: String) -> SpringBootConfig {
        let resources = dir.join(RESOURCES_DIR);
        let properties = read_properties(&resources.join("application.properties"));
        SpringBootConfig {
            spring_boot_version: version,
            spring_boot_app_name: properties
                .get("spring.application.name")
                .cloned()
                .unwrap_or_default(),
            spring_boot_profiles: spring_profiles(&resources),
        }
    }

    fn server_port(project_dir: &Path) -> u16 {
        read_properties(&project_dir.join(RESOURCES_DIR).join("application.properties"))
            .get("server.port")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }
}

impl Transformer for MavenAnalyser {
    fn metadata(&self) -> &TransformerMetadata {
        &self.metadata
    }

    fn environment(&self) -> &Environment {
        &self.env
    }

    fn detect_in_subdir(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let pom_path = dir.join(POM_FILE);
        if !pom_path.is_file() {
            return Ok(DetectedServices::none());
        }
        let content =
            std::fs::read_to_string(&pom_path).map_err(|e| TransformerError::io(&pom_path, e))?;
        let pom = PomInfo::parse(&content).map_err(|message| TransformerError::Parse {
            path: pom_path.clone(),
            message,
        })?;
        if pom.packaging == "pom" {
            debug!(pom = %pom_path.display(), "Skipping aggregator POM");
            return Ok(DetectedServices::none());
        }

        let mut plan = TransformerPlan {
            transformer_name: self.metadata.name.clone(),
            mode: self.metadata.mode.clone().or(Some(Mode::Container)),
            artifact_types: self.metadata.artifact_types.clone(),
            base_artifact_types: self.metadata.base_artifact_types.clone(),
            ..Default::default()
        }
        .with_config(ArtifactConfig::Maven(MavenConfig {
            maven_app_name: pom.artifact_id.clone(),
            artifact_type: pom.packaging.clone(),
            maven_profiles: pom.profiles.clone(),
        }))
        .with_path(PathKind::MavenPom, pom_path.clone())
        .with_path(PathKind::ProjectPath, dir);

        if let Some(version) = pom.spring_boot {
            plan = plan.with_config(ArtifactConfig::SpringBoot(
                self.spring_boot_config(dir, version),
            ));
        }

        let name = make_dns_compliant(&pom.artifact_id);
        debug!(service = %name, pom = %pom_path.display(), "Found a Maven project");
        let mut detected = DetectedServices::none();
        detected.named.insert(name, vec![plan]);
        Ok(detected)
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
            let (Some(project_dir), Some(maven)) = (
                artifact.first_path(&PathKind::ProjectPath),
                artifact.configs.maven(),
            ) else {
                output.warnings.push(
                    Stage::Transform,
                    self.metadata.name.as_str(),
                    format!("Artifact {} has no project path or maven config", artifact.name),
                );
                continue;
            };
            let port = Self::server_port(project_dir);
            info!(service = %artifact.name, port, "Generating Maven Dockerfile");

            let dest = output_project_dir(&self.env, project_dir);
            output.path_mappings.push(source_mapping(&self.env));
            output.path_mappings.push(template_mapping(
                &self.env,
                self.metadata.templates_location.as_deref(),
                dest.clone(),
                ArtifactConfig::Maven(maven.clone()),
            ));
            let context = self.env.output().join(dest);
            output.artifacts.extend(dockerfile_artifacts(
                artifact,
                &context.join("Dockerfile"),
                &context,
                &[port],
            ));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SPRING_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
    <version>3.2.0</version>
  </parent>
  <artifactId>orders</artifactId>
  <profiles>
    <profile><id>dev</id></profile>
    <profile><id>prod</id></profile>
  </profiles>
</project>"#;

    #[test]
    fn test_parse_spring_boot_parent() {
        let pom = PomInfo::parse(SPRING_POM).unwrap();
        assert_eq!(pom.artifact_id, "orders");
        assert_eq!(pom.packaging, "jar");
        assert_eq!(pom.profiles, vec!["dev", "prod"]);
        assert_eq!(pom.spring_boot.as_deref(), Some("3.2.0"));
    }

    #[test]
    fn test_parse_spring_boot_dependency_and_packaging() {
        let pom = PomInfo::parse(
            r#"<project>
  <artifactId>legacy</artifactId>
  <packaging>war</packaging>
  <dependencies>
    <dependency><groupId>junit</groupId><artifactId>junit</artifactId></dependency>
    <dependency><groupId>org.springframework.boot</groupId><artifactId>spring-boot-starter-web</artifactId></dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();
        assert_eq!(pom.packaging, "war");
        assert_eq!(pom.spring_boot.as_deref(), Some(""));
    }

    #[test]
    fn test_plain_pom_has_no_spring_boot() {
        let pom = PomInfo::parse("<project><artifactId>lib</artifactId></project>").unwrap();
        assert!(pom.spring_boot.is_none());
        assert!(PomInfo::parse("<project/>").is_err());
        assert!(PomInfo::parse("not xml").is_err());
    }

    #[test]
    fn test_properties_and_profiles() {
        let dir = TempDir::new().unwrap();
        let resources = dir.path().join(RESOURCES_DIR);
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(
            resources.join("application.properties"),
            "# comment\nspring.application.name = orders-api\nserver.port=9000\n",
        )
        .unwrap();
        std::fs::write(resources.join("application-dev.yml"), "").unwrap();
        std::fs::write(resources.join("application-prod.properties"), "").unwrap();

        assert_eq!(spring_profiles(&resources), vec!["dev", "prod"]);
        assert_eq!(MavenAnalyser::server_port(dir.path()), 9000);
        let props = read_properties(&resources.join("application.properties"));
        assert_eq!(props["spring.application.name"], "orders-api");
    }
}
