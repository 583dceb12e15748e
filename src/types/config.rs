//! Typed configuration payloads carried by plans and artifacts.
//!
//! Each payload kind has its own concrete struct; [`Configs`] holds at most one
//! payload per [`ConfigKind`] and hands them back through typed accessors.

use super::ir::Ir;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKind {
    Service,
    ImageName,
    ComposeService,
    Maven,
    SpringBoot,
    Php,
    #[serde(rename = "IR")]
    Ir,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigKind::Service => "Service",
            ConfigKind::ImageName => "ImageName",
            ConfigKind::ComposeService => "ComposeService",
            ConfigKind::Maven => "Maven",
            ConfigKind::SpringBoot => "SpringBoot",
            ConfigKind::Php => "Php",
            ConfigKind::Ir => "IR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub service_name: String,
    /// Ports the service listens on, when a transformer found them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageName {
    pub image_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maven_app_name: String,
    /// POM packaging (`jar`, `war`, `ear`, `pom`)
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maven_profiles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringBootConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spring_boot_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spring_boot_app_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spring_boot_profiles: Vec<String>,
}

/// Values handed to the PHP Dockerfile template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhpTemplateConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conf_file: String,
    #[serde(default)]
    pub conf_file_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec")]
pub enum ArtifactConfig {
    Service(ServiceConfig),
    ImageName(ImageName),
    ComposeService(ComposeConfig),
    Maven(MavenConfig),
    SpringBoot(SpringBootConfig),
    Php(PhpTemplateConfig),
    #[serde(rename = "IR")]
    Ir(Ir),
}

impl ArtifactConfig {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ArtifactConfig::Service(_) => ConfigKind::Service,
            ArtifactConfig::ImageName(_) => ConfigKind::ImageName,
            ArtifactConfig::ComposeService(_) => ConfigKind::ComposeService,
            ArtifactConfig::Maven(_) => ConfigKind::Maven,
            ArtifactConfig::SpringBoot(_) => ConfigKind::SpringBoot,
            ArtifactConfig::Php(_) => ConfigKind::Php,
            ArtifactConfig::Ir(_) => ConfigKind::Ir,
        }
    }
}

/// At most one payload per kind, kept sorted by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ArtifactConfig>", into = "Vec<ArtifactConfig>")]
pub struct Configs(Vec<ArtifactConfig>);

macro_rules! typed_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self) -> Option<&$ty> {
            self.0.iter().find_map(|c| match c {
                ArtifactConfig::$variant(inner) => Some(inner),
                _ => None,
            })
        }
    };
}

impl Configs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a payload, replacing any payload of the same kind.
    pub fn insert(&mut self, config: ArtifactConfig) -> Option<ArtifactConfig> {
        let kind = config.kind();
        match self.0.binary_search_by_key(&kind, ArtifactConfig::kind) {
            Ok(idx) => Some(std::mem::replace(&mut self.0[idx], config)),
            Err(idx) => {
                self.0.insert(idx, config);
                None
            }
        }
    }

    pub fn with(mut self, config: ArtifactConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn get(&self, kind: ConfigKind) -> Option<&ArtifactConfig> {
        self.0.iter().find(|c| c.kind() == kind)
    }

    pub fn contains(&self, kind: ConfigKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn remove(&mut self, kind: ConfigKind) -> Option<ArtifactConfig> {
        let idx = self.0.iter().position(|c| c.kind() == kind)?;
        Some(self.0.remove(idx))
    }

    pub fn extend(&mut self, other: Configs) {
        for config in other.0 {
            self.insert(config);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactConfig> {
        self.0.iter()
    }

    typed_accessor!(service, Service, ServiceConfig);
    typed_accessor!(image_name, ImageName, ImageName);
    typed_accessor!(compose_service, ComposeService, ComposeConfig);
    typed_accessor!(maven, Maven, MavenConfig);
    typed_accessor!(spring_boot, SpringBoot, SpringBootConfig);
    typed_accessor!(php, Php, PhpTemplateConfig);
    typed_accessor!(ir, Ir, Ir);
}

impl From<Vec<ArtifactConfig>> for Configs {
    fn from(configs: Vec<ArtifactConfig>) -> Self {
        let mut out = Configs::new();
        for config in configs {
            out.insert(config);
        }
        out
    }
}

impl From<Configs> for Vec<ArtifactConfig> {
    fn from(configs: Configs) -> Self {
        configs.0
    }
}

impl FromIterator<ArtifactConfig> for Configs {
    fn from_iter<I: IntoIterator<Item = ArtifactConfig>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}
