//! Project-wide intermediate representation produced by transformers.
//!
//! Merging is key-wise: disjoint services and containers are simply united.
//! On a collision, collections are unioned and scalar fields are only filled
//! when the existing entry left them unset, so a merge never discards a value
//! that an earlier fragment already set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ir {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceIr>,
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIr {
    pub name: String,
    /// Image tags this service runs
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub images: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ports: BTreeSet<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerImage {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exposed_ports: BTreeSet<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub accessed_dirs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ContainerBuild>,
}

/// How an image is built from the source tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerBuild {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
}

impl Ir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.containers.is_empty()
    }

    pub fn add_service(&mut self, service: ServiceIr) {
        match self.services.get_mut(&service.name) {
            Some(existing) => existing.merge(service),
            None => {
                self.services.insert(service.name.clone(), service);
            }
        }
    }

    pub fn add_container(&mut self, image_tag: impl Into<String>, container: ContainerImage) {
        self.containers
            .entry(image_tag.into())
            .and_modify(|existing| existing.merge(container.clone()))
            .or_insert(container);
    }

    pub fn merge(&mut self, other: Ir) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        for (_, service) in other.services {
            self.add_service(service);
        }
        for (tag, container) in other.containers {
            self.add_container(tag, container);
        }
    }
}

impl ServiceIr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: ServiceIr) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        self.images.extend(other.images);
        self.ports.extend(other.ports);
        fill_unset(&mut self.environment, other.environment);
        fill_unset(&mut self.annotations, other.annotations);
    }
}

impl ContainerImage {
    pub fn merge(&mut self, other: ContainerImage) {
        self.exposed_ports.extend(other.exposed_ports);
        self.accessed_dirs.extend(other.accessed_dirs);
        if self.user_id.is_none() {
            self.user_id = other.user_id;
        }
        if self.build.is_none() {
            self.build = other.build;
        }
    }
}

fn fill_unset(target: &mut BTreeMap<String, String>, source: BTreeMap<String, String>) {
    for (key, value) in source {
        target.entry(key).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, image: &str, port: u16) -> ServiceIr {
        let mut s = ServiceIr::new(name);
        s.images.insert(image.to_string());
        s.ports.insert(port);
        s
    }

    #[test]
    fn test_merge_disjoint_is_commutative() {
        let mut a = Ir::new("proj");
        a.add_service(service("web", "web:latest", 80));
        let mut b = Ir::new("proj");
        b.add_service(service("api", "api:latest", 8080));
        b.add_container("api:latest", ContainerImage::default());

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        assert_eq!(ab, ba);
        assert_eq!(ab.services.len(), 2);
    }

    #[test]
    fn test_merge_colliding_service_unions_fields() {
        let mut ir = Ir::new("proj");
        let mut first = service("web", "web:1", 80);
        first.environment.insert("MODE".into(), "prod".into());
        ir.add_service(first);

        let mut second = service("web", "web:2", 443);
        second.environment.insert("MODE".into(), "dev".into());
        second.environment.insert("DEBUG".into(), "0".into());
        ir.add_service(second);

        let web = &ir.services["web"];
        assert_eq!(web.images.len(), 2);
        assert_eq!(web.ports.iter().copied().collect::<Vec<_>>(), vec![80, 443]);
        assert_eq!(web.environment["MODE"], "prod");
        assert_eq!(web.environment["DEBUG"], "0");
    }

    #[test]
    fn test_container_merge_fills_only_unset_scalars() {
        let mut ir = Ir::default();
        ir.add_container(
            "app:latest",
            ContainerImage {
                user_id: Some(1001),
                ..Default::default()
            },
        );
        ir.add_container(
            "app:latest",
            ContainerImage {
                user_id: Some(0),
                exposed_ports: [8080].into_iter().collect(),
                build: Some(ContainerBuild {
                    context: PathBuf::from("/src/app"),
                    dockerfile: PathBuf::from("/src/app/Dockerfile"),
                }),
                ..Default::default()
            },
        );

        let c = &ir.containers["app:latest"];
        assert_eq!(c.user_id, Some(1001));
        assert!(c.exposed_ports.contains(&8080));
        assert!(c.build.is_some());
    }

    #[test]
    fn test_merge_keeps_existing_name() {
        let mut ir = Ir::new("first");
        ir.merge(Ir::new("second"));
        assert_eq!(ir.name, "first");

        let mut unnamed = Ir::default();
        unnamed.merge(Ir::new("second"));
        assert_eq!(unnamed.name, "second");
    }
}
