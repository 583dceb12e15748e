//! Source trees shared by the integration tests.

#![allow(dead_code)]

use planwright::{PlanwrightConfig, RunContext};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const COMPOSE: &str = r#"version: "3"
services:
  web:
    build:
      context: web
      dockerfile: Dockerfile.prod
    ports:
      - "8080:80"
    environment:
      APP_ENV: prod
  cache:
    image: redis:7
"#;

pub const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>orders-api</artifactId>
  <version>1.0.0</version>
</project>
"#;

pub const APACHE_CONF: &str = "<VirtualHost *:8081>\n  DocumentRoot /var/www/html\n</VirtualHost>\n";

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A workspace with `src/` (compose, PHP and Maven services) and room for
/// outputs next to it.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        let src = ws.source();
        write(&src, "docker-compose.yml", COMPOSE);
        write(&src, "web/index.php", "<?php echo 'web';\n");
        write(&src, "web/Dockerfile.prod", "FROM php:8-apache\n");
        write(&src, "blog/index.php", "<?php echo 'blog';\n");
        write(&src, "blog/site.conf", APACHE_CONF);
        write(&src, "api/pom.xml", POM);
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    pub fn assets(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn config(&self) -> PlanwrightConfig {
        PlanwrightConfig::default().with_assets_dir(self.assets())
    }

    pub fn run(&self, output: &Path) -> Arc<RunContext> {
        Arc::new(RunContext::new(&self.config(), "shop", &self.source(), output).unwrap())
    }
}
