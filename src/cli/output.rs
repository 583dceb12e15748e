//! Output formatting for multiple formats
//!
//! Summaries of a plan or of a transform run are printed to stdout as JSON,
//! YAML or human-readable text. The documents themselves (plan, IR, path
//! mappings) are always written to files as YAML.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::diagnostics::{Warning, Warnings};
use crate::planner::ExecutionResult;
use crate::types::Plan;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSummary<'a> {
    name: &'a str,
    root_dir: &'a PathBuf,
    services: BTreeMap<&'a str, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_cluster: Option<&'a str>,
    warnings: Vec<&'a Warning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionSummary<'a> {
    services: Vec<&'a str>,
    images: Vec<&'a str>,
    artifacts: usize,
    path_mappings: usize,
    warnings: Vec<&'a Warning>,
}

/// Formats run summaries
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Summarises a plan together with the warnings met while producing it
    pub fn format_plan(&self, plan: &Plan, warnings: &Warnings) -> Result<String> {
        let summary = PlanSummary {
            name: plan.name(),
            root_dir: &plan.spec.root_dir,
            services: plan
                .services()
                .iter()
                .map(|(name, candidates)| {
                    let labels = candidates
                        .iter()
                        .map(|t| match t.mode() {
                            Some(mode) => format!("{} ({})", t.transformer_name, mode),
                            None => t.transformer_name.clone(),
                        })
                        .collect();
                    (name.as_str(), labels)
                })
                .collect(),
            target_cluster: Some(plan.spec.target_cluster.cluster_type.as_str())
                .filter(|t| !t.is_empty()),
            warnings: warnings.iter().collect(),
        };

        match self.format {
            OutputFormat::Json => to_json(&summary),
            OutputFormat::Yaml => to_yaml(&summary),
            OutputFormat::Human => Ok(plan_human(&summary)),
        }
    }

    /// Summarises the result of a transform run
    pub fn format_execution(&self, result: &ExecutionResult) -> Result<String> {
        let summary = ExecutionSummary {
            services: result.ir.services.keys().map(String::as_str).collect(),
            images: result.ir.containers.keys().map(String::as_str).collect(),
            artifacts: result.artifacts.len(),
            path_mappings: result.path_mappings.len(),
            warnings: result.warnings.iter().collect(),
        };

        match self.format {
            OutputFormat::Json => to_json(&summary),
            OutputFormat::Yaml => to_yaml(&summary),
            OutputFormat::Human => Ok(execution_human(&summary)),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize to YAML")
}

fn plan_human(summary: &PlanSummary<'_>) -> String {
    let mut output = String::new();
    output.push_str(&format!("Plan: {}\n", summary.name));
    output.push_str(&format!("Root: {}\n", summary.root_dir.display()));
    if let Some(cluster) = summary.target_cluster {
        output.push_str(&format!("Target cluster: {}\n", cluster));
    }

    if summary.services.is_empty() {
        output.push_str("\nNo services detected\n");
    } else {
        output.push_str(&format!("\nServices ({}):\n", summary.services.len()));
        for (name, transformers) in &summary.services {
            output.push_str(&format!("  {}\n", name));
            for transformer in transformers {
                output.push_str(&format!("    - {}\n", transformer));
            }
        }
    }

    push_warnings(&mut output, &summary.warnings);
    output
}

fn execution_human(summary: &ExecutionSummary<'_>) -> String {
    let mut output = String::new();
    output.push_str(&format!("Services ({}):\n", summary.services.len()));
    for name in &summary.services {
        output.push_str(&format!("  {}\n", name));
    }
    output.push_str(&format!("Images ({}):\n", summary.images.len()));
    for image in &summary.images {
        output.push_str(&format!("  {}\n", image));
    }
    output.push_str(&format!(
        "\n{} artifacts, {} path mappings\n",
        summary.artifacts, summary.path_mappings
    ));

    push_warnings(&mut output, &summary.warnings);
    output
}

fn push_warnings(output: &mut String, warnings: &[&Warning]) {
    if warnings.is_empty() {
        return;
    }
    output.push_str(&format!("\nWarnings ({}):\n", warnings.len()));
    for warning in warnings {
        output.push_str(&format!("  {}\n", warning));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Stage;
    use crate::types::{ArtifactType, Mode, ServiceIr, TransformerPlan};

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("shop", "/src/shop");
        plan.spec.services.insert(
            "web".to_string(),
            vec![TransformerPlan {
                transformer_name: "PhpDockerfileGenerator".to_string(),
                mode: Some(Mode::Container),
                artifact_types: vec![ArtifactType::ContainerBuild],
                ..Default::default()
            }],
        );
        plan
    }

    #[test]
    fn test_plan_human() {
        let mut warnings = Warnings::new();
        warnings.push(Stage::Detection, "MavenAnalyser", "bad pom");

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_plan(&sample_plan(), &warnings)
            .unwrap();

        assert!(output.contains("Plan: shop"));
        assert!(output.contains("PhpDockerfileGenerator (Container)"));
        assert!(output.contains("Warnings (1):"));
        assert!(output.contains("bad pom"));
    }

    #[test]
    fn test_plan_json() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_plan(&sample_plan(), &Warnings::new())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["name"], "shop");
        assert_eq!(parsed["services"]["web"][0], "PhpDockerfileGenerator (Container)");
        assert!(parsed.get("targetCluster").is_none());
    }

    #[test]
    fn test_empty_plan_human() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_plan(&Plan::new("empty", "/src"), &Warnings::new())
            .unwrap();
        assert!(output.contains("No services detected"));
        assert!(!output.contains("Warnings"));
    }

    #[test]
    fn test_execution_yaml() {
        let mut result = ExecutionResult::default();
        result.ir.add_service(ServiceIr::new("web"));

        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_execution(&result)
            .unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed["services"][0], "web");
        assert_eq!(parsed["artifacts"], 0);
    }
}
