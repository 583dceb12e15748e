//! Question answering used by curation and by transformers that need an
//! operator decision.
//!
//! Every question carries a stable, dot-separated key under `planwright.` so
//! answers can be cached and replayed without a terminal.

mod cached;
mod console;
pub mod keys;
mod scripted;

pub use cached::CachedEngine;
pub use console::ConsoleEngine;
pub use scripted::ScriptedQaEngine;

use crate::config::PlanwrightConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Failed to read answer: {0}")]
    Io(#[from] std::io::Error),

    #[error("Answer cache {path} is invalid: {message}")]
    InvalidCache { path: String, message: String },

    #[error("No answer available for {0}")]
    Unanswered(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultiSelect {
        options: Vec<String>,
        default: Vec<String>,
    },
    Select {
        options: Vec<String>,
        default: String,
    },
    Input {
        default: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub key: String,
    pub prompt: String,
    pub hints: Vec<String>,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Multi(Vec<String>),
    Single(String),
}

impl Question {
    pub fn default_answer(&self) -> Answer {
        match &self.kind {
            QuestionKind::MultiSelect { default, .. } => Answer::Multi(default.clone()),
            QuestionKind::Select { default, .. } | QuestionKind::Input { default } => {
                Answer::Single(default.clone())
            }
        }
    }

    /// Coerces `answer` to something valid for this question.
    ///
    /// Multi-select answers keep only known options; a select answer outside
    /// the options falls back to the default.
    pub fn validate(&self, answer: Answer) -> Answer {
        match (&self.kind, answer) {
            (QuestionKind::MultiSelect { options, .. }, Answer::Multi(selected)) => {
                Answer::Multi(selected.into_iter().filter(|s| options.contains(s)).collect())
            }
            (QuestionKind::MultiSelect { options, .. }, Answer::Single(single)) => {
                Answer::Multi(if options.contains(&single) {
                    vec![single]
                } else {
                    Vec::new()
                })
            }
            (QuestionKind::Select { options, default }, Answer::Single(choice)) => {
                if options.is_empty() || options.contains(&choice) {
                    Answer::Single(choice)
                } else {
                    Answer::Single(default.clone())
                }
            }
            (QuestionKind::Input { .. }, Answer::Single(value)) => Answer::Single(value),
            _ => self.default_answer(),
        }
    }
}

/// Resolves a question to an answer.
pub trait QaEngine: Send + Sync {
    fn ask(&self, question: &Question) -> Result<Answer, QaError>;
}

fn resolve(engine: &dyn QaEngine, question: Question) -> Answer {
    match engine.ask(&question) {
        Ok(answer) => {
            let answer = question.validate(answer);
            debug!(key = %question.key, ?answer, "Question answered");
            answer
        }
        Err(err) => {
            warn!(key = %question.key, error = %err, "Falling back to default answer");
            question.default_answer()
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn fetch_multi_select(
    engine: &dyn QaEngine,
    key: &str,
    prompt: &str,
    hints: &[&str],
    default: &[String],
    options: &[String],
) -> Vec<String> {
    let question = Question {
        key: key.to_string(),
        prompt: prompt.to_string(),
        hints: owned(hints),
        kind: QuestionKind::MultiSelect {
            options: options.to_vec(),
            default: default.to_vec(),
        },
    };
    match resolve(engine, question) {
        Answer::Multi(selected) => selected,
        Answer::Single(single) => vec![single],
    }
}

pub fn fetch_select(
    engine: &dyn QaEngine,
    key: &str,
    prompt: &str,
    hints: &[&str],
    default: &str,
    options: &[String],
) -> String {
    let question = Question {
        key: key.to_string(),
        prompt: prompt.to_string(),
        hints: owned(hints),
        kind: QuestionKind::Select {
            options: options.to_vec(),
            default: default.to_string(),
        },
    };
    match resolve(engine, question) {
        Answer::Single(choice) => choice,
        Answer::Multi(mut selected) => selected.pop().unwrap_or_else(|| default.to_string()),
    }
}

pub fn fetch_input(
    engine: &dyn QaEngine,
    key: &str,
    prompt: &str,
    hints: &[&str],
    default: &str,
) -> String {
    let question = Question {
        key: key.to_string(),
        prompt: prompt.to_string(),
        hints: owned(hints),
        kind: QuestionKind::Input {
            default: default.to_string(),
        },
    };
    match resolve(engine, question) {
        Answer::Single(value) => value,
        Answer::Multi(values) => values.join(","),
    }
}

/// Answers every question with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEngine;

impl QaEngine for DefaultEngine {
    fn ask(&self, question: &Question) -> Result<Answer, QaError> {
        Ok(question.default_answer())
    }
}

/// Builds the engine selected by `config`, wrapped in the answer cache when
/// one is configured.
pub fn build_engine(config: &PlanwrightConfig) -> Result<Arc<dyn QaEngine>, QaError> {
    let base: Box<dyn QaEngine> = if config.qa_mode.is_interactive() {
        Box::new(ConsoleEngine)
    } else {
        Box::new(DefaultEngine)
    };
    match &config.qa_cache {
        Some(path) => Ok(Arc::new(CachedEngine::open(path, base)?)),
        None => Ok(Arc::from(base)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QaMode;
    use serial_test::serial;
    use tempfile::TempDir;

    fn options(items: &[&str]) -> Vec<String> {
        owned(items)
    }

    #[test]
    fn test_default_engine_returns_defaults() {
        let engine = DefaultEngine;
        let selected = fetch_multi_select(
            &engine,
            keys::MODES,
            "Choose modes",
            &[],
            &options(&["Container"]),
            &options(&["Container", "Serverless"]),
        );
        assert_eq!(selected, vec!["Container"]);

        let port = fetch_input(&engine, "planwright.services.web.port", "Port?", &[], "8080");
        assert_eq!(port, "8080");
    }

    #[test]
    fn test_multi_select_drops_unknown_options() {
        let engine = ScriptedQaEngine::new().with_multi(keys::MODES, &["Container", "Bogus"]);
        let selected = fetch_multi_select(
            &engine,
            keys::MODES,
            "Choose modes",
            &[],
            &[],
            &options(&["Container", "Serverless"]),
        );
        assert_eq!(selected, vec!["Container"]);
    }

    #[test]
    fn test_select_outside_options_uses_default() {
        let engine = ScriptedQaEngine::new().with_single(keys::TARGET_CLUSTER_TYPE, "Nomad");
        let choice = fetch_select(
            &engine,
            keys::TARGET_CLUSTER_TYPE,
            "Cluster?",
            &[],
            "Kubernetes",
            &options(&["Kubernetes", "Openshift"]),
        );
        assert_eq!(choice, "Kubernetes");
    }

    #[test]
    #[serial]
    fn test_build_engine_replays_cache_over_defaults() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("answers.yaml");
        std::fs::write(&cache, "planwright.modes:\n- Serverless\n").unwrap();

        let mut config = PlanwrightConfig::default().with_qa_mode(QaMode::Defaults);
        config.qa_cache = Some(cache.clone());
        let engine = build_engine(&config).unwrap();

        let modes = fetch_multi_select(
            engine.as_ref(),
            keys::MODES,
            "Choose modes",
            &[],
            &options(&["Container"]),
            &options(&["Container", "Serverless"]),
        );
        assert_eq!(modes, vec!["Serverless"]);

        let port = fetch_input(
            engine.as_ref(),
            "planwright.services.web.port",
            "Port?",
            &[],
            "8080",
        );
        assert_eq!(port, "8080");
        let recorded = std::fs::read_to_string(&cache).unwrap();
        assert!(recorded.contains("planwright.services.web.port"));
    }
}
