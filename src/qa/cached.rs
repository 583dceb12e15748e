use super::{Answer, QaEngine, QaError, Question};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Replays answers from a YAML file and records new ones into it.
pub struct CachedEngine {
    path: PathBuf,
    inner: Box<dyn QaEngine>,
    answers: Mutex<BTreeMap<String, Answer>>,
}

impl CachedEngine {
    pub fn open(path: &Path, inner: Box<dyn QaEngine>) -> Result<Self, QaError> {
        let answers = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&content).map_err(|e| QaError::InvalidCache {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), cached = answers.len(), "Loaded answer cache");

        Ok(Self {
            path: path.to_path_buf(),
            inner,
            answers: Mutex::new(answers),
        })
    }

    fn persist(&self, answers: &BTreeMap<String, Answer>) {
        let result = serde_yaml::to_string(answers)
            .map_err(|e| e.to_string())
            .and_then(|yaml| {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
                }
                fs::write(&self.path, yaml).map_err(|e| e.to_string())
            });
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "Failed to persist answer cache");
        }
    }
}

impl QaEngine for CachedEngine {
    fn ask(&self, question: &Question) -> Result<Answer, QaError> {
        let cached = self
            .answers
            .lock()
            .ok()
            .and_then(|answers| answers.get(&question.key).cloned());
        if let Some(answer) = cached {
            debug!(key = %question.key, "Using cached answer");
            return Ok(answer);
        }

        let answer = self.inner.ask(question)?;
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(question.key.clone(), answer.clone());
            self.persist(&answers);
        }
        Ok(answer)
    }
}
