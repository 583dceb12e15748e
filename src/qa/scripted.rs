use super::{Answer, QaEngine, QaError, Question};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Engine with canned answers; unknown keys get the question's default.
///
/// Records every key it was asked so callers can assert on the dialogue.
#[derive(Debug, Default)]
pub struct ScriptedQaEngine {
    answers: Mutex<BTreeMap<String, Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedQaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multi(self, key: &str, values: &[&str]) -> Self {
        self.set(key, Answer::Multi(values.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn with_single(self, key: &str, value: &str) -> Self {
        self.set(key, Answer::Single(value.to_string()));
        self
    }

    pub fn set(&self, key: &str, answer: Answer) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(key.to_string(), answer);
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl QaEngine for ScriptedQaEngine {
    fn ask(&self, question: &Question) -> Result<Answer, QaError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.key.clone());
        }
        let scripted = self
            .answers
            .lock()
            .ok()
            .and_then(|answers| answers.get(&question.key).cloned());
        Ok(scripted.unwrap_or_else(|| question.default_answer()))
    }
}
