//! Soft failures collected while planning, curating and transforming.
//!
//! None of these abort a run. Each stage returns its value together with the
//! warnings it accumulated so the caller decides how to surface them.

use serde::Serialize;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    /// A transformer's detection hook failed
    Detection,
    /// A configuration loader failed; defaults were kept
    ConfigLoad,
    /// Every parser in a fallback chain rejected a file
    ParseFallback,
    /// Nothing selectable remained for a service
    Curation,
    /// A transformer's transform hook failed
    Transform,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detection => "detection",
            Stage::ConfigLoad => "config-load",
            Stage::ParseFallback => "parse-fallback",
            Stage::Curation => "curation",
            Stage::Transform => "transform",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    /// Transformer, loader or service the warning is about
    pub source: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.source, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs a warning.
    pub fn push(&mut self, stage: Stage, source: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            stage,
            source: source.into(),
            message: message.into(),
        };
        warn!(stage = %warning.stage, source = %warning.source, "{}", warning.message);
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.0.iter().filter(|w| w.stage == stage).count()
    }
}

impl IntoIterator for Warnings {
    type Item = Warning;
    type IntoIter = std::vec::IntoIter<Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A result that also carries the soft failures met while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Warnings,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Warnings) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self::new(value, Warnings::new())
    }

    pub fn into_parts(self) -> (T, Warnings) {
        (self.value, self.warnings)
    }
}
