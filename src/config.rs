//! Configuration management for planwright
//!
//! Settings are read from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `PLANWRIGHT_LOG_LEVEL`: Logging level - default: "info"
//! - `PLANWRIGHT_ASSETS_DIR`: Where built-in transformer definitions are
//!   materialised - default: system temp dir + "planwright-assets"
//! - `PLANWRIGHT_QA_CACHE`: Answers file to replay and extend - default: unset
//! - `PLANWRIGHT_QA_MODE`: Question answering (auto|interactive|defaults) - default: "auto"
//! - `PLANWRIGHT_MAX_DEPTH`: Directory walk depth - default: "32"
//! - `PLANWRIGHT_MAX_GENERATIONS`: Transform generations per service - default: "16"
//! - `PLANWRIGHT_PARALLEL`: Run detection and transforms concurrently - default: "true"
//!
//! # Example
//!
//! ```no_run
//! use planwright::PlanwrightConfig;
//!
//! let config = PlanwrightConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_DEPTH: usize = 32;
const DEFAULT_MAX_GENERATIONS: usize = 16;
const DEFAULT_PARALLEL: bool = true;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Invalid QA mode name
    #[error("Invalid QA mode: {0}. Valid options: auto, interactive, defaults")]
    InvalidQaMode(String),
}

/// How questions raised during curation and transformation are answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QaMode {
    /// Interactive when stdin is a terminal, defaults otherwise
    #[default]
    Auto,
    Interactive,
    Defaults,
}

impl FromStr for QaMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(QaMode::Auto),
            "interactive" => Ok(QaMode::Interactive),
            "defaults" | "default" => Ok(QaMode::Defaults),
            _ => Err(ConfigError::InvalidQaMode(s.to_string())),
        }
    }
}

impl fmt::Display for QaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QaMode::Auto => "auto",
            QaMode::Interactive => "interactive",
            QaMode::Defaults => "defaults",
        };
        f.write_str(name)
    }
}

impl QaMode {
    /// Resolves `Auto` against the current terminal.
    pub fn is_interactive(&self) -> bool {
        match self {
            QaMode::Auto => atty::is(atty::Stream::Stdin),
            QaMode::Interactive => true,
            QaMode::Defaults => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanwrightConfig {
    pub log_level: String,
    pub assets_dir: PathBuf,
    pub qa_cache: Option<PathBuf>,
    pub qa_mode: QaMode,
    pub max_depth: usize,
    pub max_generations: usize,
    pub parallel: bool,
}

impl Default for PlanwrightConfig {
    /// Loads from `PLANWRIGHT_*` environment variables, falling back to defaults
    fn default() -> Self {
        let log_level = env::var("PLANWRIGHT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let assets_dir = env::var("PLANWRIGHT_ASSETS_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("planwright-assets"));

        let qa_cache = env::var("PLANWRIGHT_QA_CACHE").ok().map(PathBuf::from);

        let qa_mode = env::var("PLANWRIGHT_QA_MODE")
            .ok()
            .and_then(|v| v.parse::<QaMode>().ok())
            .unwrap_or_default();

        let max_depth = env::var("PLANWRIGHT_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);

        let max_generations = env::var("PLANWRIGHT_MAX_GENERATIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_GENERATIONS);

        let parallel = env::var("PLANWRIGHT_PARALLEL")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_PARALLEL);

        Self {
            log_level,
            assets_dir,
            qa_cache,
            qa_mode,
            max_depth,
            max_generations,
            parallel,
        }
    }
}

impl PlanwrightConfig {
    /// Validates numeric ranges and the log level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > 256 {
            return Err(ConfigError::ValidationFailed(format!(
                "Max depth must be between 1 and 256, got {}",
                self.max_depth
            )));
        }

        if self.max_generations == 0 || self.max_generations > 1024 {
            return Err(ConfigError::ValidationFailed(format!(
                "Max generations must be between 1 and 1024, got {}",
                self.max_generations
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn with_qa_mode(mut self, qa_mode: QaMode) -> Self {
        self.qa_mode = qa_mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl fmt::Display for PlanwrightConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Planwright Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Assets Dir: {}", self.assets_dir.display())?;
        match &self.qa_cache {
            Some(path) => writeln!(f, "  QA Cache: {}", path.display())?,
            None => writeln!(f, "  QA Cache: disabled")?,
        }
        writeln!(f, "  QA Mode: {}", self.qa_mode)?;
        writeln!(f, "  Max Depth: {}", self.max_depth)?;
        writeln!(f, "  Max Generations: {}", self.max_generations)?;
        write!(f, "  Parallel: {}", self.parallel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PLANWRIGHT_LOG_LEVEL",
            "PLANWRIGHT_ASSETS_DIR",
            "PLANWRIGHT_QA_CACHE",
            "PLANWRIGHT_QA_MODE",
            "PLANWRIGHT_MAX_DEPTH",
            "PLANWRIGHT_MAX_GENERATIONS",
            "PLANWRIGHT_PARALLEL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = PlanwrightConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_generations, DEFAULT_MAX_GENERATIONS);
        assert!(config.parallel);
        assert!(config.qa_cache.is_none());
        assert_eq!(config.qa_mode, QaMode::Auto);
        assert!(config.assets_dir.ends_with("planwright-assets"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("PLANWRIGHT_LOG_LEVEL", "DEBUG");
        env::set_var("PLANWRIGHT_QA_MODE", "defaults");
        env::set_var("PLANWRIGHT_MAX_DEPTH", "4");
        env::set_var("PLANWRIGHT_PARALLEL", "false");
        env::set_var("PLANWRIGHT_QA_CACHE", "/tmp/answers.yaml");

        let config = PlanwrightConfig::default();
        clear_env();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.qa_mode, QaMode::Defaults);
        assert_eq!(config.max_depth, 4);
        assert!(!config.parallel);
        assert_eq!(config.qa_cache, Some(PathBuf::from("/tmp/answers.yaml")));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_out_of_range() {
        clear_env();
        let mut config = PlanwrightConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = PlanwrightConfig::default();
        config.max_generations = 5000;
        assert!(config.validate().is_err());

        let mut config = PlanwrightConfig::default();
        config.log_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_qa_mode_parse() {
        assert_eq!("Interactive".parse::<QaMode>().unwrap(), QaMode::Interactive);
        assert_eq!("default".parse::<QaMode>().unwrap(), QaMode::Defaults);
        assert!("sometimes".parse::<QaMode>().is_err());
        assert!(!QaMode::Defaults.is_interactive());
    }
}
