//! Logging setup for the `planwright` binary.
//!
//! Everything is written to stderr so plan and transform summaries on stdout
//! stay machine-readable. `RUST_LOG` directives are honoured on top of the
//! configured level.
//!
//! ```no_run
//! use planwright::util::{init_logging, LoggingConfig};
//!
//! // PLANWRIGHT_LOG_LEVEL=debug planwright plan -s ./shop
//! init_logging(LoggingConfig::from_env().with_overrides(None, false, false));
//! tracing::info!(services = 3, "Plan created");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "PLANWRIGHT_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "PLANWRIGHT_LOG_JSON";

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level for planwright's own events
    pub level: Level,
    /// One JSON object per event, with file and line
    pub use_json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `PLANWRIGHT_LOG_LEVEL` and `PLANWRIGHT_LOG_JSON`.
    pub fn from_env() -> Self {
        let level = env::var(LOG_LEVEL_ENV)
            .map(|l| parse_level(&l))
            .unwrap_or(Level::INFO);
        let use_json = env::var(LOG_JSON_ENV)
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);
        Self { level, use_json }
    }

    /// Command line flags win over the environment: an explicit level first,
    /// then `--verbose`, then `--quiet`.
    pub fn with_overrides(mut self, level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        if let Some(level) = level {
            self.level = parse_level(level);
        } else if verbose {
            self.level = Level::DEBUG;
        } else if quiet {
            self.level = Level::ERROR;
        }
        self
    }
}

/// Case-insensitive level name; unknown names fall back to INFO.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Filter directives added to whatever `RUST_LOG` holds.
fn directives(level: Level, rust_log_set: bool) -> Vec<String> {
    let mut directives = vec![format!("planwright={}", level.as_str().to_lowercase())];
    // Directory walking is chatty at debug level
    if !rust_log_set {
        directives.extend(["ignore=warn".to_string(), "globset=warn".to_string()]);
    }
    directives
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        for directive in directives(config.level, env::var("RUST_LOG").is_ok()) {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }

        let layer = fmt::layer()
            .with_target(true)
            .with_file(config.use_json)
            .with_line_number(config.use_json)
            .with_writer(std::io::stderr);
        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use yare::parameterized;

    #[parameterized(
        lower = { "debug", Level::DEBUG },
        upper = { "TRACE", Level::TRACE },
        mixed = { "Warn", Level::WARN },
        unknown = { "chatty", Level::INFO },
        empty = { "", Level::INFO },
    )]
    fn test_parse_level(input: &str, expected: Level) {
        assert_eq!(parse_level(input), expected);
    }

    #[parameterized(
        explicit_level_wins = { Some("trace"), true, true, Level::TRACE },
        verbose = { None, true, false, Level::DEBUG },
        quiet = { None, false, true, Level::ERROR },
        untouched = { None, false, false, Level::WARN },
    )]
    fn test_overrides(level: Option<&str>, verbose: bool, quiet: bool, expected: Level) {
        let config = LoggingConfig {
            level: Level::WARN,
            use_json: false,
        }
        .with_overrides(level, verbose, quiet);
        assert_eq!(config.level, expected);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var(LOG_LEVEL_ENV, "debug");
        env::set_var(LOG_JSON_ENV, "true");
        let config = LoggingConfig::from_env();
        env::remove_var(LOG_LEVEL_ENV);
        env::remove_var(LOG_JSON_ENV);

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
        assert_eq!(LoggingConfig::from_env(), LoggingConfig::default());
    }

    #[test]
    fn test_walker_crates_quietened_unless_rust_log_set() {
        assert_eq!(
            directives(Level::DEBUG, false),
            vec!["planwright=debug", "ignore=warn", "globset=warn"]
        );
        assert_eq!(directives(Level::ERROR, true), vec!["planwright=error"]);
    }
}
