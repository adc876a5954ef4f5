//! Logging setup using tracing.
//!
//! Library crates only emit `tracing` events; binaries call [`init`] once.

use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events are enabled by the default filter.
const FOLIO_TARGETS: &[&str] = &["folio", "folio_snapshot", "folio_storage", "folio_util"];

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Log level applied to the folio crates.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Filter directives for the configured level, e.g. `folio=info,folio_snapshot=info,...`.
    pub fn directives(&self) -> String {
        FOLIO_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize logging with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init(config: LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directives()));

    let file = config.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: could not open log file {}: {e}", path.display());
                None
            }
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match file {
        Some(file) => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .try_init(),
        None => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("invalid"), None);
    }

    #[test]
    fn test_default_config_is_quiet() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_directives_cover_every_crate() {
        let config = LogConfig {
            level: LogLevel::Debug,
            ..Default::default()
        };
        let directives = config.directives();
        assert!(directives.contains("folio=debug"));
        assert!(directives.contains("folio_snapshot=debug"));
        assert!(directives.contains("folio_storage=debug"));
        assert!(directives.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_init_to_file_twice_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            level: LogLevel::Info,
            include_location: false,
            file: Some(dir.path().join("logs").join("folio.log")),
        };
        init(config.clone());
        init(config);
        assert!(dir.path().join("logs").join("folio.log").exists());
    }
}
