//! Configuration management for folio.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/folio/config.json`
//! 2. Environment variable: `FOLIO_CONFIG_CONTENT`
//! 3. Project config: `folio.json` in the working directory
//!
//! Later sources override earlier ones field by field.

use folio_snapshot::{CleanupHorizon, RetentionPolicy, SnapshotResult, TriggerMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding inline JSON configuration.
pub const CONFIG_CONTENT_ENV: &str = "FOLIO_CONFIG_CONTENT";

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = "folio.json";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax or shape.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Could not determine a directory folio needs.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Where document histories are stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Retention policy overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,
}

/// Partial retention policy; unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_horizon: Option<CleanupHorizon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_mode: Option<TriggerMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_auto_snapshots: Option<usize>,
}

impl HistoryConfig {
    fn merge(mut self, other: Self) -> Self {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.cleanup_horizon.is_some() {
            self.cleanup_horizon = other.cleanup_horizon;
        }
        if other.trigger_mode.is_some() {
            self.trigger_mode = other.trigger_mode;
        }
        if other.interval_minutes.is_some() {
            self.interval_minutes = other.interval_minutes;
        }
        if other.idle_seconds.is_some() {
            self.idle_seconds = other.idle_seconds;
        }
        if other.max_auto_snapshots.is_some() {
            self.max_auto_snapshots = other.max_auto_snapshots;
        }
        self
    }

    /// Apply the overrides on top of `base`.
    fn apply(&self, mut base: RetentionPolicy) -> RetentionPolicy {
        if let Some(enabled) = self.enabled {
            base.enabled = enabled;
        }
        if let Some(horizon) = self.cleanup_horizon {
            base.cleanup_horizon = horizon;
        }
        if let Some(mode) = self.trigger_mode {
            base.trigger_mode = mode;
        }
        if let Some(minutes) = self.interval_minutes {
            base.interval_minutes = minutes;
        }
        if let Some(seconds) = self.idle_seconds {
            base.idle_seconds = seconds;
        }
        if let Some(max) = self.max_auto_snapshots {
            base.max_auto_snapshots = max;
        }
        base
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Returns the merged config and the files it came from.
    pub async fn load(project_dir: Option<&Path>) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let env_content = std::env::var(CONFIG_CONTENT_ENV).ok();
        Self::load_from(
            folio_util::path::config_dir().as_deref(),
            env_content.as_deref(),
            project_dir,
        )
        .await
    }

    /// Load from explicit sources, in override order.
    pub async fn load_from(
        global_dir: Option<&Path>,
        env_content: Option<&str>,
        project_dir: Option<&Path>,
    ) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        // 1. Global config
        if let Some(dir) = global_dir {
            let path = dir.join("config.json");
            if path.exists() {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        // 2. Environment variable
        if let Some(content) = env_content {
            config = config.merge(Self::parse(content, "<env>")?);
        }

        // 3. Project config
        if let Some(dir) = project_dir {
            let path = dir.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        Ok((config, sources))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Merge another config into this one. `other` wins where it sets a value.
    pub fn merge(mut self, other: Self) -> Self {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        self.history = match (self.history, other.history) {
            (Some(base), Some(over)) => Some(base.merge(over)),
            (base, over) => over.or(base),
        };
        self
    }

    /// Effective retention policy: defaults plus overrides, validated.
    pub fn retention_policy(&self) -> SnapshotResult<RetentionPolicy> {
        let base = RetentionPolicy::default();
        match &self.history {
            Some(history) => history.apply(base).validated(),
            None => Ok(base),
        }
    }

    /// Storage root. An explicit override (the `--data-dir` flag) wins.
    pub fn data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf, ConfigError> {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .or_else(folio_util::path::data_dir)
            .ok_or_else(|| ConfigError::InvalidPath("could not determine data directory".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_snapshot::SnapshotError;
    use tempfile::TempDir;

    #[test]
    fn test_merge_later_wins_per_field() {
        let base = Config {
            log_level: Some("info".into()),
            data_dir: Some(PathBuf::from("/base")),
            history: Some(HistoryConfig {
                interval_minutes: Some(10),
                max_auto_snapshots: Some(50),
                ..Default::default()
            }),
        };
        let over = Config {
            log_level: None,
            data_dir: Some(PathBuf::from("/over")),
            history: Some(HistoryConfig {
                interval_minutes: Some(2),
                ..Default::default()
            }),
        };

        let merged = base.merge(over);
        assert_eq!(merged.log_level.as_deref(), Some("info"));
        assert_eq!(merged.data_dir, Some(PathBuf::from("/over")));

        let history = merged.history.unwrap();
        assert_eq!(history.interval_minutes, Some(2));
        assert_eq!(history.max_auto_snapshots, Some(50));
    }

    #[test]
    fn test_retention_policy_defaults() {
        let policy = Config::default().retention_policy().unwrap();
        assert_eq!(policy, RetentionPolicy::default());
    }

    #[test]
    fn test_retention_policy_applies_overrides() {
        let config: Config = serde_json::from_str(
            r#"{"history": {"cleanup_horizon": "never", "trigger_mode": "idle", "idle_seconds": 45}}"#,
        )
        .unwrap();

        let policy = config.retention_policy().unwrap();
        assert_eq!(policy.cleanup_horizon, CleanupHorizon::Never);
        assert_eq!(policy.trigger_mode, TriggerMode::Idle);
        assert_eq!(policy.idle_seconds, 45);
        assert_eq!(policy.interval_minutes, 5);
    }

    #[test]
    fn test_retention_policy_rejects_out_of_range() {
        let config: Config =
            serde_json::from_str(r#"{"history": {"cleanup_horizon": {"days": 45}}}"#).unwrap();
        assert!(matches!(
            config.retention_policy(),
            Err(SnapshotError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = Config::parse(r#"{"histroy": {}}"#, "<test>");
        assert!(matches!(result, Err(ConfigError::InvalidJson { .. })));
    }

    #[test]
    fn test_data_dir_override_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/from-config")),
            ..Default::default()
        };
        assert_eq!(
            config.data_dir(Some(Path::new("/from-flag"))).unwrap(),
            PathBuf::from("/from-flag")
        );
        assert_eq!(config.data_dir(None).unwrap(), PathBuf::from("/from-config"));
    }

    #[tokio::test]
    async fn test_load_from_merges_sources_in_order() {
        let global = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(
            global.path().join("config.json"),
            r#"{"log_level": "debug", "history": {"interval_minutes": 3, "max_auto_snapshots": 20}}"#,
        )
        .unwrap();
        std::fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            r#"{"history": {"max_auto_snapshots": 5}}"#,
        )
        .unwrap();

        let (config, sources) = Config::load_from(
            Some(global.path()),
            Some(r#"{"log_level": "warn", "history": {"interval_minutes": 7}}"#),
            Some(project.path()),
        )
        .await
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(config.log_level.as_deref(), Some("warn"));

        let policy = config.retention_policy().unwrap();
        assert_eq!(policy.interval_minutes, 7);
        assert_eq!(policy.max_auto_snapshots, 5);
    }

    #[tokio::test]
    async fn test_load_from_reports_bad_file() {
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join(PROJECT_CONFIG_FILE), "{ nope").unwrap();

        let err = Config::load_from(None, None, Some(project.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains(PROJECT_CONFIG_FILE));
    }
}
