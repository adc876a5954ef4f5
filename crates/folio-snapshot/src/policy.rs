//! Retention policy: when automatic capture fires and how long AUTO snapshots live.

use crate::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Day counts accepted as a cleanup horizon.
pub const ALLOWED_HORIZON_DAYS: [u32; 7] = [30, 60, 90, 120, 180, 240, 360];

/// Accepted `interval_minutes` values.
pub const INTERVAL_MINUTES: RangeInclusive<u32> = 1..=15;

/// Accepted `idle_seconds` values.
pub const IDLE_SECONDS: RangeInclusive<u32> = 10..=120;

/// Default cap on AUTO snapshots kept per document.
pub const DEFAULT_MAX_AUTO_SNAPSHOTS: usize = 100;

/// Maximum age of an AUTO snapshot before age-based cleanup removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupHorizon {
    /// Remove AUTO snapshots older than this many days.
    Days(u32),
    /// Never remove by age.
    Never,
}

impl CleanupHorizon {
    /// Build a day-count horizon, rejecting counts outside [`ALLOWED_HORIZON_DAYS`].
    pub fn days(days: u32) -> SnapshotResult<Self> {
        let horizon = Self::Days(days);
        horizon.validate()?;
        Ok(horizon)
    }

    /// Horizon as a duration, `None` for [`CleanupHorizon::Never`].
    pub fn as_duration(&self) -> Option<chrono::Duration> {
        match self {
            Self::Days(days) => Some(chrono::Duration::days(i64::from(*days))),
            Self::Never => None,
        }
    }

    pub fn validate(&self) -> SnapshotResult<()> {
        match self {
            Self::Days(days) if !ALLOWED_HORIZON_DAYS.contains(days) => {
                Err(SnapshotError::invalid_configuration(format!(
                    "cleanup horizon must be one of {ALLOWED_HORIZON_DAYS:?} days or never, got {days}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for CleanupHorizon {
    fn default() -> Self {
        Self::Days(30)
    }
}

/// What starts an automatic capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Every `interval_minutes` while there are uncaptured edits.
    #[default]
    Interval,
    /// After `idle_seconds` without edits following an edit.
    Idle,
}

/// Retention and auto-capture settings for a document history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Master switch for automatic capture and age cleanup.
    /// Manual milestone capture works regardless.
    pub enabled: bool,

    /// How long AUTO snapshots are kept.
    pub cleanup_horizon: CleanupHorizon,

    /// Interval or idle triggering.
    pub trigger_mode: TriggerMode,

    /// Minutes between captures in interval mode (1-15).
    pub interval_minutes: u32,

    /// Seconds of inactivity before an idle capture (10-120).
    pub idle_seconds: u32,

    /// Hard cap on AUTO snapshots per document.
    pub max_auto_snapshots: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_horizon: CleanupHorizon::default(),
            trigger_mode: TriggerMode::default(),
            interval_minutes: 5,
            idle_seconds: 30,
            max_auto_snapshots: DEFAULT_MAX_AUTO_SNAPSHOTS,
        }
    }
}

impl RetentionPolicy {
    /// Check every field against its allowed set.
    pub fn validate(&self) -> SnapshotResult<()> {
        self.cleanup_horizon.validate()?;

        if !INTERVAL_MINUTES.contains(&self.interval_minutes) {
            return Err(SnapshotError::invalid_configuration(format!(
                "interval_minutes must be within {}-{}, got {}",
                INTERVAL_MINUTES.start(),
                INTERVAL_MINUTES.end(),
                self.interval_minutes
            )));
        }

        if !IDLE_SECONDS.contains(&self.idle_seconds) {
            return Err(SnapshotError::invalid_configuration(format!(
                "idle_seconds must be within {}-{}, got {}",
                IDLE_SECONDS.start(),
                IDLE_SECONDS.end(),
                self.idle_seconds
            )));
        }

        Ok(())
    }

    /// Validate and return self.
    pub fn validated(self) -> SnapshotResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Interval-mode capture period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    /// Idle-mode quiet period.
    pub fn idle(&self) -> Duration {
        Duration::from_secs(u64::from(self.idle_seconds))
    }

    /// Scheduler period for the active trigger mode.
    pub fn trigger_period(&self) -> Duration {
        match self.trigger_mode {
            TriggerMode::Interval => self.interval(),
            TriggerMode::Idle => self.idle(),
        }
    }
}
