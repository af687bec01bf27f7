//! Scan scheduling.
//!
//! Periodic scans run either on a cron expression or on a fixed interval
//! (never shorter than [`MIN_INTERVAL`]).

mod runner;
mod trigger;

pub use runner::{ScanJob, Scheduler};
pub use trigger::Trigger;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest allowed interval between scheduled scans.
pub const MIN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors from schedule parsing.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}

/// How scans are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Disabled,
    #[default]
    Cron,
    Interval,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[default]
    Hours,
    Minutes,
}

/// Schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub mode: ScheduleMode,
    /// Five-field crontab expression, local time.
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
}

fn default_cron() -> String {
    "5 4 * * *".to_string()
}

fn default_interval_value() -> u32 {
    6
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            cron: default_cron(),
            interval_value: default_interval_value(),
            interval_unit: IntervalUnit::default(),
        }
    }
}

impl ScheduleConfig {
    /// Configured interval, before clamping.
    pub fn interval(&self) -> Duration {
        let unit_secs = match self.interval_unit {
            IntervalUnit::Hours => 3600,
            IntervalUnit::Minutes => 60,
        };
        Duration::from_secs(self.interval_value as u64 * unit_secs)
    }
}
