use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tracing::warn;

use super::{ScheduleConfig, ScheduleMode, SchedulerError, MIN_INTERVAL};

/// When the next scheduled scan fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    Cron {
        expr: String,
        schedule: Box<Schedule>,
    },
    Interval(Duration),
}

impl Trigger {
    /// Build a trigger from configuration. `None` when scheduling is disabled.
    ///
    /// Intervals below [`MIN_INTERVAL`] are raised to it.
    pub fn from_config(config: &ScheduleConfig) -> Result<Option<Self>, SchedulerError> {
        match config.mode {
            ScheduleMode::Disabled => Ok(None),
            ScheduleMode::Cron => Self::cron(&config.cron).map(Some),
            ScheduleMode::Interval => {
                let mut interval = config.interval();
                if interval < MIN_INTERVAL {
                    warn!(
                        "Schedule interval {:?} is below the minimum, using {:?}",
                        interval, MIN_INTERVAL
                    );
                    interval = MIN_INTERVAL;
                }
                Ok(Some(Trigger::Interval(interval)))
            }
        }
    }

    /// Parse a crontab expression.
    ///
    /// The `cron` crate expects a leading seconds field, so five-field
    /// expressions are run at second 0.
    pub fn cron(expr: &str) -> Result<Self, SchedulerError> {
        let trimmed = expr.trim();
        let full = if trimmed.split_whitespace().count() == 5 {
            format!("0 {}", trimmed)
        } else {
            trimmed.to_string()
        };

        let schedule = Schedule::from_str(&full).map_err(|e| SchedulerError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Trigger::Cron {
            expr: trimmed.to_string(),
            schedule: Box::new(schedule),
        })
    }

    /// Delay from `now` until the next fire time.
    pub fn next_delay(&self, now: DateTime<Local>) -> Option<Duration> {
        match self {
            Trigger::Interval(interval) => Some(*interval),
            Trigger::Cron { schedule, .. } => schedule
                .after(&now)
                .next()
                .map(|next| (next - now).to_std().unwrap_or_default()),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Cron { expr, .. } => write!(f, "cron '{}'", expr),
            Trigger::Interval(interval) => write!(f, "every {}s", interval.as_secs()),
        }
    }
}
