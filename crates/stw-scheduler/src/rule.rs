//! Daily trigger rule.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::{SchedulerError, SchedulerResult};

/// A fixed time-of-day trigger, UTC.
///
/// The definition is deploy-time configuration; there is no runtime
/// mutation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRule {
    hour: u32,
    minute: u32,
    second: u32,
}

impl DailyRule {
    /// Shortly after the daily world reset at midnight UTC.
    pub const DEFAULT_RESET: DailyRule = DailyRule {
        hour: 0,
        minute: 0,
        second: 5,
    };

    pub fn new(hour: u32, minute: u32, second: u32) -> SchedulerResult<Self> {
        if hour >= 24 {
            return Err(SchedulerError::InvalidRule {
                field: "hour",
                value: hour,
            });
        }
        if minute >= 60 {
            return Err(SchedulerError::InvalidRule {
                field: "minute",
                value: minute,
            });
        }
        if second >= 60 {
            return Err(SchedulerError::InvalidRule {
                field: "second",
                value: second,
            });
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    fn offset_secs(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }

    /// The first instant strictly after `after` that matches the rule.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = after.date_naive().and_time(NaiveTime::MIN).and_utc();
        let candidate = midnight + Duration::seconds(self.offset_secs());
        if candidate > after {
            candidate
        } else {
            candidate + Duration::days(1)
        }
    }
}

impl Default for DailyRule {
    fn default() -> Self {
        Self::DEFAULT_RESET
    }
}

impl fmt::Display for DailyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02} UTC",
            self.hour, self.minute, self.second
        )
    }
}
