//! `HH:mm` ranges used by the preferences editor.
//!
//! A range whose end is numerically before its start wraps past midnight.
//! Validity is a caller-side gate; the preferences store accepts any range.

use crate::domain::models::{TimeRange, ValidationError};
use chrono::{NaiveTime, Timelike};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MIN_OVERNIGHT_MINUTES: u32 = 60;
/// Inclusive upper bound for a wrapping range.
pub const MAX_OVERNIGHT_MINUTES: u32 = 23 * 60;

/// Minutes since midnight for a 24-hour `HH:mm` string.
pub fn minutes_since_midnight(value: &str) -> Option<u32> {
    let (hour_str, minute_str) = value.trim().split_once(':')?;
    let hour = hour_str.parse::<u32>().ok()?;
    let minute = minute_str.parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Accepts a wrapping range lasting 1h..=23h, or a same-day range with end > start.
/// Malformed input is never valid.
pub fn is_overnight_valid(start: &str, end: &str) -> bool {
    let (Some(start), Some(end)) = (minutes_since_midnight(start), minutes_since_midnight(end))
    else {
        return false;
    };

    if end < start {
        let wrapped = MINUTES_PER_DAY - start + end;
        (MIN_OVERNIGHT_MINUTES..=MAX_OVERNIGHT_MINUTES).contains(&wrapped)
    } else {
        end > start
    }
}

impl TimeRange {
    pub fn is_overnight(&self) -> bool {
        match (
            minutes_since_midnight(&self.start),
            minutes_since_midnight(&self.end),
        ) {
            (Some(start), Some(end)) => end < start,
            _ => false,
        }
    }

    /// Length of the range in minutes, wrapping past midnight when needed.
    pub fn duration_minutes(&self) -> Option<u32> {
        let start = minutes_since_midnight(&self.start)?;
        let end = minutes_since_midnight(&self.end)?;
        if end < start {
            Some(MINUTES_PER_DAY - start + end)
        } else {
            Some(end - start)
        }
    }

    /// Whether `time` falls in `[start, end)`, honouring wrap-around.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (
            minutes_since_midnight(&self.start),
            minutes_since_midnight(&self.end),
        ) else {
            return false;
        };
        let current = time.hour() * 60 + time.minute();
        if start <= end {
            current >= start && current < end
        } else {
            current >= start || current < end
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start, "range.start")?;
        validate_hhmm(&self.end, "range.end")?;
        if !is_overnight_valid(&self.start, &self.end) {
            return Err(format!(
                "range {}-{} must last more than zero minutes, or 1 to 23 hours when it wraps midnight",
                self.start, self.end
            ));
        }
        Ok(())
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        self.validate().map_err(ValidationError::InvalidTimeRange)
    }
}

fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    minutes_since_midnight(value)
        .map(|_| ())
        .ok_or_else(|| format!("{field_name} must be HH:MM"))
}
