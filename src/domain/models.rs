use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Format used for `Task::start_time` / `Task::end_time`, e.g. `1:00PM`.
pub const TIME_OF_DAY_FORMAT: &str = "%-I:%M%p";

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task.title must not be empty")]
    EmptyTitle,
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
}

/// Input for creating or editing a task: two instants plus the text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Local calendar fields derived from a start/end instant pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSchedule {
    pub scheduled_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl TaskSchedule {
    /// Derives dates and times in `time_zone`. An end that is not strictly
    /// after the start is replaced by start + 1h.
    pub fn from_instants(start: DateTime<Utc>, end: DateTime<Utc>, time_zone: Tz) -> Self {
        let end = if end <= start {
            start + Duration::hours(1)
        } else {
            end
        };
        let local_start = start.with_timezone(&time_zone);
        let local_end = end.with_timezone(&time_zone);

        Self {
            scheduled_date: local_start.date_naive(),
            end_date: local_end.date_naive(),
            start_time: local_start.format(TIME_OF_DAY_FORMAT).to_string(),
            end_time: local_end.format(TIME_OF_DAY_FORMAT).to_string(),
        }
    }

    pub fn is_overnight(&self) -> bool {
        self.scheduled_date != self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl Task {
    pub fn from_draft(
        id: impl Into<String>,
        draft: &TaskDraft,
        created_at: DateTime<Utc>,
        time_zone: Tz,
    ) -> Result<Self, ValidationError> {
        draft.validate()?;
        let mut task = Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            completed: false,
            created_at,
            scheduled_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
        };
        task.apply_draft(draft, time_zone);
        Ok(task)
    }

    /// Replaces every mutable field; `id`, `created_at` and `completed` are kept.
    pub fn apply_draft(&mut self, draft: &TaskDraft, time_zone: Tz) {
        let schedule = TaskSchedule::from_instants(draft.start, draft.end, time_zone);
        self.title = draft.title.clone();
        self.description = draft.description.clone();
        self.scheduled_date = Some(schedule.scheduled_date);
        self.end_date = Some(schedule.end_date);
        self.start_time = Some(schedule.start_time);
        self.end_time = Some(schedule.end_time);
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if let Some(start_time) = &self.start_time {
            parse_time_of_day(start_time)
                .ok_or_else(|| "task.start_time must be h:mmAM/PM".to_string())?;
        }
        if let Some(end_time) = &self.end_time {
            parse_time_of_day(end_time)
                .ok_or_else(|| "task.end_time must be h:mmAM/PM".to_string())?;
        }
        Ok(())
    }

    pub fn is_overnight(&self) -> bool {
        match (self.scheduled_date, self.end_date) {
            (Some(start), Some(end)) => start != end,
            _ => false,
        }
    }

    /// True when the task starts or ends on `date`.
    pub fn touches_date(&self, date: NaiveDate) -> bool {
        self.scheduled_date == Some(date) || self.end_date == Some(date)
    }

    pub fn start_hour(&self) -> Option<u32> {
        self.start_time.as_deref().and_then(parse_hour_12h)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub productive_hours: TimeRange,
    pub sleep_hours: TimeRange,
    #[serde(default)]
    pub blocked_hours: Vec<TimeRange>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            productive_hours: TimeRange::new("09:00", "12:00"),
            sleep_hours: TimeRange::new("23:00", "07:00"),
            blocked_hours: Vec::new(),
        }
    }
}

impl UserPreferences {
    pub fn validate(&self) -> Result<(), String> {
        self.productive_hours
            .validate()
            .map_err(|error| format!("preferences.productive_hours: {error}"))?;
        self.sleep_hours
            .validate()
            .map_err(|error| format!("preferences.sleep_hours: {error}"))?;
        for (index, range) in self.blocked_hours.iter().enumerate() {
            range
                .validate()
                .map_err(|error| format!("preferences.blocked_hours[{index}]: {error}"))?;
        }
        Ok(())
    }
}

/// Parameters of an assistant suggestion. Known keys are typed; anything else
/// the assistant sends is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SuggestionParameters {
    /// Empty for actions that only reference an existing task.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedAction {
    pub action: String,
    pub parameters: SuggestionParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AssistantResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub response: Option<AssistantResponse>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

/// Parses a `h:mmAM` / `h:mm PM` time of day. Case-insensitive.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    if trimmed.len() < 3 || !trimmed.is_char_boundary(trimmed.len() - 2) {
        return None;
    }
    let (clock, period) = trimmed.split_at(trimmed.len() - 2);
    let is_pm = if period.eq_ignore_ascii_case("PM") {
        true
    } else if period.eq_ignore_ascii_case("AM") {
        false
    } else {
        return None;
    };

    let (hour_str, minute_str) = clock.trim_end().split_once(':')?;
    let hour = hour_str.parse::<u32>().ok()?;
    let minute = minute_str.parse::<u32>().ok()?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }

    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, true) => hour + 12,
        (hour, false) => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// 24-hour hour (0..=23) of a `h:mmAM/PM` string.
pub fn parse_hour_12h(value: &str) -> Option<u32> {
    use chrono::Timelike;
    parse_time_of_day(value).map(|time| time.hour())
}
