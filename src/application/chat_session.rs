use crate::domain::models::{AssistantResponse, ChatMessage, SuggestedAction, TaskDraft};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Offset, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use thiserror::Error;

pub use crate::infrastructure::chat_client::{ChatContext, ChatRequest, ChatTaskContext};

const GAP_LOOKBACK_HOURS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("a chat request is already pending")]
    RequestPending,
    #[error("chat message must not be empty")]
    EmptyMessage,
}

/// Conversation with the assistant. `rejected` holds indexes into the
/// suggestions of `last_response` and is reset by every new send.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    pub is_loading: bool,
    pub last_response: Option<AssistantResponse>,
    pub error: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub rejected: BTreeSet<usize>,
}

impl ChatState {
    pub fn begin_send(&mut self, text: &str) -> Result<(), ChatError> {
        if self.is_loading {
            return Err(ChatError::RequestPending);
        }
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.is_loading = true;
        self.error = None;
        self.rejected.clear();
        Ok(())
    }

    pub fn fulfill(&mut self, text: impl Into<String>, response: AssistantResponse, now: DateTime<Utc>) {
        self.is_loading = false;
        self.last_response = Some(response.clone());
        self.messages.push(ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            message: text.into(),
            response: Some(response),
            timestamp: now,
        });
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.last_response = None;
        self.error = Some(message.into());
    }

    pub fn visible_suggestions(&self) -> Vec<(usize, &SuggestedAction)> {
        self.last_response
            .iter()
            .flat_map(|response| response.suggested_actions.iter().enumerate())
            .filter(|(index, _)| !self.rejected.contains(index))
            .collect()
    }

    pub fn reject_suggestion(&mut self, index: usize) {
        if self.suggestion(index).is_some() {
            self.rejected.insert(index);
        }
    }

    /// Turns a visible suggestion into a task draft and hides it.
    ///
    /// Start is `start_date`, then `due_date`, then `now`. End is `end_date`
    /// when it parses and falls after the start, otherwise start + 1h.
    /// Suggestions without a title yield `None` and stay visible.
    pub fn accept_suggestion(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
        time_zone: Tz,
    ) -> Option<TaskDraft> {
        let parameters = &self.suggestion(index)?.parameters;
        if parameters.title.trim().is_empty() {
            return None;
        }
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|raw| parse_due_date(raw, now, time_zone))
        };
        let start = parse(&parameters.start_date)
            .or_else(|| parse(&parameters.due_date))
            .unwrap_or(now);
        let end = parse(&parameters.end_date)
            .filter(|end| *end > start)
            .unwrap_or(start + Duration::hours(1));
        let draft = TaskDraft::new(
            parameters.title.clone(),
            parameters.description.clone().unwrap_or_default(),
            start,
            end,
        );
        self.rejected.insert(index);
        Some(draft)
    }

    /// Marks a request as in flight. Dropping the guard before `fulfill` or
    /// `fail` ran clears the pending flag, so a cancelled send does not block
    /// later ones.
    pub fn start_request(&mut self, text: &str) -> Result<InFlight<'_>, ChatError> {
        self.begin_send(text)?;
        Ok(InFlight { chat: self })
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn clear_last_response(&mut self) {
        self.last_response = None;
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    fn suggestion(&self, index: usize) -> Option<&SuggestedAction> {
        if self.rejected.contains(&index) {
            return None;
        }
        self.last_response.as_ref()?.suggested_actions.get(index)
    }
}

pub struct InFlight<'a> {
    chat: &'a mut ChatState,
}

impl InFlight<'_> {
    pub fn fulfill(self, text: impl Into<String>, response: AssistantResponse, now: DateTime<Utc>) {
        self.chat.fulfill(text, response, now);
    }

    pub fn fail(self, message: impl Into<String>) {
        self.chat.fail(message);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.chat.is_loading = false;
    }
}

/// RFC 3339 instants are taken as is. Zone-less values are read in
/// `time_zone`; a bare date keeps the local time of day of `now`.
fn parse_due_date(value: &str, now: DateTime<Utc>, time_zone: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }

    let local = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(now.with_timezone(&time_zone).time()))
        })?;

    resolve_local(local, time_zone)
}

/// Local wall-clock time to an instant. A time inside a DST gap is read with
/// the offset in force before the gap, which lands it just past the gap.
fn resolve_local(local: NaiveDateTime, time_zone: Tz) -> Option<DateTime<Utc>> {
    if let Some(instant) = local.and_local_timezone(time_zone).earliest() {
        return Some(instant.with_timezone(&Utc));
    }
    let before_gap = (local - Duration::hours(GAP_LOOKBACK_HOURS))
        .and_local_timezone(time_zone)
        .earliest()?;
    let offset_seconds = i64::from(before_gap.offset().fix().local_minus_utc());
    Some((local - Duration::seconds(offset_seconds)).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SuggestionParameters;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    fn suggestion(title: &str, due_date: Option<&str>) -> SuggestedAction {
        SuggestedAction {
            action: "create_task".to_string(),
            parameters: SuggestionParameters {
                title: title.to_string(),
                description: None,
                due_date: due_date.map(ToOwned::to_owned),
                ..SuggestionParameters::default()
            },
        }
    }

    fn answered(actions: Vec<SuggestedAction>) -> ChatState {
        let mut state = ChatState::default();
        state.begin_send("help me plan").expect("send");
        state.fulfill(
            "help me plan",
            AssistantResponse {
                response: "Here you go".to_string(),
                suggested_actions: actions,
                error: None,
            },
            utc(2024, 3, 21, 8, 0),
        );
        state
    }

    #[test]
    fn begin_send_guards_pending_and_blank() {
        let mut state = ChatState::default();
        assert_eq!(state.begin_send("   "), Err(ChatError::EmptyMessage));
        state.begin_send("hello").expect("first send");
        assert_eq!(state.begin_send("again"), Err(ChatError::RequestPending));
    }

    #[test]
    fn fulfill_appends_message_and_sets_last_response() {
        let state = answered(vec![suggestion("Call dentist", None)]);
        assert!(!state.is_loading);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].message, "help me plan");
        assert_eq!(
            state.last_response.as_ref().map(|r| r.response.as_str()),
            Some("Here you go")
        );
    }

    #[test]
    fn fail_clears_last_response_and_keeps_log() {
        let mut state = answered(Vec::new());
        state.begin_send("second").expect("send");
        state.fail("Failed to get response from assistant");
        assert!(!state.is_loading);
        assert_eq!(state.last_response, None);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.error.as_deref(), Some("Failed to get response from assistant"));

        state.clear_error();
        assert_eq!(state.error, None);
    }

    #[test]
    fn rejected_suggestions_are_hidden_until_next_send() {
        let mut state = answered(vec![suggestion("A", None), suggestion("B", None)]);
        state.reject_suggestion(0);
        state.reject_suggestion(9);
        let visible: Vec<usize> = state.visible_suggestions().iter().map(|(i, _)| *i).collect();
        assert_eq!(visible, vec![1]);
        assert_eq!(state.messages.len(), 1);

        state.begin_send("more").expect("send");
        assert!(state.rejected.is_empty());
    }

    #[test]
    fn accept_without_due_date_starts_now() {
        let now = utc(2024, 3, 21, 15, 12);
        let mut state = answered(vec![suggestion("Call dentist", None)]);
        let draft = state.accept_suggestion(0, now, Tz::UTC).expect("draft");
        assert_eq!(draft.title, "Call dentist");
        assert_eq!(draft.description, "");
        assert_eq!(draft.start, now);
        assert_eq!(draft.end, now + Duration::hours(1));

        assert!(state.visible_suggestions().is_empty());
        assert_eq!(state.accept_suggestion(0, now, Tz::UTC), None);
    }

    #[test]
    fn accept_reads_due_date_formats() {
        let now = utc(2024, 3, 20, 10, 30);
        let mut state = answered(vec![
            suggestion("Meeting", Some("2024-03-21T14:00:00")),
            suggestion("Dated", Some("2024-03-25")),
            suggestion("Zoned", Some("2024-03-21T14:00:00+02:00")),
            suggestion("Garbage", Some("next week")),
        ]);
        let tz: Tz = chrono_tz::America::New_York;

        let meeting = state.accept_suggestion(0, now, tz).expect("meeting");
        assert_eq!(meeting.start, utc(2024, 3, 21, 18, 0));

        let dated = state.accept_suggestion(1, now, tz).expect("dated");
        assert_eq!(dated.start, utc(2024, 3, 25, 10, 30));

        let zoned = state.accept_suggestion(2, now, tz).expect("zoned");
        assert_eq!(zoned.start, utc(2024, 3, 21, 12, 0));

        let garbage = state.accept_suggestion(3, now, tz).expect("garbage");
        assert_eq!(garbage.start, now);
    }

    #[test]
    fn accept_reads_start_and_end_dates() {
        let now = utc(2024, 3, 20, 9, 0);
        let mut state = answered(vec![SuggestedAction {
            action: "create_task".to_string(),
            parameters: SuggestionParameters {
                title: "Study".to_string(),
                start_date: Some("2024-03-25T14:00:00".to_string()),
                end_date: Some("2024-03-25T17:00:00".to_string()),
                ..SuggestionParameters::default()
            },
        }]);

        let draft = state.accept_suggestion(0, now, Tz::UTC).expect("draft");
        assert_eq!(draft.start, utc(2024, 3, 25, 14, 0));
        assert_eq!(draft.end, utc(2024, 3, 25, 17, 0));
    }

    #[test]
    fn start_date_wins_over_due_date_and_bad_end_falls_back() {
        let now = utc(2024, 3, 20, 9, 0);
        let mut state = answered(vec![SuggestedAction {
            action: "create_task".to_string(),
            parameters: SuggestionParameters {
                title: "Review".to_string(),
                start_date: Some("2024-03-22T10:00:00".to_string()),
                due_date: Some("2024-03-23T10:00:00".to_string()),
                end_date: Some("2024-03-22T09:00:00".to_string()),
                ..SuggestionParameters::default()
            },
        }]);

        let draft = state.accept_suggestion(0, now, Tz::UTC).expect("draft");
        assert_eq!(draft.start, utc(2024, 3, 22, 10, 0));
        assert_eq!(draft.end, utc(2024, 3, 22, 11, 0));
    }

    #[test]
    fn untitled_suggestion_is_not_accepted() {
        let now = utc(2024, 3, 20, 9, 0);
        let mut state = answered(vec![suggestion("  ", None), suggestion("Gym", None)]);

        assert_eq!(state.accept_suggestion(0, now, Tz::UTC), None);
        let visible: Vec<usize> = state.visible_suggestions().iter().map(|(i, _)| *i).collect();
        assert_eq!(visible, vec![0, 1]);
    }

    #[test]
    fn local_time_in_dst_gap_moves_past_the_gap() {
        let now = utc(2024, 3, 1, 12, 0);
        let mut state = answered(vec![suggestion("Early run", Some("2024-03-10T02:30:00"))]);
        let tz: Tz = chrono_tz::America::New_York;

        let draft = state.accept_suggestion(0, now, tz).expect("draft");
        // 02:30 does not exist that night; 03:30 EDT is 07:30Z.
        assert_eq!(draft.start, utc(2024, 3, 10, 7, 30));
        assert_eq!(draft.end, utc(2024, 3, 10, 8, 30));
    }

    #[test]
    fn dropped_request_clears_loading() {
        let mut state = ChatState::default();
        {
            let _pending = state.start_request("hello").expect("start");
        }
        assert!(!state.is_loading);
        assert_eq!(state.messages.len(), 0);

        let pending = state.start_request("again").expect("restart");
        pending.fail("offline");
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("offline"));
    }

    #[test]
    fn clear_helpers_reset_fields() {
        let mut state = answered(vec![suggestion("A", None)]);
        state.clear_last_response();
        assert!(state.visible_suggestions().is_empty());
        state.clear_messages();
        assert!(state.messages.is_empty());
    }
}
