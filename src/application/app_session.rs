use crate::application::auth_gate::AuthGate;
use crate::application::chat_session::{ChatError, ChatRequest, ChatState};
use crate::application::persistence;
use crate::application::preferences_store::{self, PreferencesIntent};
use crate::application::task_store::{self, ReduceContext, TaskIntent, TaskState};
use crate::domain::calendar::{self, CalendarError, DaySchedule, MonthGrid};
use crate::domain::models::{NowProvider, Session, UserPreferences, ValidationError};
use crate::infrastructure::auth_gateway::AuthGateway;
use crate::infrastructure::chat_client::ChatClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;

const DEFAULT_WINDOW_MONTHS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub time_zone: Tz,
    pub calendar_window_months: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            calendar_window_months: DEFAULT_WINDOW_MONTHS,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, InfraError> {
        Ok(Self {
            time_zone: config.time_zone()?,
            calendar_window_months: config.calendar_window_months.max(1),
        })
    }
}

/// Owns every slice of app state and the gateways behind them. Each mutation
/// is reduced first and then written through to the key-value store.
pub struct AppSession<K, A, C>
where
    K: KeyValueStore,
    A: AuthGateway,
    C: ChatClient,
{
    store: Arc<K>,
    auth: Arc<A>,
    chat_client: Arc<C>,
    settings: SessionSettings,
    tasks: TaskState,
    preferences: UserPreferences,
    chat: ChatState,
    auth_gate: AuthGate,
    now_provider: NowProvider,
}

impl<K, A, C> AppSession<K, A, C>
where
    K: KeyValueStore,
    A: AuthGateway,
    C: ChatClient,
{
    pub fn new(store: Arc<K>, auth: Arc<A>, chat_client: Arc<C>, settings: SessionSettings) -> Self {
        Self {
            store,
            auth,
            chat_client,
            settings,
            tasks: TaskState::default(),
            preferences: UserPreferences::default(),
            chat: ChatState::default(),
            auth_gate: AuthGate::default(),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn tasks(&self) -> &TaskState {
        &self.tasks
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn auth_gate(&self) -> &AuthGate {
        &self.auth_gate
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        (self.now_provider)()
            .with_timezone(&self.settings.time_zone)
            .date_naive()
    }

    /// Loads both persisted slices. Never fails: problems fall back to empty
    /// tasks (with `error` set) and default preferences.
    #[tracing::instrument(skip(self))]
    pub async fn hydrate(&mut self) {
        self.load_tasks().await;
        self.load_preferences().await;
    }

    pub async fn load_tasks(&mut self) {
        self.tasks.begin_loading();
        match persistence::load_tasks(self.store.as_ref()).await {
            Ok(Some(items)) => {
                tracing::info!(count = items.len(), "loaded tasks");
                self.tasks.finish_loading(items);
            }
            Ok(None) => {
                tracing::info!("no stored tasks");
                self.tasks.finish_loading(Vec::new());
            }
            Err(error) => {
                tracing::error!(%error, "failed to load tasks");
                self.tasks.fail_loading(error.to_string());
            }
        }
    }

    pub async fn load_preferences(&mut self) {
        self.preferences = persistence::load_preferences(self.store.as_ref())
            .await
            .unwrap_or_default();
        tracing::debug!(blocked = self.preferences.blocked_hours.len(), "loaded preferences");
    }

    /// Reduces the intent and persists the task list. A failed write is
    /// logged; the in-memory state keeps the change.
    pub async fn dispatch_task(&mut self, intent: TaskIntent) -> Result<(), ValidationError> {
        let context = ReduceContext::new(self.settings.time_zone, (self.now_provider)());
        let name = intent.name();
        self.tasks = task_store::reduce(self.tasks.clone(), intent, &context)
            .inspect_err(|error| tracing::warn!(intent = name, %error, "task intent rejected"))?;
        tracing::debug!(intent = name, count = self.tasks.items.len(), "task intent applied");

        if let Err(error) = persistence::save_tasks(self.store.as_ref(), &self.tasks.items).await {
            tracing::error!(intent = name, %error, "failed to persist tasks");
        }
        Ok(())
    }

    pub async fn dispatch_preferences(&mut self, intent: PreferencesIntent) {
        let name = intent.name();
        self.preferences = preferences_store::reduce(std::mem::take(&mut self.preferences), intent);
        tracing::debug!(intent = name, "preferences intent applied");

        if let Err(error) = persistence::save_preferences(self.store.as_ref(), &self.preferences).await {
            tracing::error!(intent = name, %error, "failed to persist preferences");
        }
    }

    /// Sends `text` with the current tasks as context. Transport and
    /// assistant failures end up in `chat().error`.
    pub async fn send_chat_message(&mut self, text: &str) -> Result<(), ChatError> {
        let request = ChatRequest::from_tasks(text, &self.tasks.items);
        let pending = self.chat.start_request(text)?;
        tracing::info!(tasks = request.context.current_tasks.len(), "sending chat message");

        match self.chat_client.send(&request).await {
            Ok(response) => {
                tracing::debug!(
                    suggestions = response.suggested_actions.len(),
                    "assistant responded"
                );
                pending.fulfill(text, response, (self.now_provider)());
            }
            Err(error) => {
                tracing::warn!(%error, "chat request failed");
                pending.fail(error.to_string());
            }
        }
        Ok(())
    }

    /// Creates a task from a visible suggestion. Returns the new task id, or
    /// `None` when the index does not name a visible suggestion.
    pub async fn accept_suggestion(&mut self, index: usize) -> Result<Option<String>, ValidationError> {
        let Some(draft) =
            self.chat
                .accept_suggestion(index, (self.now_provider)(), self.settings.time_zone)
        else {
            return Ok(None);
        };
        tracing::info!(index, title = %draft.title, "accepting suggestion");
        self.dispatch_task(TaskIntent::Add(draft)).await?;
        Ok(self.tasks.items.last().map(|task| task.id.clone()))
    }

    pub fn reject_suggestion(&mut self, index: usize) {
        tracing::debug!(index, "rejecting suggestion");
        self.chat.reject_suggestion(index);
    }

    pub fn month_grid(&self, year: i32, month: u32) -> Result<MonthGrid, CalendarError> {
        calendar::build_month(year, month, &self.tasks.items)
    }

    /// Months around today: half the window before the current month.
    pub fn calendar_window(&self) -> Result<Vec<MonthGrid>, CalendarError> {
        let today = self.today();
        let count = self.settings.calendar_window_months;
        calendar::build_window(
            today.year(),
            today.month(),
            count / 2,
            count as usize,
            &self.tasks.items,
        )
    }

    pub fn day_schedule(&self, date: NaiveDate) -> DaySchedule {
        calendar::day_schedule(date, &self.tasks.items)
    }

    /// Startup check. A provider error counts as signed out.
    pub async fn check_session(&mut self) -> bool {
        let session = match self.auth.get_session().await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%error, "session check failed");
                None
            }
        };
        self.apply_session_event(session);
        self.auth_gate.is_authenticated()
    }

    pub fn apply_session_event(&mut self, session: Option<Session>) {
        if self.auth_gate.apply(session.as_ref()) {
            tracing::info!(status = ?self.auth_gate.status, "auth status changed");
        }
    }

    pub fn watch_sessions(&self) -> watch::Receiver<Option<Session>> {
        self.auth.subscribe()
    }

    pub async fn sign_out(&mut self) -> Result<(), InfraError> {
        self.auth
            .sign_out()
            .await
            .inspect_err(|error| tracing::error!(%error, "sign-out failed"))?;
        self.apply_session_event(None);
        Ok(())
    }
}
