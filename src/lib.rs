pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::app_session::{AppSession, SessionSettings};
pub use application::auth_gate::{AuthGate, AuthStatus};
pub use application::bootstrap::{BootstrapResult, bootstrap_workspace};
pub use application::chat_session::{ChatError, ChatState};
pub use application::preferences_store::{PreferencesIntent, PreferencesPatch};
pub use application::task_store::{TaskIntent, TaskState};
pub use domain::calendar::{CalendarError, DayCell, DaySchedule, MonthGrid};
pub use domain::models::{
    AssistantResponse, ChatMessage, Session, SuggestedAction, SuggestionParameters, Task,
    TaskDraft, TimeRange, UserPreferences, ValidationError,
};
pub use domain::time_range::is_overnight_valid;
pub use infrastructure::error::InfraError;
pub use infrastructure::logging::init_tracing;

use infrastructure::auth_client::{AuthEndpoint, ReqwestAuthClient};
use infrastructure::auth_gateway::RemoteAuthGateway;
use infrastructure::chat_client::ReqwestChatClient;
use infrastructure::credential_store::KeyringSessionStore;
use infrastructure::kv_store::SqliteKeyValueStore;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

pub type DefaultAuthGateway = RemoteAuthGateway<KeyringSessionStore, ReqwestAuthClient>;
pub type DefaultAppSession = AppSession<SqliteKeyValueStore, DefaultAuthGateway, ReqwestChatClient>;

/// A ready session plus the log guard that must outlive it.
pub struct Launch {
    pub session: DefaultAppSession,
    pub auth: Arc<DefaultAuthGateway>,
    pub bootstrap: BootstrapResult,
    pub log_guard: WorkerGuard,
}

/// Bootstraps `workspace_root`, starts logging, wires the production
/// gateways, hydrates persisted state and runs the startup session check.
pub async fn launch(workspace_root: &Path) -> Result<Launch, InfraError> {
    let bootstrap = bootstrap_workspace(workspace_root)?;
    let log_guard = init_tracing(&bootstrap.logs_dir)?;
    let config = &bootstrap.config;

    let store = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
    let auth = Arc::new(RemoteAuthGateway::new(
        AuthEndpoint::new(config.auth_base_url.clone(), config.auth_api_key.clone()),
        Arc::new(KeyringSessionStore::default()),
        Arc::new(ReqwestAuthClient::new()),
    ));
    let chat = Arc::new(ReqwestChatClient::new(&config.chat_endpoint)?);

    let mut session = AppSession::new(
        store,
        Arc::clone(&auth),
        chat,
        SessionSettings::from_config(config)?,
    );
    session.hydrate().await;
    let authenticated = session.check_session().await;
    tracing::info!(authenticated, app = %config.app_name, "session launched");

    Ok(Launch {
        session,
        auth,
        bootstrap,
        log_guard,
    })
}
