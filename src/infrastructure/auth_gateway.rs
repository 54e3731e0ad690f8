use crate::domain::models::{NowProvider, Session};
use crate::infrastructure::auth_client::{AuthEndpoint, AuthHttpClient, AuthTokenResponse};
use crate::infrastructure::credential_store::SessionStore;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

const SESSION_LEEWAY_SECONDS: i64 = 60;

/// Session provider as seen by the app: a startup check, a change stream and sign-out.
/// Dropping the receiver returned by `subscribe` unsubscribes.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, InfraError>;
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
    async fn sign_out(&self) -> Result<(), InfraError>;
}

pub struct RemoteAuthGateway<S, C>
where
    S: SessionStore,
    C: AuthHttpClient,
{
    endpoint: AuthEndpoint,
    session_store: Arc<S>,
    client: Arc<C>,
    sessions: watch::Sender<Option<Session>>,
    now_provider: NowProvider,
}

impl<S, C> RemoteAuthGateway<S, C>
where
    S: SessionStore,
    C: AuthHttpClient,
{
    pub fn new(endpoint: AuthEndpoint, session_store: Arc<S>, client: Arc<C>) -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            endpoint,
            session_store,
            client,
            sessions,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, InfraError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(InfraError::Auth("email and password are required".to_string()));
        }
        let response = self
            .client
            .sign_in_with_password(&self.endpoint, email.trim(), password)
            .await?;
        let session = self.session_from_response(response, None);
        self.session_store.save_session(&session)?;
        tracing::info!(user_id = %session.user_id, "signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    fn publish(&self, session: Option<Session>) {
        self.sessions.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            *current = session;
            true
        });
    }

    fn clear(&self) -> Result<(), InfraError> {
        self.session_store.delete_session()?;
        self.publish(None);
        Ok(())
    }

    fn session_from_response(
        &self,
        response: AuthTokenResponse,
        fallback_refresh_token: Option<String>,
    ) -> Session {
        Session {
            user_id: response.user_id,
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(fallback_refresh_token),
            expires_at: (self.now_provider)() + Duration::seconds(response.expires_in.max(0)),
        }
    }
}

#[async_trait]
impl<S, C> AuthGateway for RemoteAuthGateway<S, C>
where
    S: SessionStore,
    C: AuthHttpClient,
{
    async fn get_session(&self) -> Result<Option<Session>, InfraError> {
        let Some(stored) = self.session_store.load_session()? else {
            self.publish(None);
            return Ok(None);
        };

        if stored.is_valid_at((self.now_provider)(), SESSION_LEEWAY_SECONDS) {
            self.publish(Some(stored.clone()));
            return Ok(Some(stored));
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            tracing::info!(user_id = %stored.user_id, "stored session expired without refresh token");
            self.clear()?;
            return Ok(None);
        };

        match self.client.refresh_session(&self.endpoint, &refresh_token).await {
            Ok(response) => {
                let session = self.session_from_response(response, Some(refresh_token));
                self.session_store.save_session(&session)?;
                tracing::debug!(user_id = %session.user_id, "refreshed session");
                self.publish(Some(session.clone()));
                Ok(Some(session))
            }
            Err(InfraError::Auth(message)) => {
                tracing::warn!(%message, "session refresh rejected");
                self.clear()?;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_out(&self) -> Result<(), InfraError> {
        if let Some(session) = self.session_store.load_session()? {
            self.client
                .sign_out(&self.endpoint, &session.access_token)
                .await?;
            tracing::info!(user_id = %session.user_id, "signed out");
        }
        self.clear()
    }
}

/// Local provider for tests and offline builds; `set_session` simulates
/// provider-side changes.
#[derive(Debug)]
pub struct InMemoryAuthGateway {
    session: Mutex<Option<Session>>,
    sign_out_error: Mutex<Option<String>>,
    sessions: watch::Sender<Option<Session>>,
}

impl Default for InMemoryAuthGateway {
    fn default() -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            session: Mutex::new(None),
            sign_out_error: Mutex::new(None),
            sessions,
        }
    }
}

impl InMemoryAuthGateway {
    pub fn with_session(session: Session) -> Self {
        let gateway = Self::default();
        gateway.sessions.send_replace(Some(session.clone()));
        if let Ok(mut guard) = gateway.session.lock() {
            *guard = Some(session);
        }
        gateway
    }

    pub fn set_session(&self, session: Option<Session>) -> Result<(), InfraError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?;
        *guard = session.clone();
        self.sessions.send_replace(session);
        Ok(())
    }

    pub fn fail_sign_out_with(&self, message: impl Into<String>) -> Result<(), InfraError> {
        let mut guard = self
            .sign_out_error
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?;
        *guard = Some(message.into());
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn get_session(&self) -> Result<Option<Session>, InfraError> {
        let guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_out(&self) -> Result<(), InfraError> {
        let failure = self
            .sign_out_error
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?
            .clone();
        if let Some(message) = failure {
            return Err(InfraError::Auth(message));
        }
        self.set_session(None)
    }
}
