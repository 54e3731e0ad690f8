use crate::domain::models::Session;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Where the auth session survives between launches.
pub trait SessionStore: Send + Sync {
    fn save_session(&self, session: &Session) -> Result<(), InfraError>;
    fn load_session(&self) -> Result<Option<Session>, InfraError>;
    fn delete_session(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service_name: String,
    account_name: String,
}

impl KeyringSessionStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new("velo.auth.session", "default")
    }
}

impl SessionStore for KeyringSessionStore {
    fn save_session(&self, session: &Session) -> Result<(), InfraError> {
        let payload = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_session(&self) -> Result<Option<Session>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        // A payload we cannot read is treated as signed out.
        match serde_json::from_str::<Session>(&payload) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable stored session");
                Ok(None)
            }
        }
    }

    fn delete_session(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>, InfraError> {
        self.session
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))
    }
}

impl SessionStore for InMemorySessionStore {
    fn save_session(&self, session: &Session) -> Result<(), InfraError> {
        *self.guard()? = Some(session.clone());
        Ok(())
    }

    fn load_session(&self) -> Result<Option<Session>, InfraError> {
        Ok(self.guard()?.clone())
    }

    fn delete_session(&self) -> Result<(), InfraError> {
        *self.guard()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn in_memory_store_save_load_delete() {
        let store = InMemorySessionStore::default();
        assert_eq!(store.load_session().expect("load"), None);

        let session = Session {
            user_id: "user-1".to_string(),
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.save_session(&session).expect("save");
        assert_eq!(store.load_session().expect("load"), Some(session));

        store.delete_session().expect("delete");
        assert_eq!(store.load_session().expect("load"), None);
        store.delete_session().expect("delete twice");
    }
}
