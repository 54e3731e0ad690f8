use crate::domain::models::Session;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// Startup, before the first session check resolves.
    #[default]
    Unknown,
    SignedIn(String),
    SignedOut,
}

/// Which side of the login wall the app is on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthGate {
    pub status: AuthStatus,
}

impl AuthGate {
    /// Returns true when the status changed.
    pub fn apply(&mut self, session: Option<&Session>) -> bool {
        let next = match session {
            Some(session) => AuthStatus::SignedIn(session.user_id.clone()),
            None => AuthStatus::SignedOut,
        };
        if self.status == next {
            return false;
        }
        self.status = next;
        true
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::SignedIn(_))
    }

    pub fn is_resolved(&self) -> bool {
        self.status != AuthStatus::Unknown
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.status {
            AuthStatus::SignedIn(user_id) => Some(user_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn gate_tracks_session_changes() {
        let mut gate = AuthGate::default();
        assert!(!gate.is_resolved());
        assert!(!gate.is_authenticated());

        let session = Session {
            user_id: "user-1".to_string(),
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: Utc::now(),
        };
        assert!(gate.apply(Some(&session)));
        assert!(!gate.apply(Some(&session)));
        assert_eq!(gate.user_id(), Some("user-1"));

        assert!(gate.apply(None));
        assert_eq!(gate.status, AuthStatus::SignedOut);
        assert!(gate.is_resolved());
    }
}
