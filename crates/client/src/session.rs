//! Session state as seen by the client.

use services::services::auth::AuthUser;
use uuid::Uuid;

/// Read-only copy of the provider's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub is_anonymous: bool,
    pub email: Option<String>,
}

impl From<&AuthUser> for Session {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.uid.clone(),
            is_anonymous: user.is_anonymous,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the provider to report a session.
    AuthLoading,
    /// Guest session backed by the provider.
    Anonymous(Session),
    /// Real account.
    Authenticated(Session),
    /// Guest sign-in failed; running on a local id with no provider session.
    Unauthenticated { local_id: String },
}

impl SessionState {
    /// State for a "user present" notification. Depends only on the user's
    /// anonymity flag.
    pub fn for_user(user: &AuthUser) -> Self {
        let session = Session::from(user);
        if session.is_anonymous {
            Self::Anonymous(session)
        } else {
            Self::Authenticated(session)
        }
    }

    pub fn degraded() -> Self {
        Self::Unauthenticated {
            local_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::AuthLoading => None,
            Self::Anonymous(s) | Self::Authenticated(s) => Some(&s.user_id),
            Self::Unauthenticated { local_id } => Some(local_id),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::AuthLoading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn authenticated_user(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id().map(str::to_string),
            authenticated: self.is_authenticated(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::AuthLoading => "connecting".to_string(),
            Self::Anonymous(s) => format!("guest ({})", s.user_id),
            Self::Authenticated(s) => s.email.clone().unwrap_or_else(|| s.user_id.clone()),
            Self::Unauthenticated { local_id } => format!("offline guest ({local_id})"),
        }
    }
}

/// Session facts captured when a generation is submitted. The history write
/// for that generation uses this, not whatever the session is when the
/// generation finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    pub authenticated: bool,
}

impl SessionSnapshot {
    pub fn writer(&self) -> Option<&str> {
        if self.authenticated {
            self.user_id.as_deref()
        } else {
            None
        }
    }
}
