//! Auth provider surface consumed by the client, and the error-code mapping
//! used to show auth failures to users.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::subscription::{Callback, Subscription};

/// The signed-in identity reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub is_anonymous: bool,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn anonymous(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            is_anonymous: true,
            email: None,
        }
    }

    pub fn with_email(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            is_anonymous: false,
            email: Some(email.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum AuthErrorCode {
    #[strum(serialize = "auth/invalid-email")]
    InvalidEmail,
    #[strum(serialize = "auth/user-disabled")]
    UserDisabled,
    #[strum(serialize = "auth/user-not-found")]
    UserNotFound,
    #[strum(serialize = "auth/wrong-password")]
    WrongPassword,
    #[strum(serialize = "auth/invalid-credential")]
    InvalidCredential,
    #[strum(serialize = "auth/email-already-in-use")]
    EmailAlreadyInUse,
    #[strum(serialize = "auth/weak-password")]
    WeakPassword,
    #[strum(serialize = "auth/missing-credentials")]
    MissingCredentials,
    #[strum(serialize = "auth/operation-not-allowed")]
    OperationNotAllowed,
    #[strum(serialize = "auth/network-request-failed")]
    NetworkRequestFailed,
    #[strum(serialize = "auth/unknown")]
    Unknown,
}

impl AuthErrorCode {
    /// Fixed text shown to the user for this code.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidEmail => "Invalid email address format.",
            Self::UserDisabled => "This user account has been disabled.",
            Self::UserNotFound | Self::WrongPassword | Self::InvalidCredential => {
                "Invalid email or password."
            }
            Self::EmailAlreadyInUse => "This email is already in use. Try logging in instead.",
            Self::WeakPassword => "Password should be at least 6 characters.",
            Self::MissingCredentials => "Please enter both email and password.",
            Self::OperationNotAllowed
            | Self::NetworkRequestFailed
            | Self::Unknown => "Authentication failed. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub detail: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.code.user_message()
    }
}

/// Email/password and anonymous authentication with change notifications.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<AuthUser, AuthError>;

    async fn create_account_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError>;

    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Deliver the current user immediately, then every change, in order.
    fn on_auth_state_changed(&self, callback: Callback<Option<AuthUser>>) -> Subscription;
}

/// Fan-out of auth-state changes to any number of subscriptions.
///
/// Every published value reaches every open subscriber in publish order;
/// intermediate values are never coalesced.
#[derive(Clone, Default)]
pub struct AuthStateHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    current: Option<AuthUser>,
    subscribers: Vec<mpsc::UnboundedSender<Option<AuthUser>>>,
}

impl AuthStateHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }

    pub fn publish(&self, user: Option<AuthUser>) {
        let mut inner = self.lock();
        inner.current = user.clone();
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(user.clone()).is_ok());
        debug!(
            subscribers = inner.subscribers.len(),
            uid = user.as_ref().map(|u| u.uid.as_str()),
            "Published auth state"
        );
    }

    pub fn subscribe(&self, callback: Callback<Option<AuthUser>>) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.lock();
            let _ = tx.send(inner.current.clone());
            inner.subscribers.push(tx);
        }

        Subscription::spawn("auth-state", move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(user) => callback(user),
                        None => break,
                    },
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        // A poisoned hub still holds a consistent value; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
