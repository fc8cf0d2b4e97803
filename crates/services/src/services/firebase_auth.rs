//! Firebase Identity Toolkit REST client implementing [`AuthProvider`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    auth::{AuthError, AuthErrorCode, AuthProvider, AuthStateHub, AuthUser},
    subscription::{Callback, Subscription},
};

pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const EMULATOR_HOST_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnonymousRequest {
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Password, sign-up and anonymous sign-in against Identity Toolkit.
///
/// The REST API has no push channel, so state changes are published locally
/// after each successful call.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: Client,
    api_key: String,
    endpoint: String,
    state: AuthStateHub,
}

impl FirebaseAuthClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::new(AuthErrorCode::NetworkRequestFailed, e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            state: AuthStateHub::new(),
        })
    }

    /// Use the auth emulator when `FIREBASE_AUTH_EMULATOR_HOST` is set.
    pub fn from_env(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let endpoint = match std::env::var(EMULATOR_HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => {
                info!(emulator = %host, "Using Firebase auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host.trim())
            }
            _ => DEFAULT_ENDPOINT.to_string(),
        };
        Self::new(api_key, endpoint)
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/accounts:{}?key={}", self.endpoint, method, self.api_key);
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AuthError::new(AuthErrorCode::NetworkRequestFailed, e.without_url().to_string())
            })?;

        if res.status().is_success() {
            return res
                .json::<TokenResponse>()
                .await
                .map_err(|e| AuthError::new(AuthErrorCode::Unknown, e.to_string()));
        }

        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!(method, status, error = %message, "Identity Toolkit call failed");
        Err(AuthError::new(code_for_rest_message(&message), message))
    }

    fn signed_in(&self, response: TokenResponse, is_anonymous: bool) -> AuthUser {
        let user = AuthUser {
            uid: response.local_id,
            is_anonymous,
            email: response.email.filter(|e| !e.is_empty()),
        };
        self.state.publish(Some(user.clone()));
        user
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.call("signInWithPassword", &body).await?;
        Ok(self.signed_in(response, false))
    }

    async fn create_account_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.call("signUp", &body).await?;
        Ok(self.signed_in(response, false))
    }

    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError> {
        let body = AnonymousRequest {
            return_secure_token: true,
        };
        let response = self.call("signUp", &body).await?;
        Ok(self.signed_in(response, true))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.publish(None);
        Ok(())
    }

    fn on_auth_state_changed(&self, callback: Callback<Option<AuthUser>>) -> Subscription {
        self.state.subscribe(callback)
    }
}

/// Identity Toolkit reports errors as `CODE` or `CODE : detail`.
fn code_for_rest_message(message: &str) -> AuthErrorCode {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorCode::InvalidEmail,
        "USER_DISABLED" => AuthErrorCode::UserDisabled,
        "EMAIL_NOT_FOUND" => AuthErrorCode::UserNotFound,
        "INVALID_PASSWORD" | "MISSING_PASSWORD" => AuthErrorCode::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" => AuthErrorCode::InvalidCredential,
        "EMAIL_EXISTS" => AuthErrorCode::EmailAlreadyInUse,
        "WEAK_PASSWORD" => AuthErrorCode::WeakPassword,
        "OPERATION_NOT_ALLOWED" | "ADMIN_ONLY_OPERATION" => AuthErrorCode::OperationNotAllowed,
        _ => AuthErrorCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn maps_rest_codes() {
        assert_eq!(code_for_rest_message("EMAIL_EXISTS"), AuthErrorCode::EmailAlreadyInUse);
        assert_eq!(
            code_for_rest_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthErrorCode::WeakPassword
        );
        assert_eq!(
            code_for_rest_message("INVALID_LOGIN_CREDENTIALS"),
            AuthErrorCode::InvalidCredential
        );
        assert_eq!(code_for_rest_message("USER_DISABLED"), AuthErrorCode::UserDisabled);
        assert_eq!(code_for_rest_message("INVALID_EMAIL"), AuthErrorCode::InvalidEmail);
        assert_eq!(code_for_rest_message("TOO_MANY_ATTEMPTS_TRY_LATER"), AuthErrorCode::Unknown);
    }

    #[tokio::test]
    async fn sign_out_publishes_no_user() {
        let client = FirebaseAuthClient::new("key", DEFAULT_ENDPOINT).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = client.on_auth_state_changed(Arc::new(move |user| {
            let _ = tx.send(user);
        }));

        assert_eq!(rx.recv().await.unwrap(), None);
        client.sign_out().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[test]
    fn token_response_keeps_only_identity_fields() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#SignupNewUserResponse","idToken":"eyJ...","refreshToken":"r","expiresIn":"3600","localId":"uid-7"}"#,
        )
        .unwrap();
        assert_eq!(response.local_id, "uid-7");
        assert_eq!(response.email, None);
    }
}
