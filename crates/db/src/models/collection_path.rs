use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ROOT: &str = "artifacts";
const USERS: &str = "users";
const GENERATED_CODE: &str = "generatedCode";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionPathError {
    #[error("app id must not be empty")]
    EmptyAppId,
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("not a generated-code collection path: {0}")]
    Malformed(String),
}

/// Address of one user's generated-code collection:
/// `artifacts/{app_id}/users/{user_id}/generatedCode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionPath {
    app_id: String,
    user_id: String,
}

impl CollectionPath {
    pub fn generated_code(
        app_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, CollectionPathError> {
        let app_id = app_id.into();
        let user_id = user_id.into();
        if app_id.trim().is_empty() {
            return Err(CollectionPathError::EmptyAppId);
        }
        if user_id.trim().is_empty() {
            return Err(CollectionPathError::EmptyUserId);
        }
        Ok(Self { app_id, user_id })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ROOT}/{}/{USERS}/{}/{GENERATED_CODE}",
            self.app_id, self.user_id
        )
    }
}

impl FromStr for CollectionPath {
    type Err = CollectionPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [ROOT, app_id, USERS, user_id, GENERATED_CODE] => {
                Self::generated_code(*app_id, *user_id)
            }
            _ => Err(CollectionPathError::Malformed(s.to_string())),
        }
    }
}
