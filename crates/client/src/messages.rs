//! Fixed user-facing strings.

pub const LOGIN_TO_SAVE: &str = "Code generated. Log in to save it to your history.";
pub const HISTORY_REQUIRES_LOGIN: &str = "Log in with an email account to see your saved code history.";
pub const HISTORY_LOAD_FAILED: &str = "Failed to load your code history.";
pub const HISTORY_EMPTY: &str = "No saved code yet. Generate something!";
pub const EMPTY_GENERATION: &str = "The AI returned an empty response. Please try a different description.";
pub const SESSION_CHANGED_NOT_SAVED: &str =
    "Code generated, but you signed out before it finished, so it was not saved.";
pub const SAVE_FAILED_PREFIX: &str = "Code generated, but it could not be saved to your history";
pub const ANONYMOUS_SIGN_IN_FAILED: &str = "Could not start a guest session";
pub const DESCRIPTION_REQUIRED: &str = "Please describe what the component should do.";
