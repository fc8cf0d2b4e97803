//! Environment lookups.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("environment variable {0} is not set")]
    Missing(String),
    #[error("environment variable {name} has an invalid value: {reason}")]
    Invalid { name: String, reason: String },
}

/// Read a secret from the process environment.
///
/// Looked up on every call and never cached, so rotating the value or
/// removing it takes effect on the next request. Blank values count as
/// missing.
pub fn read_secret(name: &str) -> Result<String, EnvError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EnvError::Missing(name.to_string())),
    }
}

/// Read an optional setting, falling back to `default` when unset or blank.
pub fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse an optional setting.
pub fn parse_or<T>(name: &str, default: T) -> Result<T, EnvError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| EnvError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = read_secret("UTILS_TEST_SECRET_THAT_DOES_NOT_EXIST").unwrap_err();
        assert_eq!(
            err,
            EnvError::Missing("UTILS_TEST_SECRET_THAT_DOES_NOT_EXIST".to_string())
        );
    }

    #[test]
    fn parse_or_uses_default_when_unset() {
        let port: u16 = parse_or("UTILS_TEST_PORT_THAT_DOES_NOT_EXIST", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn var_or_uses_default_when_unset() {
        assert_eq!(var_or("UTILS_TEST_HOST_THAT_DOES_NOT_EXIST", "0.0.0.0"), "0.0.0.0");
    }
}
