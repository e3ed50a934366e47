//! API key authentication.

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Environment variable holding the expected API key.
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API_KEY not set in environment")]
    NotConfigured,
    #[error("missing API key")]
    Missing,
    #[error("invalid API key")]
    Invalid,
}

/// Resolve the expected API key from an optional environment value.
///
/// # Errors
///
/// Returns [`AuthError::NotConfigured`] if the value is absent or blank.
pub fn api_key_from_env_value(value: Option<String>) -> Result<String, AuthError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::NotConfigured)
}

/// Validates the provided API key against the expected one.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(expected: &str, provided: Option<&str>) -> Result<(), AuthError> {
    match provided {
        None => Err(AuthError::Missing),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_is_accepted() {
        assert_eq!(validate_api_key("secret", Some("secret")), Ok(()));
    }

    #[test]
    fn missing_or_wrong_key_is_rejected() {
        assert_eq!(validate_api_key("secret", None), Err(AuthError::Missing));
        assert_eq!(
            validate_api_key("secret", Some("guess")),
            Err(AuthError::Invalid)
        );
    }

    #[test]
    fn blank_env_value_is_not_configured() {
        assert_eq!(api_key_from_env_value(None), Err(AuthError::NotConfigured));
        assert_eq!(
            api_key_from_env_value(Some("   ".into())),
            Err(AuthError::NotConfigured)
        );
        assert_eq!(api_key_from_env_value(Some(" k ".into())), Ok("k".into()));
    }
}
