/// Header carrying the API key on guarded endpoints.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing API key")]
    Missing,
    #[error("invalid API key")]
    Invalid,
}

/// Validates a provided API key against the key configured at startup.
///
/// With no key configured every request is allowed.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

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
    fn unconfigured_key_allows_everything() {
        assert_eq!(validate_api_key(None, None), Ok(()));
        assert_eq!(validate_api_key(None, Some("anything")), Ok(()));
    }

    #[test]
    fn configured_key_must_match() {
        assert_eq!(validate_api_key(Some("secret"), Some("secret")), Ok(()));
        assert_eq!(
            validate_api_key(Some("secret"), Some("guess")),
            Err(AuthError::Invalid)
        );
        assert_eq!(validate_api_key(Some("secret"), None), Err(AuthError::Missing));
    }
}
