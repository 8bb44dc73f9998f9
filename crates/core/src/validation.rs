//! Input validation utilities.
//!
//! Values checked here come from configuration or from callers and are validated once, before
//! they are used to build upstream requests.

use crate::{CompanionError, CompanionResult};

/// Validates an upstream base URL and returns it without a trailing slash.
///
/// Accepts absolute `http` or `https` URLs only:
/// - rejects empty or whitespace-only strings
/// - bounds the length to avoid pathological inputs
/// - rejects non-ASCII characters and embedded whitespace
///
/// # Errors
///
/// Returns `CompanionError::InvalidInput` naming `name` if the URL is invalid.
pub fn validate_base_url(name: &str, value: &str) -> CompanionResult<String> {
    const MAX_URL_LEN: usize = 2048;

    let value = value.trim();
    if value.is_empty() {
        return Err(CompanionError::InvalidInput(format!(
            "{name} cannot be empty"
        )));
    }

    if value.len() > MAX_URL_LEN {
        return Err(CompanionError::InvalidInput(format!(
            "{name} exceeds maximum length of {MAX_URL_LEN} characters"
        )));
    }

    if !value.is_ascii() || value.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(CompanionError::InvalidInput(format!(
            "{name} must be ASCII without whitespace"
        )));
    }

    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| {
            CompanionError::InvalidInput(format!("{name} must start with http:// or https://"))
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(CompanionError::InvalidInput(format!(
            "{name} must include a host"
        )));
    }

    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_and_trims_trailing_slash() {
        assert_eq!(
            validate_base_url("CARAVAN_URL", "https://caravan.example.com/").unwrap(),
            "https://caravan.example.com"
        );
        assert_eq!(
            validate_base_url("CARAVAN_URL", " http://localhost:8080 ").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn rejects_empty_relative_and_hostless_urls() {
        for bad in ["", "   ", "caravan.example.com", "ftp://caravan", "https://", "https:///x"] {
            let err = validate_base_url("CARAVAN_URL", bad).unwrap_err();
            assert!(
                matches!(err, CompanionError::InvalidInput(ref msg) if msg.contains("CARAVAN_URL")),
                "{bad:?} => {err}"
            );
        }
    }

    #[test]
    fn rejects_embedded_whitespace() {
        assert!(validate_base_url("DASHBOARD_URL", "https://dash board").is_err());
    }
}
