//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Nothing in
//! this crate reads environment variables while handling a request.

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, ENGLISH_LANGUAGE_ID};
use crate::validation::validate_base_url;
use crate::{CompanionError, CompanionResult};
use companion_types::LanguageId;
use dashboard::client::DEFAULT_DASHBOARD_ACCEPT;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    caravan_url: String,
    dashboard_url: String,
    dashboard_authorization: Option<String>,
    dashboard_accept: String,
    language_id: LanguageId,
    data_dir: Option<PathBuf>,
    api_key: Option<String>,
    http_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with defaults for every optional setting.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::InvalidInput` if either base URL is not an absolute
    /// `http`/`https` URL.
    pub fn new(caravan_url: &str, dashboard_url: &str) -> CompanionResult<Self> {
        Ok(Self {
            caravan_url: validate_base_url("CARAVAN_URL", caravan_url)?,
            dashboard_url: validate_base_url("DASHBOARD_URL", dashboard_url)?,
            dashboard_authorization: None,
            dashboard_accept: DEFAULT_DASHBOARD_ACCEPT.to_string(),
            language_id: ENGLISH_LANGUAGE_ID,
            data_dir: None,
            api_key: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    pub fn with_dashboard_authorization(mut self, value: Option<String>) -> Self {
        self.dashboard_authorization = value;
        self
    }

    /// Media type sent as `Accept` to Dashboard. `None` keeps the default.
    pub fn with_dashboard_accept(mut self, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.dashboard_accept = value;
        }
        self
    }

    pub fn with_language_id(mut self, language_id: LanguageId) -> Self {
        self.language_id = language_id;
        self
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn caravan_url(&self) -> &str {
        &self.caravan_url
    }

    pub fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }

    pub fn dashboard_authorization(&self) -> Option<&str> {
        self.dashboard_authorization.as_deref()
    }

    pub fn dashboard_accept(&self) -> &str {
        &self.dashboard_accept
    }

    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    /// Directory for the file-backed link store. `None` selects the in-memory store.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

impl CoreConfig {
    /// Resolve configuration from the process environment.
    ///
    /// Reads `CARAVAN_URL`, `DASHBOARD_URL`, `DASHBOARD_AUTHORIZATION`, `DASHBOARD_ACCEPT`,
    /// `CONSENT_LANGUAGE_ID`, `COMPANION_DATA_DIR`, `API_KEY` and `HTTP_TIMEOUT_SECS`. Only the
    /// two base URLs are checked here; the data directory is required when the store is wired.
    pub fn from_env() -> CompanionResult<Self> {
        let var = |name: &str| optional_env_value(std::env::var(name).ok());

        let caravan_url = var("CARAVAN_URL")
            .ok_or_else(|| CompanionError::InvalidInput("CARAVAN_URL is not set".into()))?;
        let dashboard_url = var("DASHBOARD_URL")
            .ok_or_else(|| CompanionError::InvalidInput("DASHBOARD_URL is not set".into()))?;

        Ok(Self::new(&caravan_url, &dashboard_url)?
            .with_dashboard_authorization(var("DASHBOARD_AUTHORIZATION"))
            .with_dashboard_accept(var("DASHBOARD_ACCEPT"))
            .with_language_id(language_id_from_env_value(var("CONSENT_LANGUAGE_ID"))?)
            .with_data_dir(var("COMPANION_DATA_DIR").map(PathBuf::from))
            .with_api_key(var("API_KEY"))
            .with_http_timeout(http_timeout_from_env_value(var("HTTP_TIMEOUT_SECS"))?))
    }
}

/// Normalise an optional environment value: trims it and treats empty as unset.
pub fn optional_env_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the consent language id from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns English.
pub fn language_id_from_env_value(value: Option<String>) -> CompanionResult<LanguageId> {
    optional_env_value(value)
        .map(|v| {
            v.parse::<LanguageId>().map_err(|_| {
                CompanionError::InvalidInput(format!(
                    "CONSENT_LANGUAGE_ID must be a positive integer, got '{v}'"
                ))
            })
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(ENGLISH_LANGUAGE_ID))
}

/// Parse the upstream HTTP timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default. Zero is rejected.
pub fn http_timeout_from_env_value(value: Option<String>) -> CompanionResult<Duration> {
    let Some(v) = optional_env_value(value) else {
        return Ok(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    };

    match v.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(CompanionError::InvalidInput(format!(
            "HTTP_TIMEOUT_SECS must be a positive integer, got '{v}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_both_urls() {
        assert!(CoreConfig::new("https://caravan", "https://dashboard").is_ok());
        assert!(CoreConfig::new("", "https://dashboard").is_err());
        assert!(CoreConfig::new("https://caravan", "dashboard").is_err());
    }

    #[test]
    fn defaults_are_english_and_thirty_seconds() {
        let cfg = CoreConfig::new("https://caravan/", "https://dashboard").unwrap();
        assert_eq!(cfg.caravan_url(), "https://caravan");
        assert_eq!(cfg.language_id(), ENGLISH_LANGUAGE_ID);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(30));
        assert!(cfg.data_dir().is_none());
        assert!(cfg.api_key().is_none());
        assert_eq!(cfg.dashboard_accept(), "application/json");
    }

    #[test]
    fn dashboard_accept_is_overridable() {
        let cfg = CoreConfig::new("https://caravan", "https://dashboard")
            .unwrap()
            .with_dashboard_accept(None);
        assert_eq!(cfg.dashboard_accept(), DEFAULT_DASHBOARD_ACCEPT);

        let cfg =
            cfg.with_dashboard_accept(Some("application/vnd.dashboard+json; version=1".into()));
        assert_eq!(
            cfg.dashboard_accept(),
            "application/vnd.dashboard+json; version=1"
        );
    }

    #[test]
    fn language_id_from_env_value_defaults_and_parses() {
        assert_eq!(language_id_from_env_value(None).unwrap(), ENGLISH_LANGUAGE_ID);
        assert_eq!(
            language_id_from_env_value(Some("  ".into())).unwrap(),
            ENGLISH_LANGUAGE_ID
        );
        assert_eq!(
            language_id_from_env_value(Some("2".into())).unwrap(),
            LanguageId(2)
        );
        assert!(language_id_from_env_value(Some("spanish".into())).is_err());
    }

    #[test]
    fn http_timeout_rejects_zero() {
        assert_eq!(
            http_timeout_from_env_value(Some("5".into())).unwrap(),
            Duration::from_secs(5)
        );
        assert!(http_timeout_from_env_value(Some("0".into())).is_err());
        assert!(http_timeout_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn optional_env_value_treats_blank_as_unset() {
        assert_eq!(optional_env_value(Some(" \t".into())), None);
        assert_eq!(optional_env_value(Some(" key ".into())), Some("key".into()));
    }
}
