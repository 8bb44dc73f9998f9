//! Caravan consents boundary.
//!
//! Caravan is the upstream service that owns the consent catalog (definitions and options) and
//! the record of signed consents (captures). This crate provides:
//! - domain-level types for definitions, captures and options
//! - strict wire models and translation helpers between the two
//! - an HTTP client that reports "nothing configured/captured yet" as [`Lookup::NotFound`]
//!   instead of an error
//!
//! Business rules about which consents are required live in `companion-core`, not here.

pub mod capture;
pub mod client;
pub mod definition;
pub mod options;

pub use capture::{CapturesQuery, ConsentCapture, NewConsentCapture};
pub use client::CaravanClient;
pub use definition::{Applicability, ConsentDefinition, DefinitionsQuery, ExpiryPolicy, ExpiryUnit};
pub use options::{ConsentCategory, ConsentOption, ConsentOptions};

/// Errors returned by the `caravan` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum CaravanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request to Caravan failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Caravan responded with status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`CaravanError`].
pub type CaravanResult<T> = Result<T, CaravanError>;

/// Outcome of a list-style lookup against an upstream service.
///
/// Upstream services answer 404 when a jurisdiction has no catalog configured or an episode has
/// no captures yet. Transport and auth failures are [`CaravanError`]s instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

impl<T: Default> Lookup<T> {
    /// Collapses a not-found outcome into the empty value.
    pub fn or_empty(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// Deserialise a JSON payload, naming the failing field path on schema mismatch.
pub(crate) fn decode_json<'de, T>(bytes: &'de [u8], what: &str) -> CaravanResult<T>
where
    T: serde::Deserialize<'de>,
{
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        CaravanError::Translation(format!("{what} schema mismatch at {path}: {}", err.inner()))
    })
}
