//! Dashboard boundary.
//!
//! Dashboard is the upstream clinical record system. The consent workflow reads the care request
//! behind an episode from it and tells it when every signed consent is in. It also serves the
//! patient's medication-history consent flag.

pub mod care_request;
pub mod client;

pub use care_request::{CareRequest, ServiceLine};
pub use client::DashboardClient;

/// Errors returned by the `dashboard` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request to Dashboard failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Dashboard responded with status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`DashboardError`].
pub type DashboardResult<T> = Result<T, DashboardError>;
