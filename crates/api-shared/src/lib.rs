//! # API Shared
//!
//! Shared definitions for the companion APIs.
//!
//! Contains:
//! - Request and response DTOs (`dto` module), documented for OpenAPI
//! - Shared services like `HealthService`
//! - API key checking
//!
//! Used by `api-rest`. The `companion` CLI talks to `companion-core` directly.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
