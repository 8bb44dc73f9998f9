//! # Companion Core
//!
//! Consent-requirement resolution and completion tracking for companion links.
//!
//! This crate holds the workflow itself:
//! - which consent definitions apply to a care episode, and which are still outstanding
//! - tracking captured definitions on the link's consents task
//! - propagating a completed consents task to Dashboard once every required definition is in
//!
//! **No API concerns**: HTTP servers, request parsing and authentication belong in `api-rest`
//! and `api-shared`. Upstream systems are reached through the traits in [`sources`].

pub mod adapters;
pub mod config;
pub mod consents;
pub mod constants;
pub mod coordinator;
pub mod episode;
pub mod error;
pub mod link;
pub mod resolver;
pub mod sources;
pub mod stores;
pub mod task;
pub mod validation;
pub mod wiring;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::CoreConfig;
pub use consents::{Collaborators, ConsentType, ConsentsService};
pub use coordinator::CompletionCoordinator;
pub use episode::Episode;
pub use error::{CompanionError, CompanionResult};
pub use link::{CompanionLink, LinkId};
pub use resolver::{filter_incomplete, is_satisfied, RequirementResolver};
pub use task::{
    CompanionConsentsTask, CompanionTask, ConsentsTaskMetadata, TaskStatus, TaskType,
};
pub use wiring::collaborators_from_config;
