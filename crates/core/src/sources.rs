//! Collaborator seams.
//!
//! Every upstream system and store the workflow talks to is reached through one of these traits.
//! Production wiring uses the adapters in [`crate::adapters`] and the stores in
//! [`crate::stores`]; tests substitute the fakes in `crate::testing`.

use crate::link::{CompanionLink, LinkId};
use crate::task::{CompanionTask, TaskStatus, TaskType};
use crate::CompanionResult;
use async_trait::async_trait;
use caravan::{
    CapturesQuery, ConsentCapture, ConsentDefinition, ConsentOptions, DefinitionsQuery, Lookup,
    NewConsentCapture,
};
use companion_types::{CareRequestId, PatientId, TaskId};
use dashboard::CareRequest;
use serde_json::Value;

/// Catalog of consent definitions.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn list(&self, query: &DefinitionsQuery)
        -> CompanionResult<Lookup<Vec<ConsentDefinition>>>;
}

/// Consent categories and the other option lists.
#[async_trait]
pub trait OptionSource: Send + Sync {
    async fn options(&self) -> CompanionResult<ConsentOptions>;
}

#[async_trait]
pub trait CaptureStore: Send + Sync {
    async fn list(&self, query: &CapturesQuery) -> CompanionResult<Lookup<Vec<ConsentCapture>>>;

    async fn create(&self, capture: &NewConsentCapture) -> CompanionResult<ConsentCapture>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The link's task of `task_type`, if it has one.
    async fn find_task(
        &self,
        link_id: &LinkId,
        task_type: TaskType,
    ) -> CompanionResult<Option<CompanionTask>>;

    /// A task by id, scoped to the link that owns it.
    async fn find_by_id(
        &self,
        link_id: &LinkId,
        task_id: TaskId,
    ) -> CompanionResult<Option<CompanionTask>>;

    async fn tasks_for_link(&self, link_id: &LinkId) -> CompanionResult<Vec<CompanionTask>>;

    /// Replace a task's metadata in one write.
    async fn update_metadata(&self, task_id: TaskId, metadata: Value) -> CompanionResult<()>;

    /// Persist a new status for `task` and return the stored task.
    async fn update_status(
        &self,
        task: &CompanionTask,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask>;
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn find_link(&self, link_id: &LinkId) -> CompanionResult<Option<CompanionLink>>;

    /// Create a link for `care_request_id` with one `NOT_STARTED` task of every type.
    async fn initialise_link(&self, care_request_id: CareRequestId)
        -> CompanionResult<CompanionLink>;
}

/// The upstream clinical record system.
#[async_trait]
pub trait ClinicalRecord: Send + Sync {
    async fn care_request(&self, id: CareRequestId) -> CompanionResult<Option<CareRequest>>;

    async fn apply_signed_consents(&self, care_request_id: CareRequestId) -> CompanionResult<()>;

    async fn medication_history_consent_status(
        &self,
        patient_id: PatientId,
    ) -> CompanionResult<Option<bool>>;
}
