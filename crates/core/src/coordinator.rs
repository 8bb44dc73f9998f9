//! Consents task lifecycle.
//!
//! The coordinator reacts to two events: a consent capture being recorded, and a task status
//! being changed by a caller. It never flips a status itself.

use crate::episode::load_episode;
use crate::link::LinkId;
use crate::resolver::{is_satisfied, RequirementResolver};
use crate::sources::{ClinicalRecord, LinkStore, TaskStore};
use crate::task::{CompanionConsentsTask, CompanionTask, TaskStatus, TaskType};
use crate::{CompanionError, CompanionResult};
use companion_types::{DefinitionId, LanguageId};
use std::sync::Arc;

#[derive(Clone)]
pub struct CompletionCoordinator {
    tasks: Arc<dyn TaskStore>,
    links: Arc<dyn LinkStore>,
    record: Arc<dyn ClinicalRecord>,
    resolver: RequirementResolver,
    language_id: LanguageId,
}

impl CompletionCoordinator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        links: Arc<dyn LinkStore>,
        record: Arc<dyn ClinicalRecord>,
        resolver: RequirementResolver,
        language_id: LanguageId,
    ) -> Self {
        Self {
            tasks,
            links,
            record,
            resolver,
            language_id,
        }
    }

    /// Record that `definition_id` was captured for the link's episode.
    ///
    /// Appends the id to the consents task's `completedDefinitionIds` if it is not already
    /// there. A link without a consents task is left alone.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::InvalidTask` if the stored metadata is malformed, or the task
    /// store's error if the read or write fails.
    pub async fn on_capture_recorded(
        &self,
        link_id: &LinkId,
        definition_id: DefinitionId,
    ) -> CompanionResult<()> {
        let Some(task) = self.tasks.find_task(link_id, TaskType::Consents).await? else {
            tracing::info!(
                link_id = %link_id,
                definition_id = %definition_id,
                "no consents task for link; capture not tracked"
            );
            return Ok(());
        };

        let consents = CompanionConsentsTask::try_from(task)?;
        let Some(metadata) = consents.metadata.with_completed(definition_id) else {
            tracing::debug!(
                task_id = %consents.task.id,
                definition_id = %definition_id,
                "definition already recorded on consents task"
            );
            return Ok(());
        };

        self.tasks
            .update_metadata(consents.task.id, metadata.to_value())
            .await?;
        tracing::info!(
            task_id = %consents.task.id,
            definition_id = %definition_id,
            completed = metadata.completed_definition_ids().len(),
            "recorded consent capture on consents task"
        );
        Ok(())
    }

    /// Persist `status` for `task`, then propagate a completed consents task upstream.
    ///
    /// Propagation happens only when the task is `CONSENTS`, the new status is `COMPLETED`, and
    /// every required definition is in the task's completed set. An unsatisfied check is logged
    /// and the status change still stands. Returns the stored task.
    ///
    /// # Errors
    ///
    /// - `CompanionLinkNotFound` / `CareRequestNotFound` if the episode cannot be loaded.
    /// - `MissingServiceLine` if the care request has no service line.
    /// - Upstream errors from the resolver or the clinical record, unchanged.
    pub async fn on_task_status_changed(
        &self,
        task: &CompanionTask,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask> {
        let updated = self.tasks.update_status(task, status).await?;
        tracing::info!(
            task_id = %updated.id,
            task_type = %updated.task_type,
            status = %status,
            "task status updated"
        );

        if updated.task_type != TaskType::Consents || status != TaskStatus::Completed {
            return Ok(updated);
        }

        self.apply_signed_consents(&updated).await?;
        Ok(updated)
    }

    async fn apply_signed_consents(&self, task: &CompanionTask) -> CompanionResult<()> {
        let link = self
            .links
            .find_link(&task.link_id)
            .await?
            .ok_or_else(|| CompanionError::CompanionLinkNotFound(task.link_id.to_string()))?;
        let episode = load_episode(self.record.as_ref(), link.care_request_id).await?;

        let required = self
            .resolver
            .required_definition_ids(episode.service_line_id, &episode.state, self.language_id)
            .await?;
        let completed = CompanionConsentsTask::try_from(task.clone())?
            .metadata
            .completed_set();

        if !is_satisfied(&required, &completed) {
            let missing: Vec<DefinitionId> = required.difference(&completed).copied().collect();
            tracing::warn!(
                task_id = %task.id,
                care_request_id = %episode.care_request_id,
                missing = ?missing,
                "consents task completed with required definitions outstanding; not propagating"
            );
            return Ok(());
        }

        self.record
            .apply_signed_consents(episode.care_request_id)
            .await?;
        tracing::info!(
            task_id = %task.id,
            care_request_id = %episode.care_request_id,
            "applied signed consents to care request"
        );
        Ok(())
    }
}
