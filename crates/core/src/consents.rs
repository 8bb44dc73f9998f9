//! Episode-facing consent operations, addressed by companion link.

use crate::coordinator::CompletionCoordinator;
use crate::episode::{load_care_request, Episode};
use crate::link::{CompanionLink, LinkId};
use crate::resolver::{filter_incomplete, RequirementResolver};
use crate::sources::{
    CaptureStore, ClinicalRecord, DefinitionSource, LinkStore, OptionSource, TaskStore,
};
use crate::task::{CompanionTask, TaskStatus, TaskType};
use crate::{CompanionError, CompanionResult};
use caravan::{CapturesQuery, ConsentCapture, ConsentDefinition, ConsentOptions, NewConsentCapture};
use companion_types::{CareRequestId, DefinitionId, LanguageId, SignerId, TaskId};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Consent kinds whose status can be looked up directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentType {
    MedicationHistoryAuthority,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::MedicationHistoryAuthority => "MEDICATION_HISTORY_AUTHORITY",
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentType {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEDICATION_HISTORY_AUTHORITY" => Ok(ConsentType::MedicationHistoryAuthority),
            other => Err(CompanionError::UnknownConsentType(other.to_string())),
        }
    }
}

/// The collaborators the consent workflow is composed from.
#[derive(Clone)]
pub struct Collaborators {
    pub definitions: Arc<dyn DefinitionSource>,
    pub options: Arc<dyn OptionSource>,
    pub captures: Arc<dyn CaptureStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub links: Arc<dyn LinkStore>,
    pub record: Arc<dyn ClinicalRecord>,
}

#[derive(Clone)]
pub struct ConsentsService {
    links: Arc<dyn LinkStore>,
    tasks: Arc<dyn TaskStore>,
    captures: Arc<dyn CaptureStore>,
    options: Arc<dyn OptionSource>,
    record: Arc<dyn ClinicalRecord>,
    resolver: RequirementResolver,
    coordinator: CompletionCoordinator,
    language_id: LanguageId,
}

impl ConsentsService {
    pub fn new(collaborators: Collaborators, language_id: LanguageId) -> Self {
        let resolver = RequirementResolver::new(
            collaborators.definitions.clone(),
            collaborators.options.clone(),
        );
        let coordinator = CompletionCoordinator::new(
            collaborators.tasks.clone(),
            collaborators.links.clone(),
            collaborators.record.clone(),
            resolver.clone(),
            language_id,
        );

        Self {
            links: collaborators.links,
            tasks: collaborators.tasks,
            captures: collaborators.captures,
            options: collaborators.options,
            record: collaborators.record,
            resolver,
            coordinator,
            language_id,
        }
    }

    /// Create a companion link for a care request Dashboard knows about.
    pub async fn initialise_link(
        &self,
        care_request_id: CareRequestId,
    ) -> CompanionResult<CompanionLink> {
        load_care_request(self.record.as_ref(), care_request_id).await?;
        self.links.initialise_link(care_request_id).await
    }

    async fn find_link(&self, link_id: &LinkId) -> CompanionResult<CompanionLink> {
        self.links
            .find_link(link_id)
            .await?
            .ok_or_else(|| CompanionError::CompanionLinkNotFound(link_id.to_string()))
    }

    async fn episode_for_link(&self, link_id: &LinkId) -> CompanionResult<Episode> {
        let link = self.find_link(link_id).await?;
        let care_request = load_care_request(self.record.as_ref(), link.care_request_id).await?;
        Episode::try_from(&care_request)
    }

    /// Definitions `signer` may sign for the link's episode.
    ///
    /// With `incomplete`, definitions that already have a capture for the episode are dropped.
    ///
    /// # Errors
    ///
    /// - `CompanionLinkNotFound` / `CareRequestNotFound` if the episode cannot be loaded.
    /// - `MissingServiceLine` if the care request has no service line.
    /// - Upstream errors, unchanged.
    pub async fn definitions_for_link(
        &self,
        link_id: &LinkId,
        signer: SignerId,
        incomplete: bool,
    ) -> CompanionResult<Vec<ConsentDefinition>> {
        let episode = self.episode_for_link(link_id).await?;
        let definitions = self
            .resolver
            .applicable_definitions(
                episode.service_line_id,
                &episode.state,
                self.language_id,
                Some(signer),
            )
            .await?;

        if !incomplete {
            return Ok(definitions);
        }

        let captures = self
            .captures
            .list(&captures_query(&episode))
            .await?
            .or_empty();
        Ok(filter_incomplete(definitions, &captures))
    }

    /// Record a signed capture of `definition_id` for the link's episode and track it on the
    /// consents task.
    pub async fn create_capture_for_link(
        &self,
        link_id: &LinkId,
        definition_id: DefinitionId,
        signer: SignerId,
        signature_image: Vec<u8>,
    ) -> CompanionResult<ConsentCapture> {
        if signature_image.is_empty() {
            return Err(CompanionError::InvalidInput(
                "signature image is required".into(),
            ));
        }

        let episode = self.episode_for_link(link_id).await?;
        let capture = self
            .captures
            .create(&NewConsentCapture {
                definition_id,
                episode_id: episode.care_request_id,
                patient_id: episode.patient_id,
                visit_id: episode.care_request_id,
                service_line_id: episode.service_line_id,
                signer,
                signature_image,
                document_image: None,
                verbal: false,
            })
            .await?;
        tracing::info!(
            link_id = %link_id,
            capture_id = %capture.id,
            definition_id = %capture.definition_id,
            "consent capture created"
        );

        self.coordinator
            .on_capture_recorded(link_id, capture.definition_id)
            .await?;
        Ok(capture)
    }

    /// Consent categories, for a link that exists.
    pub async fn options_for_link(&self, link_id: &LinkId) -> CompanionResult<ConsentOptions> {
        self.find_link(link_id).await?;
        self.options.options().await
    }

    /// Ids of the definitions that must be captured before the link's consents task can be
    /// propagated.
    pub async fn required_definition_ids_for_link(
        &self,
        link_id: &LinkId,
    ) -> CompanionResult<BTreeSet<DefinitionId>> {
        let episode = self.episode_for_link(link_id).await?;
        self.resolver
            .required_definition_ids(episode.service_line_id, &episode.state, self.language_id)
            .await
    }

    /// Upstream status of a consent kind for the link's patient. `None` means nothing recorded.
    ///
    /// # Errors
    ///
    /// Returns `UnknownConsentType` for an unrecognised `consent_type`, before any lookup.
    pub async fn consent_status_by_type(
        &self,
        link_id: &LinkId,
        consent_type: &str,
    ) -> CompanionResult<Option<bool>> {
        let consent_type: ConsentType = consent_type.parse()?;
        let link = self.find_link(link_id).await?;
        let care_request = load_care_request(self.record.as_ref(), link.care_request_id).await?;

        match consent_type {
            ConsentType::MedicationHistoryAuthority => {
                self.record
                    .medication_history_consent_status(care_request.patient_id)
                    .await
            }
        }
    }

    /// Change the status of one of the link's tasks and run the completion reaction.
    pub async fn update_task_status(
        &self,
        link_id: &LinkId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask> {
        self.find_link(link_id).await?;
        let task = self
            .tasks
            .find_by_id(link_id, task_id)
            .await?
            .ok_or(CompanionError::TaskNotFound(task_id))?;
        self.coordinator.on_task_status_changed(&task, status).await
    }

    /// Mark the link's consents task `COMPLETED`.
    pub async fn complete_consents_task(&self, link_id: &LinkId) -> CompanionResult<CompanionTask> {
        self.find_link(link_id).await?;
        let task = self
            .tasks
            .find_task(link_id, TaskType::Consents)
            .await?
            .ok_or_else(|| {
                CompanionError::InvalidTask(format!("link {link_id} has no consents task"))
            })?;
        self.coordinator
            .on_task_status_changed(&task, TaskStatus::Completed)
            .await
    }
}

fn captures_query(episode: &Episode) -> CapturesQuery {
    CapturesQuery {
        patient_id: episode.patient_id,
        visit_id: episode.care_request_id,
        episode_id: episode.care_request_id,
        service_line: episode.service_line_id,
    }
}
