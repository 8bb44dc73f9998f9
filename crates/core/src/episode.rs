//! Episode context derived from a Dashboard care request.

use crate::sources::ClinicalRecord;
use crate::{CompanionError, CompanionResult};
use companion_types::{CareRequestId, PatientId, ServiceLineId, StateCode};
use dashboard::CareRequest;

/// Everything consent resolution needs to know about a care episode.
///
/// Only care requests with an assigned service line can be turned into an `Episode`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Episode {
    pub care_request_id: CareRequestId,
    pub patient_id: PatientId,
    pub state: StateCode,
    pub service_line_id: ServiceLineId,
}

impl TryFrom<&CareRequest> for Episode {
    type Error = CompanionError;

    fn try_from(care_request: &CareRequest) -> Result<Self, Self::Error> {
        let service_line = care_request
            .service_line
            .as_ref()
            .ok_or(CompanionError::MissingServiceLine(care_request.id))?;

        Ok(Self {
            care_request_id: care_request.id,
            patient_id: care_request.patient_id,
            state: care_request.state.clone(),
            service_line_id: service_line.id,
        })
    }
}

/// Fetch a care request, treating absence as a hard not-found.
pub async fn load_care_request(
    record: &dyn ClinicalRecord,
    id: CareRequestId,
) -> CompanionResult<CareRequest> {
    record
        .care_request(id)
        .await?
        .ok_or(CompanionError::CareRequestNotFound(id))
}

/// Fetch a care request and derive its [`Episode`].
pub async fn load_episode(record: &dyn ClinicalRecord, id: CareRequestId) -> CompanionResult<Episode> {
    let care_request = load_care_request(record, id).await?;
    Episode::try_from(&care_request)
}
