use crate::sources::ClinicalRecord;
use crate::CompanionResult;
use async_trait::async_trait;
use companion_types::{CareRequestId, PatientId};
use dashboard::{CareRequest, DashboardClient};

#[async_trait]
impl ClinicalRecord for DashboardClient {
    async fn care_request(&self, id: CareRequestId) -> CompanionResult<Option<CareRequest>> {
        Ok(DashboardClient::care_request(self, id).await?)
    }

    async fn apply_signed_consents(&self, care_request_id: CareRequestId) -> CompanionResult<()> {
        Ok(DashboardClient::apply_signed_consents(self, care_request_id).await?)
    }

    async fn medication_history_consent_status(
        &self,
        patient_id: PatientId,
    ) -> CompanionResult<Option<bool>> {
        Ok(DashboardClient::medication_history_consent_status(self, patient_id).await?)
    }
}
