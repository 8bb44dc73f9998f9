//! HTTP client for the Dashboard API.

use crate::care_request::parse_care_request;
use crate::{CareRequest, DashboardError, DashboardResult};
use companion_types::{CareRequestId, PatientId};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// `Accept` value used when no versioned media type is configured.
pub const DEFAULT_DASHBOARD_ACCEPT: &str = "application/json";

#[derive(Clone, Debug)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MedicationHistoryConsentWire {
    #[serde(default)]
    medication_history_consent: Option<bool>,
}

impl DashboardClient {
    /// Create a client for `base_url`.
    ///
    /// `accept` is sent on every request, typically Dashboard's versioned media type.
    /// `authorization` is sent verbatim as the `Authorization` header when present.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::InvalidInput`] for an empty base URL or a header value that
    /// cannot be sent, and [`DashboardError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        accept: &str,
        authorization: Option<&str>,
        timeout: Duration,
    ) -> DashboardResult<Self> {
        let mut headers = HeaderMap::new();
        let accept = HeaderValue::from_str(accept).map_err(|_| {
            DashboardError::InvalidInput("accept is not a valid header value".into())
        })?;
        headers.insert(ACCEPT, accept);
        if let Some(token) = authorization {
            let mut value = HeaderValue::from_str(token).map_err(|_| {
                DashboardError::InvalidInput("authorization is not a valid header value".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(DashboardError::InvalidInput(
                "Dashboard base URL cannot be empty".into(),
            ));
        }

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a care request. Returns `Ok(None)` when Dashboard does not know it.
    pub async fn care_request(&self, id: CareRequestId) -> DashboardResult<Option<CareRequest>> {
        let path = format!("/api/care_requests/{id}");
        let response = self.http.get(self.url(&path)).send().await?;

        match read_optional_body(response, &path).await? {
            Some(bytes) => Ok(Some(parse_care_request(&bytes)?)),
            None => {
                tracing::debug!(care_request_id = %id, "care request not found in Dashboard");
                Ok(None)
            }
        }
    }

    /// Tell Dashboard that every required consent for the care request has been signed.
    pub async fn apply_signed_consents(&self, id: CareRequestId) -> DashboardResult<()> {
        let path = format!("/api/care_requests/{id}/apply_signed_consents");
        let response = self.http.post(self.url(&path)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                path,
            });
        }
        Ok(())
    }

    /// Read the patient's medication-history consent flag.
    ///
    /// `Ok(None)` means the patient is unknown or the flag was never recorded.
    pub async fn medication_history_consent_status(
        &self,
        patient_id: PatientId,
    ) -> DashboardResult<Option<bool>> {
        let path = format!("/api/patients/{patient_id}/consent_to_medication_history");
        let response = self.http.get(self.url(&path)).send().await?;

        let Some(bytes) = read_optional_body(response, &path).await? else {
            return Ok(None);
        };

        let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
        let wire: MedicationHistoryConsentWire =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
                DashboardError::Translation(format!(
                    "Medication history consent schema mismatch at {}: {}",
                    err.path(),
                    err.inner()
                ))
            })?;
        Ok(wire.medication_history_consent)
    }
}

async fn read_optional_body(
    response: reqwest::Response,
    path: &str,
) -> DashboardResult<Option<Vec<u8>>> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(DashboardError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }
    Ok(Some(response.bytes().await?.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VERSIONED_ACCEPT: &str = "application/vnd.dashboard+json; version=1";

    fn client(server: &MockServer) -> DashboardClient {
        DashboardClient::new(
            &server.uri(),
            VERSIONED_ACCEPT,
            Some("Bearer token"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_empty_base_url() {
        assert!(matches!(
            DashboardClient::new("", DEFAULT_DASHBOARD_ACCEPT, None, Duration::from_secs(1)),
            Err(DashboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn new_rejects_unsendable_accept() {
        assert!(matches!(
            DashboardClient::new(
                "http://dashboard.local",
                "application/json\n",
                None,
                Duration::from_secs(1)
            ),
            Err(DashboardError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn care_request_sends_versioned_accept_and_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/care_requests/700"))
            .and(header("accept", VERSIONED_ACCEPT))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id": 700, "patient_id": 42, "market": {"state": "CO"},
                    "service_line": {"id": 5, "name": "Acute Care"}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let care_request = client(&server)
            .care_request(CareRequestId(700))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(care_request.patient_id, PatientId(42));
    }

    #[tokio::test]
    async fn care_request_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/care_requests/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server).care_request(CareRequestId(1)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn apply_signed_consents_posts_and_surfaces_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/care_requests/700/apply_signed_consents"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/care_requests/701/apply_signed_consents"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .apply_signed_consents(CareRequestId(700))
            .await
            .unwrap();
        let err = client
            .apply_signed_consents(CareRequestId(701))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Status { status: 422, .. }));
    }

    #[tokio::test]
    async fn medication_history_consent_reads_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patients/42/consent_to_medication_history"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"medication_history_consent": true}"#),
            )
            .mount(&server)
            .await;

        let status = client(&server)
            .medication_history_consent_status(PatientId(42))
            .await
            .unwrap();
        assert_eq!(status, Some(true));
    }

    #[tokio::test]
    async fn medication_history_consent_unknown_patient_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patients/43/consent_to_medication_history"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let status = client(&server)
            .medication_history_consent_status(PatientId(43))
            .await
            .unwrap();
        assert_eq!(status, None);
    }
}
