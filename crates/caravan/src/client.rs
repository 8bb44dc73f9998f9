//! HTTP client for the Caravan consents API.

use crate::capture::{domain_to_create_wire, parse_capture, parse_captures};
use crate::definition::parse_definitions;
use crate::options::parse_options;
use crate::{
    CapturesQuery, CaravanError, CaravanResult, ConsentCapture, ConsentDefinition,
    ConsentOptions, DefinitionsQuery, Lookup, NewConsentCapture,
};
use reqwest::StatusCode;
use std::time::Duration;

const DEFINITIONS_PATH: &str = "/consents/api/definitions";
const CAPTURES_PATH: &str = "/consents/api/captures";
const OPTIONS_PATH: &str = "/consents/api/options";

/// Thin async client over Caravan's consent endpoints.
///
/// Retries and auth are the transport's concern; this client makes exactly one request per call.
#[derive(Clone, Debug)]
pub struct CaravanClient {
    http: reqwest::Client,
    base_url: String,
}

impl CaravanClient {
    /// Create a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::InvalidInput`] if the base URL is empty, or
    /// [`CaravanError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> CaravanResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(http, base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> CaravanResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(CaravanError::InvalidInput(
                "Caravan base URL cannot be empty".into(),
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

    /// List definitions matching `query`. A 404 means no catalog is configured for it.
    pub async fn definitions(
        &self,
        query: &DefinitionsQuery,
    ) -> CaravanResult<Lookup<Vec<ConsentDefinition>>> {
        let response = self
            .http
            .get(self.url(DEFINITIONS_PATH))
            .query(&query.query_pairs())
            .send()
            .await?;

        match read_body(response, DEFINITIONS_PATH).await? {
            Lookup::Found(bytes) => Ok(Lookup::Found(parse_definitions(&bytes)?)),
            Lookup::NotFound => {
                tracing::debug!(
                    state = %query.state,
                    service_line = %query.service_line,
                    "no consent definitions configured"
                );
                Ok(Lookup::NotFound)
            }
        }
    }

    /// List the captures recorded for one episode. A 404 means none were recorded.
    pub async fn captures(
        &self,
        query: &CapturesQuery,
    ) -> CaravanResult<Lookup<Vec<ConsentCapture>>> {
        let response = self
            .http
            .get(self.url(CAPTURES_PATH))
            .query(&query.query_pairs())
            .send()
            .await?;

        match read_body(response, CAPTURES_PATH).await? {
            Lookup::Found(bytes) => Ok(Lookup::Found(parse_captures(&bytes)?)),
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }

    /// Fetch consent options. Unlike the list calls, a 404 here is an error.
    pub async fn options(&self) -> CaravanResult<ConsentOptions> {
        let response = self.http.get(self.url(OPTIONS_PATH)).send().await?;
        let bytes = read_required_body(response, OPTIONS_PATH).await?;
        parse_options(&bytes)
    }

    /// Record a new capture and return it as Caravan stored it.
    pub async fn create_capture(
        &self,
        capture: &NewConsentCapture,
    ) -> CaravanResult<ConsentCapture> {
        let body = domain_to_create_wire(capture)?;
        let response = self
            .http
            .post(self.url(CAPTURES_PATH))
            .json(&body)
            .send()
            .await?;
        let bytes = read_required_body(response, CAPTURES_PATH).await?;
        parse_capture(&bytes)
    }
}

async fn read_body(response: reqwest::Response, path: &str) -> CaravanResult<Lookup<Vec<u8>>> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(Lookup::NotFound);
    }
    if !status.is_success() {
        return Err(CaravanError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }
    Ok(Lookup::Found(response.bytes().await?.to_vec()))
}

async fn read_required_body(response: reqwest::Response, path: &str) -> CaravanResult<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return Err(CaravanError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}
