//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// A consent definition the caller may sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDefinitionRes {
    pub id: u64,
    pub name: String,
    pub version: String,
    pub category_id: u64,
    pub language_id: u64,
    pub mandatory: bool,
    pub signer_ids: Vec<u64>,
    /// `null` when the definition applies to every service line.
    pub service_line_ids: Option<Vec<u64>>,
    /// `null` when the definition applies to every state.
    pub state_codes: Option<Vec<String>>,
    pub expires_after: Option<u32>,
    pub expiration_unit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentCategoryRes {
    pub id: u64,
    pub name: String,
    pub order: u32,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConsentOptionRes {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentOptionsRes {
    pub categories: Vec<ConsentCategoryRes>,
    pub signers: Vec<ConsentOptionRes>,
    pub languages: Vec<ConsentOptionRes>,
    pub frequencies: Vec<ConsentOptionRes>,
    pub capture_methods: Vec<ConsentOptionRes>,
}

/// Multipart form for recording a signed consent.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaptureForm {
    pub definition_id: u64,
    pub signer: u64,
    #[schema(value_type = String, format = Binary)]
    pub signature_image: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentCaptureRes {
    pub id: u64,
    pub definition_id: u64,
    pub episode_id: u64,
    pub patient_id: u64,
    pub visit_id: u64,
    pub service_line_id: u64,
    pub signer: u64,
    pub verbal: bool,
    /// RFC 3339 timestamp.
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatusRes {
    pub consent_type: String,
    /// `null` when nothing has been recorded upstream.
    pub status: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateTaskStatusReq {
    /// One of `NOT_STARTED`, `STARTED`, `COMPLETED`.
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskRes {
    pub id: u64,
    pub link_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: String,
    /// RFC 3339 timestamp.
    pub updated_at: String,
}
