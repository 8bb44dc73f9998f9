//! Consent captures: evidence that a definition was signed for an episode.

use crate::{decode_json, CaravanError, CaravanResult};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use companion_types::{CaptureId, CareRequestId, DefinitionId, PatientId, ServiceLineId, SignerId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Public domain-level types
// ============================================================================

/// A recorded consent capture.
///
/// Episode and visit ids are both Dashboard care request ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentCapture {
    pub id: CaptureId,
    pub definition_id: DefinitionId,
    pub episode_id: CareRequestId,
    pub patient_id: PatientId,
    pub visit_id: CareRequestId,
    pub service_line_id: ServiceLineId,
    pub signer: SignerId,
    pub verbal: bool,
    pub witness: Option<String>,
    /// Set by an external moderation process; never written from here.
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for recording a new capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewConsentCapture {
    pub definition_id: DefinitionId,
    pub episode_id: CareRequestId,
    pub patient_id: PatientId,
    pub visit_id: CareRequestId,
    pub service_line_id: ServiceLineId,
    pub signer: SignerId,
    /// Raw image bytes; base64-encoded on the wire.
    pub signature_image: Vec<u8>,
    pub document_image: Option<Vec<u8>>,
    pub verbal: bool,
}

/// Filter for listing the captures of one episode. All four fields must describe the same episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturesQuery {
    pub patient_id: PatientId,
    pub visit_id: CareRequestId,
    pub episode_id: CareRequestId,
    pub service_line: ServiceLineId,
}

impl CapturesQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("patient_id", self.patient_id.to_string()),
            ("visit_id", self.visit_id.to_string()),
            ("episode_id", self.episode_id.to_string()),
            ("service_line", self.service_line.to_string()),
        ]
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Caravan sends the episode-scoped identifiers as strings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct CaptureWire {
    pub id: u64,
    pub definition_id: u64,
    pub episode_id: String,
    pub patient_id: String,
    pub visit_id: String,
    pub service_line: String,
    pub signer: String,
    #[serde(default)]
    pub verbal: bool,
    #[serde(default)]
    pub witness: Option<String>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub(crate) struct CreateCaptureWire {
    pub definition_id: u64,
    pub episode_id: String,
    pub patient_id: String,
    pub service_line: String,
    pub signer: String,
    pub visit_id: String,
    pub signature_image: String,
    pub document_image: Option<String>,
    pub verbal: bool,
}

pub(crate) fn parse_captures(bytes: &[u8]) -> CaravanResult<Vec<ConsentCapture>> {
    let wire: Vec<CaptureWire> = decode_json(bytes, "Consent captures")?;
    wire.into_iter().map(wire_to_domain).collect()
}

pub(crate) fn parse_capture(bytes: &[u8]) -> CaravanResult<ConsentCapture> {
    let wire: CaptureWire = decode_json(bytes, "Consent capture")?;
    wire_to_domain(wire)
}

pub(crate) fn domain_to_create_wire(capture: &NewConsentCapture) -> CaravanResult<CreateCaptureWire> {
    if capture.signature_image.is_empty() {
        return Err(CaravanError::InvalidInput(
            "signature image cannot be empty".into(),
        ));
    }

    Ok(CreateCaptureWire {
        definition_id: capture.definition_id.get(),
        episode_id: capture.episode_id.to_string(),
        patient_id: capture.patient_id.to_string(),
        service_line: capture.service_line_id.to_string(),
        signer: capture.signer.to_string(),
        visit_id: capture.visit_id.to_string(),
        signature_image: general_purpose::STANDARD.encode(&capture.signature_image),
        document_image: capture
            .document_image
            .as_ref()
            .map(|bytes| general_purpose::STANDARD.encode(bytes)),
        verbal: capture.verbal,
    })
}

fn parse_field<T: FromStr>(capture_id: u64, field: &str, value: &str) -> CaravanResult<T> {
    value.parse().map_err(|_| {
        CaravanError::Translation(format!(
            "capture {capture_id}: invalid {field} '{value}'"
        ))
    })
}

fn wire_to_domain(wire: CaptureWire) -> CaravanResult<ConsentCapture> {
    Ok(ConsentCapture {
        id: CaptureId(wire.id),
        definition_id: DefinitionId(wire.definition_id),
        episode_id: parse_field(wire.id, "episode_id", &wire.episode_id)?,
        patient_id: parse_field(wire.id, "patient_id", &wire.patient_id)?,
        visit_id: parse_field(wire.id, "visit_id", &wire.visit_id)?,
        service_line_id: parse_field(wire.id, "service_line", &wire.service_line)?,
        signer: parse_field(wire.id, "signer", &wire.signer)?,
        verbal: wire.verbal,
        witness: wire.witness,
        revoked_at: wire.revoked_at,
        created_at: wire.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_capture() -> NewConsentCapture {
        NewConsentCapture {
            definition_id: DefinitionId(10),
            episode_id: CareRequestId(700),
            patient_id: PatientId(42),
            visit_id: CareRequestId(700),
            service_line_id: ServiceLineId(5),
            signer: SignerId(1),
            signature_image: b"sig".to_vec(),
            document_image: None,
            verbal: false,
        }
    }

    #[test]
    fn create_wire_encodes_signature_and_stringifies_ids() {
        let wire = domain_to_create_wire(&new_capture()).unwrap();
        assert_eq!(wire.signature_image, "c2ln");
        assert_eq!(wire.episode_id, "700");
        assert_eq!(wire.signer, "1");
        assert_eq!(wire.document_image, None);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["document_image"], serde_json::Value::Null);
        assert_eq!(json["verbal"], serde_json::Value::Bool(false));
    }

    #[test]
    fn create_wire_requires_signature() {
        let mut capture = new_capture();
        capture.signature_image.clear();
        assert!(matches!(
            domain_to_create_wire(&capture),
            Err(CaravanError::InvalidInput(_))
        ));
    }

    #[test]
    fn parse_captures_keeps_revocation() {
        let body = br#"[{
            "id": 3,
            "definition_id": 10,
            "episode_id": "700",
            "patient_id": "42",
            "visit_id": "700",
            "service_line": "5",
            "signer": "1",
            "revoked_at": "2024-03-01T10:00:00Z"
        }]"#;

        let captures = parse_captures(body).unwrap();
        assert_eq!(captures[0].definition_id, DefinitionId(10));
        assert_eq!(captures[0].patient_id, PatientId(42));
        assert!(captures[0].revoked_at.is_some());
        assert!(!captures[0].verbal);
    }

    #[test]
    fn parse_capture_rejects_non_numeric_ids() {
        let body = br#"{"id": 3, "definition_id": 10, "episode_id": "abc", "patient_id": "42",
            "visit_id": "700", "service_line": "5", "signer": "1"}"#;
        let err = parse_capture(body).unwrap_err();
        assert!(err.to_string().contains("episode_id"));
    }
}
