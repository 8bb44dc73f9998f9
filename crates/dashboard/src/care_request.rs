//! Care request wire model and translation.
//!
//! Dashboard returns a very wide care request document. Only the fields the consent workflow
//! reads are modelled; everything else is ignored on deserialisation.

use crate::{DashboardError, DashboardResult};
use companion_types::{CareRequestId, PatientId, ServiceLineId, StateCode};
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceLine {
    pub id: ServiceLineId,
    pub name: String,
}

/// The episode context the consent workflow needs from a care request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CareRequest {
    pub id: CareRequestId,
    pub patient_id: PatientId,
    /// State of the market serving the request.
    pub state: StateCode,
    /// Not every care request has been assigned a service line yet.
    pub service_line: Option<ServiceLine>,
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CareRequestWire {
    id: u64,
    patient_id: u64,
    market: MarketWire,
    #[serde(default)]
    service_line: Option<ServiceLineWire>,
}

#[derive(Debug, Deserialize)]
struct MarketWire {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ServiceLineWire {
    id: u64,
    #[serde(default)]
    name: String,
}

/// Parse a Dashboard care request JSON document.
///
/// Schema mismatches are reported with the failing field path (for example `market.state`).
pub(crate) fn parse_care_request(bytes: &[u8]) -> DashboardResult<CareRequest> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let wire: CareRequestWire =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            DashboardError::Translation(format!(
                "Care request schema mismatch at {path}: {}",
                err.inner()
            ))
        })?;

    let state = StateCode::parse(&wire.market.state).map_err(|e| {
        DashboardError::Translation(format!("care request {}: {e}", wire.id))
    })?;

    Ok(CareRequest {
        id: CareRequestId(wire.id),
        patient_id: PatientId(wire.patient_id),
        state,
        service_line: wire.service_line.map(|sl| ServiceLine {
            id: ServiceLineId(sl.id),
            name: sl.name,
        }),
    })
}
