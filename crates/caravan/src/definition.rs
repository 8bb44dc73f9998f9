//! Consent definitions: signable consent document versions and the query that lists them.

use crate::{decode_json, CaravanError, CaravanResult};
use companion_types::{CategoryId, DefinitionId, LanguageId, ServiceLineId, SignerId, StateCode};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Whether a definition applies to every value of a dimension or to an explicit set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applicability<T> {
    All,
    Only(Vec<T>),
}

impl<T: PartialEq> Applicability<T> {
    pub fn applies_to(&self, value: &T) -> bool {
        match self {
            Applicability::All => true,
            Applicability::Only(values) => values.contains(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryUnit {
    Day,
    Week,
    Month,
    Year,
}

impl ExpiryUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryUnit::Day => "day",
            ExpiryUnit::Week => "week",
            ExpiryUnit::Month => "month",
            ExpiryUnit::Year => "year",
        }
    }
}

/// How long a capture of this definition stays valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub count: u32,
    pub unit: ExpiryUnit,
}

/// One signable consent document version, as issued by Caravan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentDefinition {
    pub id: DefinitionId,
    pub active: bool,
    pub service_lines: Applicability<ServiceLineId>,
    pub states: Applicability<StateCode>,
    pub category_id: CategoryId,
    pub language_id: LanguageId,
    pub mandatory: bool,
    pub expiry: Option<ExpiryPolicy>,
    pub signer_ids: Vec<SignerId>,
    pub name: String,
    pub version: String,
}

/// Filter for listing consent definitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinitionsQuery {
    /// Defaults to `true` when unset.
    pub active: Option<bool>,
    pub state: StateCode,
    pub service_line: ServiceLineId,
    pub language_id: LanguageId,
    pub signer_ids: Option<Vec<SignerId>>,
}

impl DefinitionsQuery {
    /// Query-string pairs in the order Caravan documents them.
    ///
    /// `signer_ids` is comma-joined and left out entirely when no signer filter is set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("active", self.active.unwrap_or(true).to_string()),
            ("state", self.state.to_string()),
            ("service_line", self.service_line.to_string()),
            ("language_id", self.language_id.to_string()),
        ];

        if let Some(signer_ids) = &self.signer_ids {
            let joined = signer_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("signer_ids", joined));
        }

        pairs
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct DefinitionWire {
    pub id: u64,
    pub active: bool,
    #[serde(default)]
    pub all_service_lines: bool,
    #[serde(default)]
    pub service_lines: Vec<u64>,
    #[serde(default)]
    pub all_states: bool,
    #[serde(default)]
    pub states: Vec<String>,
    pub category_id: u64,
    pub language_id: u64,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub expires_after: Option<u32>,
    #[serde(default)]
    pub expiration_unit: Option<ExpiryUnit>,
    #[serde(default)]
    pub signer_ids: Vec<u64>,
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Decode a Caravan definitions list body into domain definitions.
pub(crate) fn parse_definitions(bytes: &[u8]) -> CaravanResult<Vec<ConsentDefinition>> {
    let wire: Vec<DefinitionWire> = decode_json(bytes, "Consent definitions")?;
    wire.into_iter().map(wire_to_domain).collect()
}

fn wire_to_domain(wire: DefinitionWire) -> CaravanResult<ConsentDefinition> {
    let service_lines = if wire.all_service_lines {
        Applicability::All
    } else {
        Applicability::Only(wire.service_lines.into_iter().map(ServiceLineId).collect())
    };

    let states = if wire.all_states {
        Applicability::All
    } else {
        let codes = wire
            .states
            .iter()
            .map(|code| StateCode::parse(code))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                CaravanError::Translation(format!("definition {}: {e}", wire.id))
            })?;
        Applicability::Only(codes)
    };

    let expiry = match (wire.expires_after, wire.expiration_unit) {
        (Some(count), Some(unit)) => Some(ExpiryPolicy { count, unit }),
        (None, None) => None,
        _ => {
            return Err(CaravanError::Translation(format!(
                "definition {}: expires_after and expiration_unit must be set together",
                wire.id
            )))
        }
    };

    Ok(ConsentDefinition {
        id: DefinitionId(wire.id),
        active: wire.active,
        service_lines,
        states,
        category_id: CategoryId(wire.category_id),
        language_id: LanguageId(wire.language_id),
        mandatory: wire.mandatory,
        expiry,
        signer_ids: wire.signer_ids.into_iter().map(SignerId).collect(),
        name: wire.name,
        version: wire.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> DefinitionsQuery {
        DefinitionsQuery {
            active: None,
            state: StateCode::parse("CO").unwrap(),
            service_line: ServiceLineId(5),
            language_id: LanguageId(1),
            signer_ids: Some(vec![SignerId(1), SignerId(2)]),
        }
    }

    #[test]
    fn query_pairs_default_active_and_join_signers() {
        let pairs = query().query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("active", "true".to_string()),
                ("state", "CO".to_string()),
                ("service_line", "5".to_string()),
                ("language_id", "1".to_string()),
                ("signer_ids", "1,2".to_string()),
            ]
        );
    }

    #[test]
    fn query_pairs_omit_signers_when_unset() {
        let mut q = query();
        q.signer_ids = None;
        q.active = Some(false);
        let pairs = q.query_pairs();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], ("active", "false".to_string()));
        assert!(pairs.iter().all(|(k, _)| *k != "signer_ids"));
    }

    #[test]
    fn parse_definitions_translates_applicability_and_expiry() {
        let body = br#"[
            {
                "id": 10,
                "active": true,
                "all_service_lines": false,
                "service_lines": [5],
                "all_states": true,
                "category_id": 1,
                "language_id": 1,
                "mandatory": true,
                "expires_after": 1,
                "expiration_unit": "year",
                "signer_ids": [1],
                "name": "Consent to Treat",
                "version": "v3"
            }
        ]"#;

        let definitions = parse_definitions(body).unwrap();
        assert_eq!(definitions.len(), 1);
        let def = &definitions[0];
        assert_eq!(def.id, DefinitionId(10));
        assert!(def.service_lines.applies_to(&ServiceLineId(5)));
        assert!(!def.service_lines.applies_to(&ServiceLineId(6)));
        assert!(def.states.applies_to(&StateCode::parse("TX").unwrap()));
        assert_eq!(
            def.expiry,
            Some(ExpiryPolicy {
                count: 1,
                unit: ExpiryUnit::Year
            })
        );
    }

    #[test]
    fn parse_definitions_rejects_half_expiry_policy() {
        let body = br#"[{"id": 1, "active": true, "category_id": 1, "language_id": 1,
            "expires_after": 3, "name": "x"}]"#;
        assert!(matches!(
            parse_definitions(body),
            Err(CaravanError::Translation(_))
        ));
    }

    #[test]
    fn parse_definitions_rejects_bad_state_code() {
        let body = br#"[{"id": 1, "active": true, "category_id": 1, "language_id": 1,
            "states": ["Colorado"], "name": "x"}]"#;
        assert!(parse_definitions(body).is_err());
    }
}
