//! Consent options: categories and the other enumerations a definition refers to.

use crate::{decode_json, CaravanResult};
use companion_types::CategoryId;
use serde::Deserialize;
use std::collections::BTreeSet;

/// A named, ordered classification of definitions, such as "Consent to Treat".
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ConsentCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub required: bool,
}

/// A plain `{id, name}` option (signers, languages, frequencies, capture methods).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ConsentOption {
    pub id: u64,
    pub name: String,
}

/// Everything Caravan reports under `/consents/api/options`.
///
/// The wire shape matches the domain shape, so this deserialises directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConsentOptions {
    #[serde(default)]
    pub categories: Vec<ConsentCategory>,
    #[serde(default)]
    pub signers: Vec<ConsentOption>,
    #[serde(default)]
    pub languages: Vec<ConsentOption>,
    #[serde(default)]
    pub frequencies: Vec<ConsentOption>,
    #[serde(default)]
    pub capture_methods: Vec<ConsentOption>,
}

impl ConsentOptions {
    /// Ids of the categories marked `required`.
    pub fn required_category_ids(&self) -> BTreeSet<CategoryId> {
        self.categories
            .iter()
            .filter(|category| category.required)
            .map(|category| category.id)
            .collect()
    }

    /// Categories sorted by their display order.
    pub fn ordered_categories(&self) -> Vec<&ConsentCategory> {
        let mut categories: Vec<&ConsentCategory> = self.categories.iter().collect();
        categories.sort_by_key(|category| category.order);
        categories
    }
}

pub(crate) fn parse_options(bytes: &[u8]) -> CaravanResult<ConsentOptions> {
    decode_json(bytes, "Consent options")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{
        "categories": [
            {"id": 2, "name": "Financial", "order": 2, "required": true},
            {"id": 1, "name": "Consent to Treat", "order": 1, "required": true},
            {"id": 3, "name": "Marketing", "order": 3, "required": false}
        ],
        "signers": [{"id": 1, "name": "Patient"}],
        "languages": [{"id": 1, "name": "English"}],
        "frequencies": [{"id": 1, "name": "year"}],
        "capture_methods": [{"id": 1, "name": "signature"}]
    }"#;

    #[test]
    fn required_category_ids_keep_only_required() {
        let options = parse_options(BODY).unwrap();
        let required = options.required_category_ids();
        assert_eq!(
            required,
            BTreeSet::from([CategoryId(1), CategoryId(2)])
        );
    }

    #[test]
    fn ordered_categories_follow_order_field() {
        let options = parse_options(BODY).unwrap();
        let names: Vec<&str> = options
            .ordered_categories()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Consent to Treat", "Financial", "Marketing"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let options = parse_options(br#"{"categories": []}"#).unwrap();
        assert!(options.signers.is_empty());
        assert!(options.required_category_ids().is_empty());
    }
}
