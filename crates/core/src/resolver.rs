//! Requirement resolution: which consent definitions apply to an episode, which are still
//! outstanding, and whether the mandatory ones have all been captured.
//!
//! Not-found lookups from the Definition Source are collapsed to empty lists here and nowhere
//! else. Every other upstream failure propagates unchanged.

use crate::sources::{DefinitionSource, OptionSource};
use crate::CompanionResult;
use caravan::{ConsentCapture, ConsentDefinition, DefinitionsQuery};
use companion_types::{DefinitionId, LanguageId, ServiceLineId, SignerId, StateCode};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct RequirementResolver {
    definitions: Arc<dyn DefinitionSource>,
    options: Arc<dyn OptionSource>,
}

impl RequirementResolver {
    pub fn new(definitions: Arc<dyn DefinitionSource>, options: Arc<dyn OptionSource>) -> Self {
        Self {
            definitions,
            options,
        }
    }

    /// Active definitions for the service line, state and language.
    ///
    /// With a `signer`, only definitions that signer may sign are returned. A catalog that does
    /// not exist for the jurisdiction yields an empty list.
    pub async fn applicable_definitions(
        &self,
        service_line: ServiceLineId,
        state: &StateCode,
        language: LanguageId,
        signer: Option<SignerId>,
    ) -> CompanionResult<Vec<ConsentDefinition>> {
        let query = DefinitionsQuery {
            active: Some(true),
            state: state.clone(),
            service_line,
            language_id: language,
            signer_ids: signer.map(|s| vec![s]),
        };

        let definitions = self.definitions.list(&query).await?.or_empty();
        tracing::debug!(
            service_line = %service_line,
            state = %state,
            count = definitions.len(),
            "resolved applicable consent definitions"
        );
        Ok(definitions)
    }

    /// Ids of the applicable definitions whose category is marked required.
    ///
    /// Computed without a signer filter, so any valid signer can satisfy a requirement.
    pub async fn required_definition_ids(
        &self,
        service_line: ServiceLineId,
        state: &StateCode,
        language: LanguageId,
    ) -> CompanionResult<BTreeSet<DefinitionId>> {
        let required_categories = self.options.options().await?.required_category_ids();
        let definitions = self
            .applicable_definitions(service_line, state, language, None)
            .await?;

        Ok(definitions
            .into_iter()
            .filter(|definition| required_categories.contains(&definition.category_id))
            .map(|definition| definition.id)
            .collect())
    }
}

/// Definitions with no capture, in their original order.
///
/// A revoked capture still counts as captured.
pub fn filter_incomplete(
    definitions: Vec<ConsentDefinition>,
    captures: &[ConsentCapture],
) -> Vec<ConsentDefinition> {
    let captured: BTreeSet<DefinitionId> =
        captures.iter().map(|capture| capture.definition_id).collect();

    definitions
        .into_iter()
        .filter(|definition| !captured.contains(&definition.id))
        .collect()
}

/// True when every required id has been completed. Nothing required means satisfied.
pub fn is_satisfied(required: &BTreeSet<DefinitionId>, completed: &BTreeSet<DefinitionId>) -> bool {
    required.is_subset(completed)
}
