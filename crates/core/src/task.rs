//! Companion tasks and the consents task metadata.

use crate::link::LinkId;
use crate::{CompanionError, CompanionResult};
use chrono::{DateTime, Utc};
use companion_types::{DefinitionId, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const COMPLETED_DEFINITION_IDS: &str = "completedDefinitionIds";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    IdentificationImage,
    InsuranceCardImages,
    DefaultPharmacy,
    PrimaryCareProvider,
    ConsentMedicationHistoryAuthority,
    Consents,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::IdentificationImage,
        TaskType::InsuranceCardImages,
        TaskType::DefaultPharmacy,
        TaskType::PrimaryCareProvider,
        TaskType::ConsentMedicationHistoryAuthority,
        TaskType::Consents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::IdentificationImage => "IDENTIFICATION_IMAGE",
            TaskType::InsuranceCardImages => "INSURANCE_CARD_IMAGES",
            TaskType::DefaultPharmacy => "DEFAULT_PHARMACY",
            TaskType::PrimaryCareProvider => "PRIMARY_CARE_PROVIDER",
            TaskType::ConsentMedicationHistoryAuthority => "CONSENT_MEDICATION_HISTORY_AUTHORITY",
            TaskType::Consents => "CONSENTS",
        }
    }

    /// Metadata a freshly created task of this type starts with.
    pub fn initial_metadata(&self) -> Value {
        match self {
            TaskType::Consents => ConsentsTaskMetadata::default().to_value(),
            _ => json!({}),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CompanionError::InvalidInput(format!("unknown task type '{s}'")))
    }
}

/// Task lifecycle: `NOT_STARTED → STARTED → COMPLETED`. Transitions are not validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    Started,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(TaskStatus::NotStarted),
            "STARTED" => Ok(TaskStatus::Started),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(CompanionError::InvalidInput(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// One unit of work in a companion session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanionTask {
    pub id: TaskId,
    pub link_id: LinkId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Free-form, shaped by `task_type`.
    #[serde(default)]
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

impl CompanionTask {
    pub fn new(id: TaskId, link_id: LinkId, task_type: TaskType) -> Self {
        Self {
            id,
            link_id,
            task_type,
            status: TaskStatus::NotStarted,
            metadata: task_type.initial_metadata(),
            updated_at: Utc::now(),
        }
    }
}

/// Metadata of a `CONSENTS` task: the definitions captured so far, in capture order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsentsTaskMetadata {
    completed_definition_ids: Vec<DefinitionId>,
}

impl ConsentsTaskMetadata {
    /// Build metadata from ids, dropping duplicates while keeping first-seen order.
    pub fn from_ids(ids: impl IntoIterator<Item = DefinitionId>) -> Self {
        let mut metadata = Self::default();
        for id in ids {
            if !metadata.contains(id) {
                metadata.completed_definition_ids.push(id);
            }
        }
        metadata
    }

    pub fn completed_definition_ids(&self) -> &[DefinitionId] {
        &self.completed_definition_ids
    }

    pub fn completed_set(&self) -> BTreeSet<DefinitionId> {
        self.completed_definition_ids.iter().copied().collect()
    }

    pub fn contains(&self, id: DefinitionId) -> bool {
        self.completed_definition_ids.contains(&id)
    }

    /// Metadata with `id` appended, or `None` when it is already recorded.
    pub fn with_completed(&self, id: DefinitionId) -> Option<Self> {
        if self.contains(id) {
            return None;
        }
        let mut completed_definition_ids = self.completed_definition_ids.clone();
        completed_definition_ids.push(id);
        Some(Self {
            completed_definition_ids,
        })
    }

    /// Parse stored task metadata.
    ///
    /// Entries may be JSON numbers or numeric strings. Nulls are skipped silently; any other
    /// entry is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::InvalidTask` if `value` is not an object or its
    /// `completedDefinitionIds` is not an array.
    pub fn from_value(value: &Value) -> CompanionResult<Self> {
        let entries = value
            .as_object()
            .and_then(|object| object.get(COMPLETED_DEFINITION_IDS))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                CompanionError::InvalidTask(format!(
                    "consents task metadata must be an object with a {COMPLETED_DEFINITION_IDS} array"
                ))
            })?;

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::Null => {}
                Value::Number(n) => match n.as_u64() {
                    Some(id) => ids.push(DefinitionId(id)),
                    None => tracing::warn!(value = %n, "invalid value in consents task metadata"),
                },
                Value::String(s) => match s.trim().parse::<u64>() {
                    Ok(id) => ids.push(DefinitionId(id)),
                    Err(_) => tracing::warn!(value = %s, "invalid value in consents task metadata"),
                },
                other => tracing::warn!(value = %other, "invalid value in consents task metadata"),
            }
        }

        Ok(Self::from_ids(ids))
    }

    pub fn to_value(&self) -> Value {
        json!({ COMPLETED_DEFINITION_IDS: self.completed_definition_ids })
    }
}

/// A `CONSENTS` task with its metadata already parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct CompanionConsentsTask {
    pub task: CompanionTask,
    pub metadata: ConsentsTaskMetadata,
}

impl TryFrom<CompanionTask> for CompanionConsentsTask {
    type Error = CompanionError;

    fn try_from(task: CompanionTask) -> Result<Self, Self::Error> {
        if task.task_type != TaskType::Consents {
            return Err(CompanionError::InvalidTask(format!(
                "task {} is {}, not CONSENTS",
                task.id, task.task_type
            )));
        }
        let metadata = ConsentsTaskMetadata::from_value(&task.metadata)?;
        Ok(Self { task, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_accepts_numbers_and_numeric_strings() {
        let metadata =
            ConsentsTaskMetadata::from_value(&json!({"completedDefinitionIds": [10, "11"]}))
                .unwrap();
        assert_eq!(
            metadata.completed_definition_ids(),
            &[DefinitionId(10), DefinitionId(11)]
        );
    }

    #[test]
    fn from_value_skips_nulls_and_invalid_entries() {
        let metadata = ConsentsTaskMetadata::from_value(
            &json!({"completedDefinitionIds": [null, "abc", true, {"id": 1}, -4, 12]}),
        )
        .unwrap();
        assert_eq!(metadata.completed_definition_ids(), &[DefinitionId(12)]);
    }

    #[test]
    fn from_value_drops_duplicates_keeping_order() {
        let metadata =
            ConsentsTaskMetadata::from_value(&json!({"completedDefinitionIds": [3, 1, "3", 2]}))
                .unwrap();
        assert_eq!(
            metadata.completed_definition_ids(),
            &[DefinitionId(3), DefinitionId(1), DefinitionId(2)]
        );
    }

    #[test]
    fn from_value_rejects_wrong_shapes() {
        for bad in [
            json!(null),
            json!([1, 2]),
            json!({}),
            json!({"completedDefinitionIds": "1,2"}),
        ] {
            assert!(matches!(
                ConsentsTaskMetadata::from_value(&bad),
                Err(CompanionError::InvalidTask(_))
            ));
        }
    }

    #[test]
    fn with_completed_appends_once() {
        let metadata = ConsentsTaskMetadata::from_ids([DefinitionId(10)]);
        let updated = metadata.with_completed(DefinitionId(11)).unwrap();
        assert_eq!(
            updated.completed_definition_ids(),
            &[DefinitionId(10), DefinitionId(11)]
        );
        assert!(updated.with_completed(DefinitionId(11)).is_none());
        // The original is untouched.
        assert_eq!(metadata.completed_definition_ids(), &[DefinitionId(10)]);
    }

    #[test]
    fn to_value_round_trips_through_from_value() {
        let metadata = ConsentsTaskMetadata::from_ids([DefinitionId(5), DefinitionId(6)]);
        assert_eq!(
            metadata.to_value(),
            json!({"completedDefinitionIds": [5, 6]})
        );
    }

    #[test]
    fn task_type_serialises_screaming_snake() {
        assert_eq!(
            serde_json::to_value(TaskType::ConsentMedicationHistoryAuthority).unwrap(),
            json!("CONSENT_MEDICATION_HISTORY_AUTHORITY")
        );
        for task_type in TaskType::ALL {
            assert_eq!(task_type.as_str().parse::<TaskType>().unwrap(), task_type);
        }
    }

    #[test]
    fn consents_task_view_rejects_other_types() {
        let link = LinkId::new();
        let task = CompanionTask::new(TaskId(1), link, TaskType::DefaultPharmacy);
        assert!(matches!(
            CompanionConsentsTask::try_from(task),
            Err(CompanionError::InvalidTask(_))
        ));

        let task = CompanionTask::new(TaskId(2), link, TaskType::Consents);
        let view = CompanionConsentsTask::try_from(task).unwrap();
        assert!(view.metadata.completed_definition_ids().is_empty());
    }
}
