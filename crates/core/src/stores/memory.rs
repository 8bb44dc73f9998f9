use super::{initial_tasks, log_initialised};
use crate::link::{CompanionLink, LinkId};
use crate::sources::{LinkStore, TaskStore};
use crate::task::{CompanionTask, TaskStatus, TaskType};
use crate::{CompanionError, CompanionResult};
use async_trait::async_trait;
use chrono::Utc;
use companion_types::{CareRequestId, TaskId};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    links: HashMap<LinkId, CompanionLink>,
    tasks: BTreeMap<TaskId, CompanionTask>,
    next_task_id: u64,
}

/// In-memory link and task store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn find_link(&self, link_id: &LinkId) -> CompanionResult<Option<CompanionLink>> {
        Ok(self.state.read().await.links.get(link_id).cloned())
    }

    async fn initialise_link(
        &self,
        care_request_id: CareRequestId,
    ) -> CompanionResult<CompanionLink> {
        let link = CompanionLink::new(care_request_id);
        let mut state = self.state.write().await;

        let tasks = initial_tasks(link.id, state.next_task_id + 1);
        state.next_task_id += tasks.len() as u64;
        for task in &tasks {
            state.tasks.insert(task.id, task.clone());
        }
        state.links.insert(link.id, link.clone());

        log_initialised(&link, &tasks);
        Ok(link)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_task(
        &self,
        link_id: &LinkId,
        task_type: TaskType,
    ) -> CompanionResult<Option<CompanionTask>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .find(|task| task.link_id == *link_id && task.task_type == task_type)
            .cloned())
    }

    async fn find_by_id(
        &self,
        link_id: &LinkId,
        task_id: TaskId,
    ) -> CompanionResult<Option<CompanionTask>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(&task_id)
            .filter(|task| task.link_id == *link_id)
            .cloned())
    }

    async fn tasks_for_link(&self, link_id: &LinkId) -> CompanionResult<Vec<CompanionTask>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.link_id == *link_id)
            .cloned()
            .collect())
    }

    async fn update_metadata(&self, task_id: TaskId, metadata: Value) -> CompanionResult<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(CompanionError::TaskNotFound(task_id))?;
        task.metadata = metadata;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(
        &self,
        task: &CompanionTask,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask> {
        let mut state = self.state.write().await;
        let stored = state
            .tasks
            .get_mut(&task.id)
            .ok_or(CompanionError::TaskNotFound(task.id))?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ConsentsTaskMetadata;
    use companion_types::DefinitionId;

    #[tokio::test]
    async fn initialise_link_creates_every_task_not_started() {
        let store = MemoryStore::new();
        let link = store.initialise_link(CareRequestId(700)).await.unwrap();

        let tasks = store.tasks_for_link(&link.id).await.unwrap();
        assert_eq!(tasks.len(), TaskType::ALL.len());
        assert!(tasks.iter().all(|t| t.status == TaskStatus::NotStarted));

        let consents = store
            .find_task(&link.id, TaskType::Consents)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            ConsentsTaskMetadata::from_value(&consents.metadata).unwrap(),
            ConsentsTaskMetadata::default()
        );
    }

    #[tokio::test]
    async fn task_ids_are_unique_across_links() {
        let store = MemoryStore::new();
        let a = store.initialise_link(CareRequestId(1)).await.unwrap();
        let b = store.initialise_link(CareRequestId(2)).await.unwrap();

        let task_a = store.find_task(&a.id, TaskType::Consents).await.unwrap().unwrap();
        let task_b = store.find_task(&b.id, TaskType::Consents).await.unwrap().unwrap();
        assert_ne!(task_a.id, task_b.id);

        // A task is only visible through the link that owns it.
        assert!(store.find_by_id(&b.id, task_a.id).await.unwrap().is_none());
        assert!(store.find_by_id(&a.id, task_a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn updates_persist_and_unknown_tasks_fail() {
        let store = MemoryStore::new();
        let link = store.initialise_link(CareRequestId(700)).await.unwrap();
        let task = store
            .find_task(&link.id, TaskType::Consents)
            .await
            .unwrap()
            .unwrap();

        let metadata = ConsentsTaskMetadata::from_ids([DefinitionId(10)]).to_value();
        store.update_metadata(task.id, metadata.clone()).await.unwrap();
        let updated = store.update_status(&task, TaskStatus::Started).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Started);
        assert_eq!(updated.metadata, metadata);

        assert!(matches!(
            store.update_metadata(TaskId(9999), Value::Null).await,
            Err(CompanionError::TaskNotFound(TaskId(9999)))
        ));
    }
}
