//! YAML-on-disk link and task store.
//!
//! Layout under the configured data directory:
//!
//! ```text
//! companion/
//!   .lock                      advisory lock held for every read-modify-write cycle
//!   task_sequence              last allocated task id
//!   task_index/<task id>       owning link id
//!   ab/cd/<link uuid>/
//!     link.yaml
//!     tasks.yaml
//! ```
//!
//! Every write goes to a uniquely named temporary sibling first and is then renamed over the
//! target. Read-modify-write cycles take an exclusive `flock` on `.lock`, so several processes
//! (the server and the CLI, say) can share one data directory.

use super::{initial_tasks, log_initialised};
use crate::constants::{COMPANION_DIR_NAME, LINK_FILENAME, TASKS_FILENAME};
use crate::link::{CompanionLink, LinkId};
use crate::sources::{LinkStore, TaskStore};
use crate::task::{CompanionTask, TaskStatus, TaskType};
use crate::{CompanionError, CompanionResult};
use async_trait::async_trait;
use chrono::Utc;
use companion_types::{CareRequestId, TaskId};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};

const LOCK_FILENAME: &str = ".lock";
const TASK_SEQUENCE_FILENAME: &str = "task_sequence";
const TASK_INDEX_DIR_NAME: &str = "task_index";

pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

/// Exclusive hold on the store root. The in-process mutex keeps tasks of this process from
/// parking blocking threads on the `flock`; the file lock excludes other processes.
struct StoreLock<'a> {
    file: File,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for StoreLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release companion store lock: {e}");
        }
    }
}

impl FileStore {
    /// Store rooted at `data_dir/companion`. Directories are created on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join(COMPANION_DIR_NAME),
            write_lock: Mutex::new(()),
        }
    }

    async fn lock(&self) -> CompanionResult<StoreLock<'_>> {
        let guard = self.write_lock.lock().await;
        let path = self.root.join(LOCK_FILENAME);

        let file = blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await?;

        Ok(StoreLock {
            file,
            _guard: guard,
        })
    }

    fn link_dir(&self, link_id: &LinkId) -> PathBuf {
        link_id.sharded_dir(&self.root)
    }

    fn task_index_path(&self, task_id: TaskId) -> PathBuf {
        self.root.join(TASK_INDEX_DIR_NAME).join(task_id.to_string())
    }

    async fn load_tasks(&self, link_id: &LinkId) -> CompanionResult<Vec<CompanionTask>> {
        let path = self.link_dir(link_id).join(TASKS_FILENAME);
        Ok(read_yaml(&path).await?.unwrap_or_default())
    }

    async fn link_for_task(&self, task_id: TaskId) -> CompanionResult<Option<LinkId>> {
        match read_text(&self.task_index_path(task_id)).await? {
            Some(text) => LinkId::parse(&text).map(Some).map_err(|_| {
                CompanionError::InvalidTask(format!("task index for {task_id} is corrupt"))
            }),
            None => Ok(None),
        }
    }

    /// Reserve `count` consecutive task ids and return the first. Caller holds the store lock.
    async fn allocate_task_ids(&self, count: u64) -> CompanionResult<u64> {
        let path = self.root.join(TASK_SEQUENCE_FILENAME);
        let last = match read_text(&path).await? {
            Some(text) => text.trim().parse::<u64>().map_err(|_| {
                CompanionError::StorageRead(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("{} is not a number", path.display()),
                ))
            })?,
            None => 0,
        };

        write_atomic(&path, (last + count).to_string().as_bytes()).await?;
        Ok(last + 1)
    }

    /// Apply `change` to one task and persist the link's task list. Caller holds the store lock.
    async fn modify_task(
        &self,
        task_id: TaskId,
        change: impl FnOnce(&mut CompanionTask),
    ) -> CompanionResult<CompanionTask> {
        let link_id = self
            .link_for_task(task_id)
            .await?
            .ok_or(CompanionError::TaskNotFound(task_id))?;

        let mut tasks = self.load_tasks(&link_id).await?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or(CompanionError::TaskNotFound(task_id))?;
        change(task);
        task.updated_at = Utc::now();
        let updated = task.clone();

        write_yaml(&self.link_dir(&link_id).join(TASKS_FILENAME), &tasks).await?;
        Ok(updated)
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn find_link(&self, link_id: &LinkId) -> CompanionResult<Option<CompanionLink>> {
        read_yaml(&self.link_dir(link_id).join(LINK_FILENAME)).await
    }

    async fn initialise_link(
        &self,
        care_request_id: CareRequestId,
    ) -> CompanionResult<CompanionLink> {
        let _lock = self.lock().await?;

        let link = CompanionLink::new(care_request_id);
        let first_id = self.allocate_task_ids(TaskType::ALL.len() as u64).await?;
        let tasks = initial_tasks(link.id, first_id);

        let dir = self.link_dir(&link.id);
        write_yaml(&dir.join(TASKS_FILENAME), &tasks).await?;
        for task in &tasks {
            write_atomic(&self.task_index_path(task.id), link.id.to_string().as_bytes()).await?;
        }
        // The link document is written last: a link is only visible once its tasks exist.
        write_yaml(&dir.join(LINK_FILENAME), &link).await?;

        log_initialised(&link, &tasks);
        Ok(link)
    }
}

#[async_trait]
impl TaskStore for FileStore {
    async fn find_task(
        &self,
        link_id: &LinkId,
        task_type: TaskType,
    ) -> CompanionResult<Option<CompanionTask>> {
        Ok(self
            .load_tasks(link_id)
            .await?
            .into_iter()
            .find(|task| task.task_type == task_type))
    }

    async fn find_by_id(
        &self,
        link_id: &LinkId,
        task_id: TaskId,
    ) -> CompanionResult<Option<CompanionTask>> {
        Ok(self
            .load_tasks(link_id)
            .await?
            .into_iter()
            .find(|task| task.id == task_id))
    }

    async fn tasks_for_link(&self, link_id: &LinkId) -> CompanionResult<Vec<CompanionTask>> {
        self.load_tasks(link_id).await
    }

    async fn update_metadata(&self, task_id: TaskId, metadata: Value) -> CompanionResult<()> {
        let _lock = self.lock().await?;
        self.modify_task(task_id, |task| task.metadata = metadata)
            .await
            .map(|_| ())
    }

    async fn update_status(
        &self,
        task: &CompanionTask,
        status: TaskStatus,
    ) -> CompanionResult<CompanionTask> {
        let _lock = self.lock().await?;
        self.modify_task(task.id, |stored| stored.status = status)
            .await
    }
}

async fn read_text(path: &Path) -> CompanionResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CompanionError::StorageRead(e)),
    }
}

async fn read_yaml<T: DeserializeOwned>(path: &Path) -> CompanionResult<Option<T>> {
    match read_text(path).await? {
        Some(text) => parse_yaml(&text).map(Some),
        None => Ok(None),
    }
}

/// Parse a stored YAML document, naming the failing path on schema mismatch.
fn parse_yaml<T: DeserializeOwned>(text: &str) -> CompanionResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        CompanionError::YamlDeserialization {
            path,
            source: err.into_inner(),
        }
    })
}

async fn write_yaml<T: Serialize>(path: &Path, value: &T) -> CompanionResult<()> {
    let text = serde_yaml::to_string(value).map_err(CompanionError::YamlSerialization)?;
    write_atomic(path, text.as_bytes()).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> CompanionResult<()> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();

    blocking(move || {
        let dir = path.parent().ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} has no parent directory", path.display()),
            )
        })?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
}

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> CompanionResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CompanionError::StorageWrite(io::Error::other(e)))?
        .map_err(CompanionError::StorageWrite)
}
