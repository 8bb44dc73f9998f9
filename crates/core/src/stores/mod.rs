//! Link and task persistence.
//!
//! [`FileStore`] keeps links and tasks as YAML documents on disk. `MemoryStore` backs the
//! in-process fakes and is only built for tests and the `test-support` feature.

mod file;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use file::FileStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;

use crate::link::{CompanionLink, LinkId};
use crate::task::{CompanionTask, TaskType};
use companion_types::TaskId;

/// One task of every type for a new link, numbered from `first_id`.
pub(crate) fn initial_tasks(link_id: LinkId, first_id: u64) -> Vec<CompanionTask> {
    TaskType::ALL
        .into_iter()
        .zip(first_id..)
        .map(|(task_type, id)| CompanionTask::new(TaskId(id), link_id, task_type))
        .collect()
}

pub(crate) fn log_initialised(link: &CompanionLink, tasks: &[CompanionTask]) {
    tracing::info!(
        link_id = %link.id,
        care_request_id = %link.care_request_id,
        tasks = tasks.len(),
        "initialised companion link"
    );
}
