//! The task store seam
//!
//! Handlers talk to `dyn TaskStore`; production wires in `PgTaskStore`,
//! tests can wire in `MemoryTaskStore`.

use async_trait::async_trait;

use super::filters::ListQuery;
use super::StoreError;
use crate::models::{NewTask, TaskDetail, TaskHeader};

#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Write the header and every child row atomically.
    async fn create_task(&self, task: &NewTask) -> Result<TaskHeader, StoreError>;

    /// Header for one task_id.
    async fn get_task(&self, task_id: &str) -> Result<TaskHeader, StoreError>;

    /// Header plus rubrics, files and artifacts, as one consistent snapshot.
    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, StoreError>;

    /// One page of headers, newest first.
    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<TaskHeader>, StoreError>;
}
