use async_trait::async_trait;
use anyhow::Result;
use crate::storage::task::entity::Model as TaskModel;
use crate::web::Pagination;
pub mod sqlite;
pub mod entity;
pub mod mapping;

#[async_trait]
pub trait TaskStorage: Send + Sync + 'static {
    async fn create(&self, model: &TaskModel) -> Result<()>;
    async fn get(&self, task_id: &str) -> Result<Option<TaskModel>>;
    /// Newest first, for the task list view.
    async fn list(&self, pagination: &Pagination) -> Result<Vec<TaskModel>>;
    /// All queued tasks, oldest first.
    async fn get_queued(&self) -> Result<Vec<TaskModel>>;
    /// queued -> processing. Returns false when the task was not queued.
    async fn mark_processing(&self, task_id: &str) -> Result<bool>;
    /// processing -> done, storing the transcript and the call duration.
    async fn store_transcript(&self, task_id: &str, transcript: &str, seconds: f64) -> Result<()>;
    /// processing -> error, storing the failure message.
    async fn store_error(&self, task_id: &str, error: &str) -> Result<()>;
    /// error -> queued, clearing prior results. Returns false when the task
    /// was not in the error state.
    async fn requeue(&self, task_id: &str) -> Result<bool>;
    async fn delete(&self, task_id: &str) -> Result<()>;
    async fn count_by_status(&self, status: &str) -> Result<u64>;
}
