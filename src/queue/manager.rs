use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Settings, SUPPORTED_LANGUAGES};
use crate::queue::error::QueueError;
use crate::queue::types::{QueueStats, Task, TaskStatus, UploadedFile};
use crate::storage::task::entity::Model as TaskModel;
use crate::storage::task::TaskStorage;
use crate::web::Pagination;
use crate::whisper::is_supported_audio;

/// Owns the task records: intake from uploads, reads for the HTTP surface,
/// manual requeue and deletion. The queue processor drives everything else.
pub struct TaskManager {
    storage: Arc<dyn TaskStorage>,
    audio_dir: PathBuf,
}

impl TaskManager {
    pub fn new(storage: Arc<dyn TaskStorage>, audio_dir: PathBuf) -> Self {
        Self { storage, audio_dir }
    }

    /// Create one queued task per uploaded file. The whole upload is
    /// validated before anything is written, so a bad file creates nothing.
    pub async fn create_tasks(
        &self,
        files: Vec<UploadedFile>,
        language_override: Option<String>,
        settings: &Settings,
    ) -> Result<Vec<Task>, QueueError> {
        if files.is_empty() {
            return Err(QueueError::NoFiles);
        }
        if !settings.has_api_key() {
            return Err(QueueError::MissingApiKey);
        }
        if let Some(language) = &language_override {
            if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
                return Err(QueueError::UnsupportedLanguage(language.clone()));
            }
        }
        for file in &files {
            if file.filename.trim().is_empty() {
                return Err(QueueError::MissingFilename);
            }
            if !is_supported_audio(&file.filename) {
                return Err(QueueError::UnsupportedFormat(file.filename.clone()));
            }
        }

        let language = language_override.unwrap_or_else(|| settings.language.clone());

        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let ext = crate::whisper::audio_extension(&file.filename)
                .unwrap_or_else(|| "bin".to_string());
            let audio_path = self.audio_dir.join(format!("{}.{}", Uuid::new_v4(), ext));

            tokio::fs::write(&audio_path, &file.content)
                .await
                .map_err(|e| QueueError::Storage(e.to_string()))?;

            let task = Task::new(file.filename, audio_path, Some(language.clone()));
            self.storage.create(&TaskModel::from(task.clone())).await?;
            info!("Created task {} for {}", task.id, task.source_filename);
            created.push(task);
        }

        Ok(created)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>, QueueError> {
        Ok(self.storage.get(task_id).await?.map(Task::from))
    }

    pub async fn get_task_status(&self, task_id: &str) -> Result<Option<TaskStatus>, QueueError> {
        Ok(self.get_task(task_id).await?.map(|t| t.status))
    }

    pub async fn list_tasks(&self, pagination: &Pagination) -> Result<Vec<Task>, QueueError> {
        let models = self.storage.list(pagination).await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    /// 1-based position among queued tasks, oldest first. None when the
    /// task is not queued.
    pub async fn queue_position(&self, task_id: &str) -> Result<Option<usize>, QueueError> {
        let queued = self.storage.get_queued().await?;
        Ok(queued.iter().position(|m| m.id == task_id).map(|i| i + 1))
    }

    /// Put a failed task back into the queue, clearing its previous result.
    pub async fn requeue_task(&self, task_id: &str) -> Result<Task, QueueError> {
        let task = self.get_task(task_id).await?.ok_or(QueueError::NotFound)?;

        if !self.storage.requeue(task_id).await? {
            return Err(QueueError::InvalidState(format!(
                "Only failed tasks can be requeued, task is {}",
                task.status
            )));
        }

        info!("Requeued task {}", task_id);
        self.get_task(task_id).await?.ok_or(QueueError::NotFound)
    }

    /// Transcript of a finished task, with the filename to serve it under.
    /// Tasks that are not done are not downloadable.
    pub async fn download_task(&self, task_id: &str) -> Result<(String, String), QueueError> {
        let task = self.get_task(task_id).await?.ok_or(QueueError::NotFound)?;

        if task.status != TaskStatus::Done {
            return Err(QueueError::InvalidState(format!(
                "Task is not finished, current status is {}",
                task.status
            )));
        }
        let transcript = task.transcript.clone().ok_or_else(|| {
            QueueError::Storage("Finished task has no stored transcript".to_string())
        })?;

        Ok((task.result_filename(), transcript))
    }

    /// Remove the record and the audio file it owns.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), QueueError> {
        let task = self.get_task(task_id).await?.ok_or(QueueError::NotFound)?;

        self.storage.delete(task_id).await?;

        if let Err(e) = tokio::fs::remove_file(&task.audio_path).await {
            warn!(
                "Failed to remove audio file {}: {}",
                task.audio_path.display(),
                e
            );
        }

        info!("Deleted task {}", task_id);
        Ok(())
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(QueueStats {
            queued: self.storage.count_by_status("queued").await?,
            processing: self.storage.count_by_status("processing").await?,
            done: self.storage.count_by_status("done").await?,
            error: self.storage.count_by_status("error").await?,
        })
    }
}
