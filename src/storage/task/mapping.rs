use std::path::PathBuf;

use crate::storage::task::entity::Model as TaskModel;
use crate::queue::types::{Task, TaskStatus};

impl From<TaskModel> for Task {
    fn from(model: TaskModel) -> Self {
        Task {
            id: model.id,
            source_filename: model.source_filename,
            audio_path: PathBuf::from(model.audio_path),
            // a corrupted status column degrades to the error state
            status: TaskStatus::try_from(model.status).unwrap_or(TaskStatus::Error),
            language: model.language,
            transcript: model.transcript,
            error: model.error,
            transcribe_seconds: model.transcribe_seconds,
            created_at: model.created_at,
            updated_at: model.updated_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
        }
    }
}

impl From<Task> for TaskModel {
    fn from(task: Task) -> Self {
        TaskModel {
            id: task.id,
            source_filename: task.source_filename,
            audio_path: task.audio_path.to_string_lossy().into_owned(),
            status: task.status.to_string(),
            language: task.language,
            transcript: task.transcript,
            error: task.error,
            transcribe_seconds: task.transcribe_seconds,
            created_at: task.created_at,
            updated_at: task.updated_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}
