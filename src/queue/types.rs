use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;
    fn try_from(status: String) -> Result<Self, String> {
        match status.as_str() {
            "queued" => Ok(TaskStatus::Queued),
            "processing" => Ok(TaskStatus::Processing),
            "done" => Ok(TaskStatus::Done),
            "error" => Ok(TaskStatus::Error),
            _ => Err(format!("Invalid task status: {}", status)),
        }
    }
}

/// One audio file on its way through the transcription queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub source_filename: String,
    pub audio_path: PathBuf,
    pub status: TaskStatus,
    pub language: Option<String>,
    pub transcript: Option<String>,
    pub error: Option<String>,
    pub transcribe_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(source_filename: String, audio_path: PathBuf, language: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("task-{}", Uuid::new_v4()),
            source_filename,
            audio_path,
            status: TaskStatus::Queued,
            language,
            transcript: None,
            error: None,
            transcribe_seconds: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Download filename: the source audio name with its extension
    /// swapped for `.txt`.
    pub fn result_filename(&self) -> String {
        let stem = Path::new(&self.source_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcription");
        format!("{}.txt", stem)
    }
}

/// One file from a multipart upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: u64,
    pub processing: u64,
    pub done: u64,
    pub error: u64,
}
