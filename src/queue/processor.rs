use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{Local, Timelike};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::queue::types::Task;
use crate::storage::task::TaskStorage;
use crate::whisper::SpeechToText;

/// One run of the processor drains the queue as it stood at the start of
/// the run: oldest task first, one at a time, each outcome written back
/// before the next task starts.
pub struct QueueProcessor {
    storage: Arc<dyn TaskStorage>,
    engine: Arc<dyn SpeechToText>,
}

impl QueueProcessor {
    pub fn new(storage: Arc<dyn TaskStorage>, engine: Arc<dyn SpeechToText>) -> Self {
        Self { storage, engine }
    }

    /// Process the queue now. Returns the number of tasks attempted.
    pub async fn run_once(&self, settings: &Settings) -> Result<usize> {
        self.run_at(settings, Local::now().hour()).await
    }

    /// Process the queue as of the given hour of day. Split out from
    /// [`run_once`] so the scheduled-hours gate is testable.
    pub async fn run_at(&self, settings: &Settings, hour: u32) -> Result<usize> {
        if !settings.processing_allowed_at(hour) {
            debug!("Processing not allowed at hour {}, skipping run", hour);
            return Ok(0);
        }

        let batch = self.storage.get_queued().await?;
        if batch.is_empty() {
            return Ok(0);
        }

        info!("Processing {} queued task(s)", batch.len());

        let mut attempted = 0;
        for model in batch {
            // a task failure never aborts the run
            self.process_task(model.into(), settings).await;
            attempted += 1;
        }

        Ok(attempted)
    }

    async fn process_task(&self, task: Task, settings: &Settings) {
        // the task may have been deleted or requeued since the batch was
        // selected; only a queued task enters processing
        match self.storage.mark_processing(&task.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Task {} left the queue before processing", task.id);
                return;
            }
            Err(e) => {
                error!("Failed to mark task {} as processing: {}", task.id, e);
                return;
            }
        }

        info!("Transcribing task {} ({})", task.id, task.source_filename);

        let audio = match tokio::fs::read(&task.audio_path).await {
            Ok(audio) => audio,
            Err(e) => {
                let message = format!("Failed to read audio file: {}", e);
                self.record_error(&task.id, &message).await;
                return;
            }
        };

        let start = Instant::now();
        let result = self
            .engine
            .transcribe(
                audio,
                &task.source_filename,
                &settings.api_key,
                task.language.as_deref(),
            )
            .await;

        match result {
            Ok(transcript) => {
                let elapsed = start.elapsed().as_secs_f64();
                if let Err(e) = self
                    .storage
                    .store_transcript(&task.id, &transcript, elapsed)
                    .await
                {
                    error!("Failed to store transcript for task {}: {}", task.id, e);
                    return;
                }
                info!(
                    "Task {} done in {:.2}s ({} characters)",
                    task.id,
                    elapsed,
                    transcript.len()
                );
            }
            Err(e) => {
                self.record_error(&task.id, &e.to_string()).await;
            }
        }
    }

    async fn record_error(&self, task_id: &str, message: &str) {
        error!("Task {} failed: {}", task_id, message);
        if let Err(e) = self.storage.store_error(task_id, message).await {
            error!("Failed to store error for task {}: {}", task_id, e);
        }
    }
}
