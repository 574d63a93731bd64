use std::sync::Arc;

use anyhow::Result;
use tokio::time::{sleep, Duration};
use tracing::error;

use crate::queue::processor::QueueProcessor;
use crate::storage::settings::SettingsStorage;

const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Periodic driver for the queue processor. Exactly one worker is spawned,
/// so processor runs never overlap.
pub struct QueueWorker {
    processor: Arc<QueueProcessor>,
    settings: Arc<dyn SettingsStorage>,
    interval: Duration,
}

impl QueueWorker {
    pub fn new(processor: Arc<QueueProcessor>, settings: Arc<dyn SettingsStorage>) -> Self {
        let interval = std::env::var("SCRIBE_WORKER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        Self {
            processor,
            settings,
            interval: Duration::from_secs(interval),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(&self) {
        loop {
            match self.tick().await {
                // tasks enqueued during the run are picked up right away
                Ok(n) if n > 0 => continue,
                Ok(_) => sleep(self.interval).await,
                Err(e) => {
                    error!("Queue run failed: {}", e);
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn tick(&self) -> Result<usize> {
        // settings are read fresh on every run
        let settings = self.settings.load().await?;
        self.processor.run_once(&settings).await
    }
}
