#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use scribe_rs::queue::{QueueProcessor, QueueWorker, TaskManager};
use scribe_rs::storage::settings::{SettingsStorage, SqliteSettingsStorage};
use scribe_rs::storage::task::sqlite::SqliteTaskStorage;
use scribe_rs::utils::logger;
use scribe_rs::whisper::OpenAiWhisper;
use scribe_rs::{AppContext, AUDIO_PATH, LOG_PATH, SQLITE_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    scribe_rs::init_env();
    let _guard = logger::init(LOG_PATH.clone())?;

    info!("Starting transcription queue service...");

    info!("Initializing storage...");
    let task_storage = Arc::new(SqliteTaskStorage::new(&SQLITE_PATH).await?);
    let settings_storage: Arc<dyn SettingsStorage> =
        Arc::new(SqliteSettingsStorage::new(&SQLITE_PATH).await?);

    info!("Initializing task manager...");
    let task_manager = Arc::new(TaskManager::new(
        task_storage.clone(),
        PathBuf::from(AUDIO_PATH.as_str()),
    ));

    info!("Initializing queue worker...");
    let engine = Arc::new(OpenAiWhisper::new()?);
    let processor = Arc::new(QueueProcessor::new(task_storage.clone(), engine));
    let worker = QueueWorker::new(processor, settings_storage.clone());

    tokio::spawn(async move {
        worker.run().await;
    });

    let ctx = Arc::new(AppContext {
        task_manager,
        settings: settings_storage,
    });

    let port = std::env::var("SCRIBE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7200);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting HTTP server at http://{}", addr);

    match scribe_rs::web::start_server(ctx, addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            tracing::error!("Server error: {}", e);
            return Err(e);
        }
    }

    info!("Shutting down...");

    Ok(())
}
