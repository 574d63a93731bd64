pub mod config;
pub mod queue;
pub mod storage;
pub mod utils;
pub mod web;
pub mod whisper;

use std::{env, sync::Arc};
use once_cell::sync::Lazy;
use queue::TaskManager;
use storage::settings::SettingsStorage;

pub struct AppContext {
    pub task_manager: Arc<TaskManager>,
    pub settings: Arc<dyn SettingsStorage>,
}

const SCRIBE_SQLITE_PATH: &str = "sqlite://./scribe_data/database/storage.db?mode=rwc";
const SCRIBE_AUDIO_PATH: &str = "./scribe_data/audio/";
const SCRIBE_LOG_PATH: &str = "./logs";

pub static SQLITE_PATH: Lazy<String> = Lazy::new(|| {
    match env::var("SCRIBE_SQLITE_PATH") {
        Ok(path) => path,
        Err(_) => {
            dotenv::var("SCRIBE_SQLITE_PATH").unwrap_or_else(|_| SCRIBE_SQLITE_PATH.to_string())
        }
    }
});

pub static AUDIO_PATH: Lazy<String> = Lazy::new(|| {
    match env::var("SCRIBE_AUDIO_PATH") {
        Ok(path) => path,
        Err(_) => {
            dotenv::var("SCRIBE_AUDIO_PATH").unwrap_or_else(|_| SCRIBE_AUDIO_PATH.to_string())
        }
    }
});

pub static LOG_PATH: Lazy<String> = Lazy::new(|| {
    match env::var("SCRIBE_LOG_PATH") {
        Ok(path) => path,
        Err(_) => {
            dotenv::var("SCRIBE_LOG_PATH").unwrap_or_else(|_| SCRIBE_LOG_PATH.to_string())
        }
    }
});

pub fn init_env() {
    dotenv::dotenv().ok();

    if let Some(db_path) = SQLITE_PATH.strip_prefix("sqlite://") {
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        if let Some(dir) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(dir).unwrap_or_else(|e| {
                eprintln!("Failed to create database directory: {}", e);
            });
        }
    }

    std::fs::create_dir_all(AUDIO_PATH.as_str()).unwrap_or_else(|e| {
        eprintln!("Failed to create audio directory: {}", e);
    });
}
