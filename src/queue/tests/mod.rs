use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};

use crate::config::{ProcessingMode, Settings};
use crate::queue::error::QueueError;
use crate::queue::manager::TaskManager;
use crate::queue::processor::QueueProcessor;
use crate::queue::types::{TaskStatus, UploadedFile};
use crate::storage::task::sqlite::SqliteTaskStorage;
use crate::storage::task::TaskStorage;
use crate::whisper::{SpeechToText, TranscribeError};

/// Engine double: records call order, fails on the scripted filenames.
struct ScriptedEngine {
    fail_on: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    fn new() -> Self {
        Self::failing_on(&[])
    }

    fn failing_on(filenames: &[&str]) -> Self {
        Self {
            fail_on: filenames.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechToText for ScriptedEngine {
    async fn transcribe(
        &self,
        _audio: Vec<u8>,
        filename: &str,
        _api_key: &str,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        self.calls.lock().unwrap().push(filename.to_string());
        if self.fail_on.contains(&filename.to_string()) {
            return Err(TranscribeError::Api("scripted failure".to_string()));
        }
        Ok(format!("transcript of {}", filename))
    }
}

struct TestEnvironment {
    manager: TaskManager,
    storage: Arc<dyn TaskStorage>,
    _db_file: NamedTempFile,
    _audio_dir: TempDir,
}

async fn setup_environment() -> Result<TestEnvironment> {
    let db_file = NamedTempFile::new()?;
    let url = format!("sqlite://{}?mode=rwc", db_file.path().display());
    let storage: Arc<dyn TaskStorage> = Arc::new(SqliteTaskStorage::new(&url).await?);

    let audio_dir = tempfile::tempdir()?;
    let manager = TaskManager::new(storage.clone(), audio_dir.path().to_path_buf());

    Ok(TestEnvironment {
        manager,
        storage,
        _db_file: db_file,
        _audio_dir: audio_dir,
    })
}

fn test_settings() -> Settings {
    Settings {
        api_key: "sk-test-key".to_string(),
        ..Settings::default()
    }
}

fn upload(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        content: vec![0x49, 0x44, 0x33, 0x04],
    }
}

#[tokio::test]
async fn upload_creates_one_queued_task_per_file() -> Result<()> {
    let env = setup_environment().await?;

    let files = vec![upload("one.mp3"), upload("two.wav"), upload("three.ogg")];
    let created = env.manager.create_tasks(files, None, &test_settings()).await.unwrap();

    assert_eq!(created.len(), 3);
    for task in &created {
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.audio_path.exists());
        assert_eq!(task.language.as_deref(), Some("uk"));
    }

    let stats = env.manager.stats().await.unwrap();
    assert_eq!(stats.queued, 3);
    Ok(())
}

#[tokio::test]
async fn upload_rejects_unsupported_format_and_creates_nothing() -> Result<()> {
    let env = setup_environment().await?;

    let files = vec![upload("good.mp3"), upload("bad.pdf")];
    let result = env.manager.create_tasks(files, None, &test_settings()).await;

    assert!(matches!(result, Err(QueueError::UnsupportedFormat(_))));
    assert_eq!(env.manager.stats().await.unwrap().queued, 0);
    Ok(())
}

#[tokio::test]
async fn upload_requires_configured_api_key() -> Result<()> {
    let env = setup_environment().await?;

    let settings = Settings::default();
    let result = env.manager.create_tasks(vec![upload("a.mp3")], None, &settings).await;

    assert!(matches!(result, Err(QueueError::MissingApiKey)));
    Ok(())
}

#[tokio::test]
async fn upload_honors_language_override() -> Result<()> {
    let env = setup_environment().await?;

    let created = env
        .manager
        .create_tasks(vec![upload("a.mp3")], Some("en".to_string()), &test_settings())
        .await
        .unwrap();
    assert_eq!(created[0].language.as_deref(), Some("en"));

    let result = env
        .manager
        .create_tasks(vec![upload("b.mp3")], Some("xx".to_string()), &test_settings())
        .await;
    assert!(matches!(result, Err(QueueError::UnsupportedLanguage(_))));
    Ok(())
}

#[tokio::test]
async fn run_processes_all_tasks_in_creation_order() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let files = vec![upload("one.mp3"), upload("two.wav"), upload("three.ogg")];
    let created = env.manager.create_tasks(files, None, &settings).await.unwrap();

    let engine = Arc::new(ScriptedEngine::new());
    let processor = QueueProcessor::new(env.storage.clone(), engine.clone());

    let attempted = processor.run_once(&settings).await?;
    assert_eq!(attempted, 3);

    assert_eq!(engine.calls(), vec!["one.mp3", "two.wav", "three.ogg"]);

    for task in &created {
        let task = env.manager.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(
            task.transcript.as_deref(),
            Some(format!("transcript of {}", task.source_filename).as_str())
        );
        assert!(task.transcribe_seconds.is_some());
        assert!(task.started_at.is_some());
        assert!(task.completed_at.is_some());
    }
    Ok(())
}

#[tokio::test]
async fn task_failure_is_isolated_and_later_tasks_still_run() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let files = vec![upload("one.mp3"), upload("two.wav"), upload("three.ogg")];
    let created = env.manager.create_tasks(files, None, &settings).await.unwrap();

    let engine = Arc::new(ScriptedEngine::failing_on(&["two.wav"]));
    let processor = QueueProcessor::new(env.storage.clone(), engine.clone());
    processor.run_once(&settings).await?;

    // the failing task came second, the third was still attempted
    assert_eq!(engine.calls(), vec!["one.mp3", "two.wav", "three.ogg"]);

    let first = env.manager.get_task(&created[0].id).await.unwrap().unwrap();
    let second = env.manager.get_task(&created[1].id).await.unwrap().unwrap();
    let third = env.manager.get_task(&created[2].id).await.unwrap().unwrap();

    assert_eq!(first.status, TaskStatus::Done);
    assert_eq!(third.status, TaskStatus::Done);

    assert_eq!(second.status, TaskStatus::Error);
    let message = second.error.unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("scripted failure"));
    Ok(())
}

#[tokio::test]
async fn scheduled_mode_outside_window_changes_nothing() -> Result<()> {
    let env = setup_environment().await?;

    let mut settings = test_settings();
    settings.mode = ProcessingMode::Scheduled;
    settings.hour_from = 22;
    settings.hour_to = 6;

    let created = env
        .manager
        .create_tasks(vec![upload("night.mp3")], None, &settings)
        .await
        .unwrap();

    let engine = Arc::new(ScriptedEngine::new());
    let processor = QueueProcessor::new(env.storage.clone(), engine.clone());

    // noon is outside the 22-6 window
    let attempted = processor.run_at(&settings, 12).await?;
    assert_eq!(attempted, 0);
    assert!(engine.calls().is_empty());

    let task = env.manager.get_task(&created[0].id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);

    // inside the window the same task is picked up
    let attempted = processor.run_at(&settings, 23).await?;
    assert_eq!(attempted, 1);
    let task = env.manager.get_task(&created[0].id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    Ok(())
}

/// The engine observes the task's stored status while transcribing: a task
/// is never handed to the engine without first being marked processing.
struct StatusProbeEngine {
    storage: Arc<dyn TaskStorage>,
    task_id: Mutex<String>,
    observed: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechToText for StatusProbeEngine {
    async fn transcribe(
        &self,
        _audio: Vec<u8>,
        _filename: &str,
        _api_key: &str,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        let task_id = self.task_id.lock().unwrap().clone();
        let model = self.storage.get(&task_id).await.unwrap().unwrap();
        self.observed.lock().unwrap().push(model.status);
        Ok("observed".to_string())
    }
}

#[tokio::test]
async fn task_passes_through_processing_before_done() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let created = env
        .manager
        .create_tasks(vec![upload("probe.mp3")], None, &settings)
        .await
        .unwrap();

    let engine = Arc::new(StatusProbeEngine {
        storage: env.storage.clone(),
        task_id: Mutex::new(created[0].id.clone()),
        observed: Mutex::new(Vec::new()),
    });
    let processor = QueueProcessor::new(env.storage.clone(), engine.clone());
    processor.run_once(&settings).await?;

    assert_eq!(*engine.observed.lock().unwrap(), vec!["processing"]);

    let task = env.manager.get_task(&created[0].id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    Ok(())
}

#[tokio::test]
async fn requeued_task_is_processed_again() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let created = env
        .manager
        .create_tasks(vec![upload("retry.mp3")], None, &settings)
        .await
        .unwrap();
    let task_id = created[0].id.clone();

    let engine = Arc::new(ScriptedEngine::failing_on(&["retry.mp3"]));
    let processor = QueueProcessor::new(env.storage.clone(), engine);
    processor.run_once(&settings).await?;

    let failed = env.manager.get_task(&task_id).await.unwrap().unwrap();
    assert_eq!(failed.status, TaskStatus::Error);

    // a done task cannot be requeued, an errored one can
    let requeued = env.manager.requeue_task(&task_id).await.unwrap();
    assert_eq!(requeued.status, TaskStatus::Queued);
    assert!(requeued.error.is_none());

    let engine = Arc::new(ScriptedEngine::new());
    let processor = QueueProcessor::new(env.storage.clone(), engine);
    processor.run_once(&settings).await?;

    let task = env.manager.get_task(&task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    Ok(())
}

#[tokio::test]
async fn requeue_rejects_tasks_that_did_not_fail() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let created = env
        .manager
        .create_tasks(vec![upload("fine.mp3")], None, &settings)
        .await
        .unwrap();

    let result = env.manager.requeue_task(&created[0].id).await;
    assert!(matches!(result, Err(QueueError::InvalidState(_))));

    let result = env.manager.requeue_task("task-unknown").await;
    assert!(matches!(result, Err(QueueError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn download_serves_only_finished_tasks() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let created = env
        .manager
        .create_tasks(vec![upload("minutes.mp3")], None, &settings)
        .await
        .unwrap();
    let task_id = created[0].id.clone();

    // queued task is not downloadable
    let result = env.manager.download_task(&task_id).await;
    assert!(matches!(result, Err(QueueError::InvalidState(_))));

    let engine = Arc::new(ScriptedEngine::new());
    let processor = QueueProcessor::new(env.storage.clone(), engine);
    processor.run_once(&settings).await?;

    let (filename, content) = env.manager.download_task(&task_id).await.unwrap();
    assert_eq!(filename, "minutes.txt");
    assert_eq!(content, "transcript of minutes.mp3");

    let result = env.manager.download_task("task-unknown").await;
    assert!(matches!(result, Err(QueueError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn queue_position_reflects_creation_order() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let files = vec![upload("one.mp3"), upload("two.mp3")];
    let created = env.manager.create_tasks(files, None, &settings).await.unwrap();

    assert_eq!(env.manager.queue_position(&created[0].id).await.unwrap(), Some(1));
    assert_eq!(env.manager.queue_position(&created[1].id).await.unwrap(), Some(2));

    let engine = Arc::new(ScriptedEngine::new());
    let processor = QueueProcessor::new(env.storage.clone(), engine);
    processor.run_once(&settings).await?;

    assert_eq!(env.manager.queue_position(&created[0].id).await.unwrap(), None);
    Ok(())
}

#[tokio::test]
async fn delete_removes_record_and_audio_file() -> Result<()> {
    let env = setup_environment().await?;
    let settings = test_settings();

    let created = env
        .manager
        .create_tasks(vec![upload("gone.mp3")], None, &settings)
        .await
        .unwrap();
    let audio_path = created[0].audio_path.clone();
    assert!(audio_path.exists());

    env.manager.delete_task(&created[0].id).await.unwrap();

    assert!(env.manager.get_task(&created[0].id).await.unwrap().is_none());
    assert!(!audio_path.exists());
    Ok(())
}
