use std::fmt::Display;

#[derive(Debug)]
pub enum QueueError {
    NoFiles,
    MissingFilename,
    UnsupportedFormat(String),
    UnsupportedLanguage(String),
    MissingApiKey,
    NotFound,
    InvalidState(String),
    Storage(String),
}

impl Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::NoFiles => write!(f, "Please add at least one audio file"),
            QueueError::MissingFilename => write!(f, "Audio filename is missing"),
            QueueError::UnsupportedFormat(name) => {
                write!(f, "Invalid audio format: {}. Supported: mp3, wav, m4a, ogg, flac", name)
            }
            QueueError::UnsupportedLanguage(lang) => write!(f, "Unsupported language: {}", lang),
            QueueError::MissingApiKey => write!(f, "OpenAI API key is not configured"),
            QueueError::NotFound => write!(f, "Task not found"),
            QueueError::InvalidState(msg) => write!(f, "{}", msg),
            QueueError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<anyhow::Error> for QueueError {
    fn from(error: anyhow::Error) -> Self {
        QueueError::Storage(error.to_string())
    }
}
