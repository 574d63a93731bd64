use async_trait::async_trait;
use std::fmt::Display;

pub mod openai;

pub use openai::OpenAiWhisper;

/// Upload formats accepted by the service.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "m4a", "ogg", "flac"];

pub fn audio_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit('.').next()?;
    if ext.len() == filename.len() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn is_supported_audio(filename: &str) -> bool {
    match audio_extension(filename) {
        Some(ext) => AUDIO_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// MIME type sent to the transcription API, derived from the filename.
pub fn mime_type(filename: &str) -> &'static str {
    match audio_extension(filename).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/mpeg",
    }
}

#[derive(Debug, PartialEq)]
pub enum TranscribeError {
    MissingApiKey,
    InvalidApiKey,
    RateLimited,
    Api(String),
    Request(String),
    EmptyTranscript,
}

impl Display for TranscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscribeError::MissingApiKey => write!(f, "API key is not configured"),
            TranscribeError::InvalidApiKey => write!(f, "API key was rejected"),
            TranscribeError::RateLimited => write!(f, "API rate limit exceeded"),
            TranscribeError::Api(msg) => write!(f, "API error: {}", msg),
            TranscribeError::Request(msg) => write!(f, "Request failed: {}", msg),
            TranscribeError::EmptyTranscript => write!(f, "Empty transcription received"),
        }
    }
}

impl std::error::Error for TranscribeError {}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        api_key: &str,
        language: Option<&str>,
    ) -> Result<String, TranscribeError>;
}
