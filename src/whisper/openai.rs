use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::StatusCode;
use tracing::info;

use super::{mime_type, SpeechToText, TranscribeError};

const API_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Client for the OpenAI Whisper transcription endpoint.
pub struct OpenAiWhisper {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiWhisper {
    pub fn new() -> Result<Self> {
        let timeout = std::env::var("SCRIBE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::with_timeout(Duration::from_secs(timeout))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_form(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: Option<&str>,
    ) -> Result<multipart::Form, TranscribeError> {
        let part = multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime_type(filename))
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        Ok(form)
    }
}

/// Error payloads come back as `{"error": {"message": ...}}`. Anything
/// else is reported verbatim.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl SpeechToText for OpenAiWhisper {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        api_key: &str,
        language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        if api_key.trim().is_empty() {
            return Err(TranscribeError::MissingApiKey);
        }
        if audio.is_empty() {
            return Err(TranscribeError::Request("Audio file is empty".to_string()));
        }

        info!("Starting transcription: file={}, language={:?}", filename, language);

        let form = self.build_form(audio, filename, language)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.trim())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(TranscribeError::InvalidApiKey);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscribeError::RateLimited);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscribeError::Api(format!(
                "HTTP {}: {}",
                status,
                api_error_message(&body)
            )));
        }

        // response_format=text returns the transcript as the raw body
        let text = response
            .text()
            .await
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranscribeError::EmptyTranscript);
        }

        info!("Transcription completed: {} characters", trimmed.len());
        Ok(trimmed.to_string())
    }
}
