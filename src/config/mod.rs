use std::env;
use std::fmt::Display;

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

/// Languages accepted as transcription hints.
pub const SUPPORTED_LANGUAGES: [&str; 6] = ["uk", "en", "ru", "de", "fr", "es"];

pub const DEFAULT_LANGUAGE: &str = "uk";
pub const DEFAULT_HOUR_FROM: u8 = 22;
pub const DEFAULT_HOUR_TO: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Process queued tasks on every worker tick.
    Immediate,
    /// Process only when the current hour falls inside the configured window.
    Scheduled,
}

impl Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingMode::Immediate => write!(f, "immediate"),
            ProcessingMode::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl TryFrom<String> for ProcessingMode {
    type Error = String;
    fn try_from(mode: String) -> Result<Self, Self::Error> {
        match mode.as_str() {
            "immediate" => Ok(ProcessingMode::Immediate),
            "scheduled" => Ok(ProcessingMode::Scheduled),
            _ => Err(format!("Invalid processing mode: {}", mode)),
        }
    }
}

/// Service configuration read by the queue processor on every run.
/// Persisted as a single row, never held as ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_key: String,
    pub language: String,
    pub mode: ProcessingMode,
    pub hour_from: u8,
    pub hour_to: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            mode: ProcessingMode::Immediate,
            hour_from: DEFAULT_HOUR_FROM,
            hour_to: DEFAULT_HOUR_TO,
        }
    }
}

impl Settings {
    /// Initial settings for a fresh installation, honoring env overrides.
    pub fn seed_from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env::var("SCRIBE_OPENAI_API_KEY").unwrap_or(defaults.api_key),
            language: env::var("SCRIBE_LANGUAGE").unwrap_or(defaults.language),
            mode: env::var("SCRIBE_PROCESSING_MODE")
                .ok()
                .and_then(|m| ProcessingMode::try_from(m).ok())
                .unwrap_or(defaults.mode),
            hour_from: env::var("SCRIBE_HOUR_FROM")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(defaults.hour_from),
            hour_to: env::var("SCRIBE_HOUR_TO")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(defaults.hour_to),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.hour_from > 23 || self.hour_to > 23 {
            anyhow::bail!("Scheduled hours must be within 0-23");
        }
        if !SUPPORTED_LANGUAGES.contains(&self.language.as_str()) {
            anyhow::bail!("Unsupported language: {}", self.language);
        }
        Ok(())
    }

    /// Whether the processor may run at the given hour of day.
    /// A window with `hour_from > hour_to` spans midnight, e.g. 22-6.
    pub fn processing_allowed_at(&self, hour: u32) -> bool {
        if self.mode == ProcessingMode::Immediate {
            return true;
        }
        let from = self.hour_from as u32;
        let to = self.hour_to as u32;
        if from <= to {
            from <= hour && hour < to
        } else {
            hour >= from || hour < to
        }
    }

    pub fn processing_allowed_now(&self) -> bool {
        self.processing_allowed_at(Local::now().hour())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// API key as reported back over HTTP. Only the tail is kept.
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return String::new();
        }
        if key.len() <= 4 {
            return "****".to_string();
        }
        format!("****{}", &key[key.len() - 4..])
    }
}
