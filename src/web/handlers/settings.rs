use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::ApiResponse;
use crate::config::{ProcessingMode, Settings};
use crate::AppContext;

pub fn settings_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .with_state(ctx)
}

/// Settings as reported over HTTP. The API key never leaves the service
/// in full.
#[derive(Debug, Serialize)]
struct SettingsView {
    api_key: String,
    language: String,
    mode: ProcessingMode,
    hour_from: u8,
    hour_to: u8,
}

impl From<Settings> for SettingsView {
    fn from(settings: Settings) -> Self {
        Self {
            api_key: settings.masked_api_key(),
            language: settings.language.clone(),
            mode: settings.mode,
            hour_from: settings.hour_from,
            hour_to: settings.hour_to,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SettingsUpdate {
    /// Omit to keep the currently stored key.
    api_key: Option<String>,
    language: String,
    mode: ProcessingMode,
    hour_from: u8,
    hour_to: u8,
}

async fn get_settings(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.settings.load().await {
        Ok(settings) => (
            StatusCode::OK,
            Json(ApiResponse::success(SettingsView::from(settings))),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to load settings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn update_settings(
    State(ctx): State<Arc<AppContext>>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    let current = match ctx.settings.load().await {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response();
        }
    };

    let settings = Settings {
        api_key: update.api_key.unwrap_or(current.api_key),
        language: update.language,
        mode: update.mode,
        hour_from: update.hour_from,
        hour_to: update.hour_to,
    };

    if let Err(e) = settings.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response();
    }

    match ctx.settings.save(&settings).await {
        Ok(()) => {
            info!("Settings updated: mode={}, language={}", settings.mode, settings.language);
            (
                StatusCode::OK,
                Json(ApiResponse::success(SettingsView::from(settings))),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to save settings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}
