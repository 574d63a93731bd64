use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::ApiResponse;
use crate::queue::{QueueError, Task, UploadedFile};
use crate::web::Pagination;
use crate::AppContext;

const UPLOAD_LIMIT_BYTES: usize = 100 * 1024 * 1024;

pub fn task_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route(
            "/upload",
            post(upload_tasks).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/", get(list_tasks))
        .route("/stats", get(queue_stats))
        .route("/:task_id", get(get_task).delete(delete_task))
        .route("/:task_id/status", get(get_task_status))
        .route("/:task_id/download", get(download_task))
        .route("/:task_id/requeue", post(requeue_task))
        .with_state(ctx)
}

fn error_status(error: &QueueError) -> StatusCode {
    match error {
        QueueError::NoFiles
        | QueueError::MissingFilename
        | QueueError::UnsupportedFormat(_)
        | QueueError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
        QueueError::MissingApiKey | QueueError::InvalidState(_) => StatusCode::CONFLICT,
        QueueError::NotFound => StatusCode::NOT_FOUND,
        QueueError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: QueueError) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        error_status(&error),
        Json(ApiResponse::error(error.to_string())),
    )
}

#[derive(Debug, Serialize)]
struct TaskView {
    #[serde(flatten)]
    task: Task,
    queue_position: Option<usize>,
}

// Upload endpoint: one task per file part. An optional `language` text
// field overrides the configured default for every file in the request.
async fn upload_tasks(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut files = Vec::new();
    let mut language = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(format!("Invalid multipart body: {}", e))),
                )
                    .into_response();
            }
        };

        let name = field.name().map(|s| s.to_string());
        if name.as_deref() == Some("language") {
            match field.text().await {
                Ok(value) => language = Some(value),
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ApiResponse::<()>::error(format!("Invalid language field: {}", e))),
                    )
                        .into_response();
                }
            }
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(content) => files.push(UploadedFile {
                filename,
                content: content.to_vec(),
            }),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(format!("Failed to read upload: {}", e))),
                )
                    .into_response();
            }
        }
    }

    let settings = match ctx.settings.load().await {
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

    match ctx.task_manager.create_tasks(files, language, &settings).await {
        Ok(tasks) => (StatusCode::CREATED, Json(ApiResponse::success(tasks))).into_response(),
        Err(e) => {
            error!("Failed to create tasks: {}", e);
            error_response(e).into_response()
        }
    }
}

async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse {
    match ctx.task_manager.list_tasks(&pagination.check()).await {
        Ok(tasks) => (StatusCode::OK, Json(ApiResponse::success(tasks))).into_response(),
        Err(e) => {
            error!("Failed to list tasks: {}", e);
            error_response(e).into_response()
        }
    }
}

async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let task = match ctx.task_manager.get_task(&task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return error_response(QueueError::NotFound).into_response(),
        Err(e) => {
            error!("Failed to get task: {}", e);
            return error_response(e).into_response();
        }
    };

    let queue_position = match ctx.task_manager.queue_position(&task_id).await {
        Ok(position) => position,
        Err(e) => {
            error!("Failed to compute queue position: {}", e);
            return error_response(e).into_response();
        }
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(TaskView { task, queue_position })),
    )
        .into_response()
}

async fn get_task_status(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.task_manager.get_task_status(&task_id).await {
        Ok(Some(status)) => (StatusCode::OK, Json(ApiResponse::success(status))).into_response(),
        Ok(None) => error_response(QueueError::NotFound).into_response(),
        Err(e) => {
            error!("Failed to get task status: {}", e);
            error_response(e).into_response()
        }
    }
}

// Download endpoint: the stored transcript as a text attachment. Tasks
// that are not done are rejected with 409.
async fn download_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.task_manager.download_task(&task_id).await {
        Ok((filename, content)) => (
            StatusCode::OK,
            [
                (
                    header::CONTENT_TYPE,
                    "text/plain; charset=utf-8".to_string(),
                ),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            content,
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn requeue_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.task_manager.requeue_task(&task_id).await {
        Ok(task) => (StatusCode::OK, Json(ApiResponse::success(task))).into_response(),
        Err(e) => {
            error!("Failed to requeue task: {}", e);
            error_response(e).into_response()
        }
    }
}

async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.task_manager.delete_task(&task_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::success(()))).into_response(),
        Err(e) => {
            error!("Failed to delete task: {}", e);
            error_response(e).into_response()
        }
    }
}

async fn queue_stats(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.task_manager.stats().await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats))).into_response(),
        Err(e) => {
            error!("Failed to get queue stats: {}", e);
            error_response(e).into_response()
        }
    }
}
