//! HTTP dispatch
//!
//! Thin layer mapping requests onto file store operations and the error
//! taxonomy onto status codes. All real validation lives in the store.

use std::io;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::pin_mut;
use log::warn;
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::error::StoreError;
use crate::server::events::notification_stream;
use crate::server::state::AppState;
use crate::storage::{FailedUpload, ListResult, UploadSummary};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/list", get(list))
        .route("/api/folders", post(create_folder))
        .route("/api/upload", post(upload))
        .route("/api/download", get(download))
        .route("/api/entries", delete(delete_entry))
        .route("/api/rename", post(rename))
        .route("/api/move", post(move_entry))
        .route("/api/events", get(notification_stream))
        // The store enforces its own streaming size limit.
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Dispatcher-level failure: a typed store error or an unreadable body.
pub enum ApiError {
    Store(StoreError),
    BadBody(String),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Store(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(e) => (status_for(&e), e.to_string()),
            ApiError::BadBody(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        if status.is_server_error() {
            warn!("request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn status_for(error: &StoreError) -> StatusCode {
    match error {
        StoreError::InvalidPath(_) | StoreError::InvalidDestination(_) => StatusCode::BAD_REQUEST,
        StoreError::RootForbidden => StatusCode::FORBIDDEN,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) | StoreError::IsDirectory(_) => StatusCode::CONFLICT,
        StoreError::DepthExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Deserialize)]
struct CreateFolderRequest {
    #[serde(default)]
    path: String,
    name: String,
}

#[derive(Deserialize)]
struct RenameRequest {
    path: String,
    new_name: String,
}

#[derive(Deserialize)]
struct MoveRequest {
    path: String,
    #[serde(default)]
    destination: String,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ListResult>, ApiError> {
    Ok(Json(state.store.list(&query.path).await?))
}

async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.create_folder(&req.path, &req.name).await?;
    Ok(Json(json!({})))
}

async fn upload(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadSummary>, ApiError> {
    let mut saved = 0;
    let mut failed = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadBody(e.to_string()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        // Pump this field's bytes straight into the store; an abort shows
        // up as a chunk error and the store discards the partial file.
        let data = async_stream::stream! {
            loop {
                match field.chunk().await {
                    Ok(Some(bytes)) => yield Ok(bytes),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(io::Error::other(e));
                        break;
                    }
                }
            }
        };
        pin_mut!(data);

        match state.store.save_stream(&query.path, &name, data).await {
            Ok(_) => saved += 1,
            Err(e) => failed.push(FailedUpload {
                name,
                error: e.to_string(),
            }),
        }
    }

    state.store.finish_upload(&query.path, saved).await;
    Ok(Json(UploadSummary { saved, failed }))
}

async fn download(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let download = state.store.download(&query.path).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace('"', "_")
    );
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_LENGTH, download.size.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    let body = Body::from_stream(ReaderStream::new(download.file));
    Ok((headers, body).into_response())
}

async fn delete_entry(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete(&query.path).await?;
    Ok(Json(json!({})))
}

async fn rename(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.rename(&req.path, &req.new_name).await?;
    Ok(Json(json!({})))
}

async fn move_entry(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.move_entry(&req.path, &req.destination).await?;
    Ok(Json(json!({})))
}
