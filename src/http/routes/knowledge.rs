// =============================================================================
// KNOWLEDGE ROUTES - Knowledge base management endpoints
// =============================================================================
//
// These handlers keep the original admin API shape: failures come back as
// `{"success": false, "error": "..."}` rather than the ApiError envelope the
// chat endpoints use.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::http::state::AppState;

fn failure(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

/// GET /api/knowledge - (re)initialize the knowledge base from seed content.
pub async fn initialize(State(state): State<Arc<AppState>>) -> Response {
    match state.knowledge.initialize().await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Knowledge base initialized",
        }))
        .into_response(),
        Err(err) => {
            tracing::error!("knowledge base initialization failed: {err}");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to initialize knowledge base",
            )
        }
    }
}

/// POST /api/knowledge - upload a PDF (multipart) or trigger a rebuild
/// (JSON `{"action": "rebuild"}`). Dispatches on Content-Type.
pub async fn update(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("application/json") {
        return match Json::<Value>::from_request(request, &()).await {
            Ok(Json(body)) => handle_rebuild(&state, &body).await,
            Err(_) => failure(StatusCode::BAD_REQUEST, "Invalid JSON body"),
        };
    }

    match Multipart::from_request(request, &()).await {
        Ok(multipart) => handle_upload(&state, multipart).await,
        Err(_) => failure(StatusCode::BAD_REQUEST, "No file provided"),
    }
}

async fn handle_rebuild(state: &AppState, body: &Value) -> Response {
    if body.get("action").and_then(Value::as_str) != Some("rebuild") {
        return failure(StatusCode::BAD_REQUEST, "Unknown action");
    }

    match state.knowledge.rebuild().await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Knowledge base rebuilt",
        }))
        .into_response(),
        Err(err) => {
            tracing::error!("knowledge base rebuild failed: {err}");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to rebuild knowledge base",
            )
        }
    }
}

async fn handle_upload(state: &AppState, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.pdf").to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((name, bytes.to_vec())),
            Err(err) => {
                tracing::error!("failed to read uploaded file: {err}");
                return failure(StatusCode::BAD_REQUEST, "No file provided");
            }
        }
        break;
    }

    let Some((name, bytes)) = upload else {
        return failure(StatusCode::BAD_REQUEST, "No file provided");
    };

    if !name.to_lowercase().ends_with(".pdf") {
        return failure(StatusCode::BAD_REQUEST, "Only PDF files are supported");
    }

    tracing::info!(file = %name, size = bytes.len(), "processing knowledge upload");

    let result = async {
        state.knowledge.save_upload(&name, &bytes).await?;
        state.knowledge.add_pdf(&name).await
    }
    .await;

    match result {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("File {name} uploaded and added to knowledge base"),
            "file": name,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(file = %name, "knowledge upload failed: {err}");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process file upload",
            )
        }
    }
}

/// OPTIONS /api/knowledge - list the uploaded files.
pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    match state.knowledge.uploaded_files().await {
        Ok(files) => Json(json!({ "success": true, "files": files })).into_response(),
        Err(err) => {
            tracing::error!("failed to list uploaded files: {err}");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list uploaded files",
            )
        }
    }
}
