//! HTTP surface for the ingestion pipeline (feature `server`).
//!
//! Thin transport wiring only: handlers unpack the request, call the
//! library, and serialise the result. Pipeline semantics live in
//! [`crate::ingest`]; nothing here decides stage outcomes.
//!
//! Routes:
//! * `GET  /`                 — service index
//! * `POST /receipts/ingest`  — multipart field `file`; the full pipeline
//! * `POST /ocr`              — multipart field `image`; standalone OCR
//! * `POST /extract/analyze`  — JSON `{"text": …}`; standalone extraction

use crate::capability::Capabilities;
use crate::config::IngestConfig;
use crate::ingest::{ingest, UploadedFile};
use crate::prompts;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Request bodies larger than this are rejected before any handler runs.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub caps: Capabilities,
    pub config: IngestConfig,
}

/// Build the router with all routes attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/receipts/ingest", post(ingest_receipt))
        .route("/ocr", post(ocr_image))
        .route("/extract/analyze", post(analyze_text))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    info!("receiptd listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Receipt Processor API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /receipts/ingest": "Upload a receipt and run the full pipeline",
            "POST /ocr": "Extract text from an uploaded image",
            "POST /extract/analyze": "Analyze receipt text with the extraction backend",
        }
    }))
}

async fn ingest_receipt(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart, "file").await {
        Ok(Some(upload)) => upload,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "No file provided"),
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match ingest(upload, &state.caps, &state.config).await {
        Ok(output) => (StatusCode::CREATED, Json(output)).into_response(),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, &e.to_string())
        }
    }
}

async fn ocr_image(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart, "image").await {
        Ok(Some(upload)) => upload,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "No image file provided"),
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = tokio::time::timeout(
        state.config.ocr_timeout(),
        state.caps.ocr.extract_text(&upload.bytes),
    )
    .await;

    match result {
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("OCR timed out after {}s", state.config.ocr_timeout_secs),
        ),
        Ok(Err(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("OCR failed: {e:#}"))
        }
        Ok(Ok(text)) => Json(json!({
            "success": true,
            "filename": upload.original_name,
            "text": text,
        }))
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    text: String,
}

async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    if request.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Text field is required");
    }

    let prompt = prompts::render_prompt(state.config.prompt_template.as_deref(), &request.text);
    let result = tokio::time::timeout(
        state.config.extract_timeout(),
        state.caps.extractor.analyze(&prompt),
    )
    .await;

    match result {
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!(
                "extraction timed out after {}s",
                state.config.extract_timeout_secs
            ),
        ),
        Ok(Err(e)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Analysis failed: {e:#}"),
        ),
        Ok(Ok(analysis)) => Json(json!({
            "success": true,
            "analysis": analysis,
            "error": "",
        }))
        .into_response(),
    }
}

/// Pull the named file field out of a multipart body.
///
/// `Ok(None)` means the field was absent; `Err` carries a malformed-body
/// message. Both map to 400 at the call sites.
async fn read_upload(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<UploadedFile>, String> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| format!("invalid multipart body: {e}"))?;
        let Some(field) = field else {
            return Ok(None);
        };
        if field.name() != Some(field_name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("failed to read upload: {e}"))?;

        return Ok(Some(UploadedFile {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
