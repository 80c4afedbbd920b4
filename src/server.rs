//! HTTP API for document ingestion and question answering.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/process-pdf` | Upload a PDF and build its semantic index |
//! | `POST` | `/query` | Ask a question against a processed document |
//! | `GET`  | `/documents` | List processed document ids |
//! | `DELETE` | `/documents/{id}` | Delete a document and its artifacts |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/` | Service banner |
//!
//! # Error Contract
//!
//! All error responses share one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `provider_auth` (401), `not_found` (404),
//! `provider_quota` (429), `internal` (500), `provider_unavailable` (503).
//! Provider failures map from their classified [`PipelineError`] kind; the
//! message is never parsed to decide the status. Extraction and artifact
//! failures are `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::DocumentPipeline;
use crate::query::SourceChunk;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: Arc<DocumentPipeline>,
}

/// Build the application router. Exposed separately from [`run_server`] so
/// tests can serve it on an ephemeral port.
pub fn build_router(config: Arc<Config>, pipeline: Arc<DocumentPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/process-pdf", post(handle_process_pdf))
        .route("/query", post(handle_query))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{id}", delete(handle_delete_document))
        .layer(cors)
        .with_state(AppState { config, pipeline })
}

/// Start the HTTP server on the address configured in `[server].bind` and
/// run until the process is terminated.
pub async fn run_server(config: Config, pipeline: Arc<DocumentPipeline>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(Arc::new(config), pipeline);

    info!(addr = %bind_addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (status, code) = match &err {
            PipelineError::ProviderAuth(_) => (StatusCode::UNAUTHORIZED, "provider_auth"),
            PipelineError::ProviderQuota(_) => (StatusCode::TOO_MANY_REQUESTS, "provider_quota"),
            PipelineError::ProviderService(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "provider_unavailable")
            }
            PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            PipelineError::Extraction(_)
            | PipelineError::IndexMissing(_)
            | PipelineError::Io(_)
            | PipelineError::Build(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            error!(error = %err, "request failed");
        }

        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Document QA API is running".to_string(),
    })
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /process-pdf ============

/// JSON response body for a successful upload.
#[derive(Serialize)]
struct ProcessResponse {
    message: String,
    filename: String,
    chunk_count: usize,
    status: String,
}

/// Handler for `POST /process-pdf`.
///
/// Accepts a multipart form with a `file` field holding a PDF. The upload is
/// saved under the configured upload directory and run through the full
/// ingestion pipeline; the response is only sent once the document is
/// queryable.
async fn handle_process_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(sanitize_filename)
            .ok_or_else(|| bad_request("file field must carry a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(bad_request("multipart form must include a 'file' field"));
    };

    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(bad_request("only PDF files are supported"));
    }

    let upload_dir = &state.config.storage.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(PipelineError::from)?;
    let source_path = upload_dir.join(&filename);
    tokio::fs::write(&source_path, &bytes)
        .await
        .map_err(PipelineError::from)?;

    info!(filename = %filename, bytes = bytes.len(), "received upload");
    let record = state.pipeline.process(&source_path, &filename).await?;

    Ok(Json(ProcessResponse {
        message: "PDF processed successfully".to_string(),
        filename,
        chunk_count: record.chunk_count,
        status: "ready".to_string(),
    }))
}

/// Strip any path components a client might smuggle into the filename.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
}

// ============ POST /query ============

/// JSON request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    /// Target document id; defaults to the most recently processed one.
    filename: Option<String>,
}

/// JSON response body for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    question: String,
    answer: String,
    sources: Vec<SourceChunk>,
    filename: String,
}

/// Handler for `POST /query`.
///
/// Validates the question, resolves the target document, and runs retrieval
/// plus generation. Provider failures surface with their mapped status
/// (401 / 429 / 503) rather than a generic 500.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let result = state
        .pipeline
        .query(question, request.filename.as_deref())
        .await?;

    Ok(Json(QueryResponse {
        question: question.to_string(),
        answer: result.answer,
        sources: result.sources,
        filename: result.document_id,
    }))
}

// ============ GET /documents and DELETE /documents/{id} ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.pipeline.list().await?;
    Ok(Json(DocumentListResponse { documents }))
}

#[derive(Serialize)]
struct DeleteResponse {
    message: String,
    filename: String,
}

/// Handler for `DELETE /documents/{id}`.
///
/// Removes the registry record plus both on-disk artifacts. Unknown ids are
/// a 404; artifacts already missing from disk do not fail the request.
async fn handle_delete_document(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.pipeline.delete(&id).await?;
    if !deleted {
        return Err(AppError::from(PipelineError::NotFound(id)));
    }

    Ok(Json(DeleteResponse {
        message: "document deleted".to_string(),
        filename: id,
    }))
}
