//! Request handlers and API response envelopes.
//!
//! Every response is wrapped in `{status, data}` on success or
//! `{status, error: {message, type}}` on failure. Errors appear inline next
//! to the statement or file that caused them; the session stays usable.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::ingest::{self, IngestOutcome, UploadedFile};
use crate::render::batch_to_json_rows;
use crate::runner::{self, StatementResult};
use crate::session::Session;
use crate::{schema as schema_browser, web::AppState};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

// ============================================================================
// Response envelopes
// ============================================================================

/// Successful API response.
#[derive(Debug, Serialize)]
pub(crate) struct ApiSuccess<T> {
    status: String,
    data: T,
}

impl<T> ApiSuccess<T> {
    fn new(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// Error API response.
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

/// Error type returned by every handler.
pub(crate) struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message: message.into(),
                    error_type: error_type.to_string(),
                },
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", message)
    }

    fn session_not_found(session_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "SessionNotFound",
            format!("Session '{session_id}' does not exist"),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<Error> for ApiErrorResponse {
    fn from(err: Error) -> Self {
        match &err {
            Error::Ingest(_) | Error::Query(_) => {
                ApiErrorResponse::new(StatusCode::BAD_REQUEST, "EngineError", err.to_string())
            }
            Error::Io(_) => ApiErrorResponse::internal(err.to_string()),
        }
    }
}

// ============================================================================
// Request/response bodies
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadEntry {
    file_name: String,
    /// "registered", "skipped", or "failed"
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<IngestOutcome> for UploadEntry {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Registered { file, table, rows } => UploadEntry {
                file_name: file,
                status: "registered",
                table_name: Some(table),
                rows: Some(rows),
                error: None,
            },
            IngestOutcome::Skipped { file } => UploadEntry {
                file_name: file,
                status: "skipped",
                table_name: None,
                rows: None,
                error: None,
            },
            IngestOutcome::Failed { file, error } => UploadEntry {
                file_name: file,
                status: "failed",
                table_name: None,
                rows: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SqlRequest {
    query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatementBody {
    sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<StatementResult> for StatementBody {
    fn from(result: StatementResult) -> Self {
        let row_count = result.row_count();
        match result.outcome {
            Ok(batches) => {
                let columns = batches
                    .first()
                    .map(|batch| {
                        batch
                            .schema()
                            .fields()
                            .iter()
                            .map(|f| f.name().clone())
                            .collect()
                    })
                    .unwrap_or_default();
                let rows = batches.iter().flat_map(batch_to_json_rows).collect();
                StatementBody {
                    sql: result.sql,
                    columns: Some(columns),
                    rows: Some(rows),
                    row_count: Some(row_count),
                    error: None,
                }
            }
            Err(error) => StatementBody {
                sql: result.sql,
                columns: None,
                rows: None,
                row_count: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SqlResponse {
    statements: Vec<StatementBody>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchemaResponse {
    outline: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditorResponse {
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: String,
    version: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - bundled single-page UI.
pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api/v1/health - health check.
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/v1/sessions - create a new session.
pub(crate) async fn create_session(
    State(state): State<AppState>,
) -> Json<ApiSuccess<SessionCreated>> {
    let session_id = state.sessions.create();
    Json(ApiSuccess::new(SessionCreated { session_id }))
}

/// DELETE /api/v1/sessions/:id - tear down a session and its tables.
pub(crate) async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiSuccess<()>>, ApiErrorResponse> {
    if state.sessions.remove(&session_id) {
        Ok(Json(ApiSuccess::new(())))
    } else {
        Err(ApiErrorResponse::session_not_found(&session_id))
    }
}

/// POST /api/v1/sessions/:id/upload - register uploaded files as tables.
pub(crate) async fn upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiSuccess<Vec<UploadEntry>>>, ApiErrorResponse> {
    // Read the whole multipart body before taking the session lock; the
    // guard must not be held across an await point.
    let files = collect_uploads(multipart, state.upload_limit_bytes).await?;
    info!(session = %session_id, files = files.len(), "upload received");

    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();

    let conn = session.connection()?;
    let entries: Vec<UploadEntry> = ingest::ingest(conn, &files)
        .into_iter()
        .map(UploadEntry::from)
        .collect();

    Ok(Json(ApiSuccess::new(entries)))
}

/// POST /api/v1/sessions/:id/sample - load the bundled sample dataset.
pub(crate) async fn load_sample(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiSuccess<UploadEntry>>, ApiErrorResponse> {
    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();

    let conn = session.connection()?;
    let outcome = ingest::load_sample(conn).map_err(Error::from)?;

    Ok(Json(ApiSuccess::new(UploadEntry::from(outcome))))
}

/// POST /api/v1/sessions/:id/sql - run statements, one outcome each.
pub(crate) async fn run_sql(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SqlRequest>,
) -> Result<Json<ApiSuccess<SqlResponse>>, ApiErrorResponse> {
    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();
    session.set_editor_text(request.query.clone());

    let conn = session.connection()?;
    let statements: Vec<StatementBody> = runner::run(conn, &request.query)
        .into_iter()
        .map(StatementBody::from)
        .collect();

    info!(
        session = %session_id,
        statements = statements.len(),
        "executed sql submission"
    );
    Ok(Json(ApiSuccess::new(SqlResponse { statements })))
}

/// GET /api/v1/sessions/:id/schema - textual outline of the catalog.
pub(crate) async fn schema(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiSuccess<SchemaResponse>>, ApiErrorResponse> {
    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();

    let conn = session.connection()?;
    let outline = schema_browser::describe_all(conn)?;

    Ok(Json(ApiSuccess::new(SchemaResponse { outline })))
}

/// GET /api/v1/sessions/:id/editor - current editor text.
pub(crate) async fn editor(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiSuccess<EditorResponse>>, ApiErrorResponse> {
    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();

    Ok(Json(ApiSuccess::new(EditorResponse {
        text: session.editor_text().to_string(),
    })))
}

/// POST /api/v1/sessions/:id/reset - drop the connection, clear the editor.
pub(crate) async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiSuccess<()>>, ApiErrorResponse> {
    let handle = lookup(&state, &session_id)?;
    let mut session = lock(&handle)?;
    session.touch();
    session.reset();

    info!(session = %session_id, "session reset");
    Ok(Json(ApiSuccess::new(())))
}

// ============================================================================
// Helpers
// ============================================================================

fn lookup(state: &AppState, session_id: &str) -> Result<Arc<Mutex<Session>>, ApiErrorResponse> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| ApiErrorResponse::session_not_found(session_id))
}

fn lock(handle: &Arc<Mutex<Session>>) -> Result<MutexGuard<'_, Session>, ApiErrorResponse> {
    handle
        .lock()
        .map_err(|_| ApiErrorResponse::internal("session state poisoned"))
}

/// Drain the multipart body into (filename, bytes) pairs.
async fn collect_uploads(
    mut multipart: Multipart,
    upload_limit_bytes: usize,
) -> Result<Vec<UploadedFile>, ApiErrorResponse> {
    let upload_limit_mb = upload_limit_bytes / 1024 / 1024;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_str = e.to_string().to_lowercase();
        if err_str.contains("length limit") || err_str.contains("body limit") {
            ApiErrorResponse::bad_request(format!(
                "File too large. Maximum upload size is {upload_limit_mb} MB."
            ))
        } else {
            ApiErrorResponse::bad_request(format!("Failed to read multipart field: {e}"))
        }
    })? {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            // Non-file fields are not part of the upload contract.
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiErrorResponse::bad_request(format!("Failed to read file data: {e}")))?;
        files.push(UploadedFile::new(file_name, bytes.to_vec()));
    }

    Ok(files)
}
