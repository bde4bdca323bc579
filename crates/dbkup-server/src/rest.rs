use crate::types::*;
use axum::{
    Router,
    extract::{Json, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use dbkup_core::{BackupEntry, DumpReport, DumpRequest, Error, Row, TableInfo};
use dbkup_dump::{DumpOrchestrator, PreviewReader};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DumpOrchestrator>,
    pub preview: Arc<PreviewReader>,
}

pub fn create_router(orchestrator: Arc<DumpOrchestrator>, preview: Arc<PreviewReader>) -> Router {
    let state = AppState {
        orchestrator,
        preview,
    };

    Router::new()
        .route("/health", get(health_check))
        // API endpoints
        .route("/api/v1/tables", get(list_tables))
        .route("/api/v1/tables/:name/preview", get(preview_table))
        .route("/api/v1/dumps", get(list_dumps).post(create_dump))
        .route("/api/v1/dumps/:file", get(read_dump))
        // Middleware layers (applied in reverse order)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(router: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

/// Health check endpoint - returns OK if the service is running
async fn health_check() -> impl IntoResponse {
    tracing::debug!("Health check requested");
    Json(HealthResponse::ok())
}

async fn list_tables(State(state): State<AppState>) -> Result<Json<Vec<TableInfo>>, AppError> {
    Ok(Json(state.preview.list_tables().await?))
}

async fn preview_table(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Row>>, AppError> {
    Ok(Json(state.preview.preview_table(&name).await?))
}

async fn create_dump(
    State(state): State<AppState>,
    Json(req): Json<DumpRequest>,
) -> Result<(StatusCode, Json<DumpReport>), AppError> {
    if req.tables.is_empty() {
        return Err(AppError::BadRequest("No tables selected".to_string()));
    }

    let report = state.orchestrator.run(&req).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn list_dumps(State(state): State<AppState>) -> Result<Json<Vec<BackupEntry>>, AppError> {
    Ok(Json(state.preview.list_dumps().await?))
}

async fn read_dump(
    Path(file): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    match state.preview.read_dump_file(&file).await? {
        Some(contents) => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            contents,
        )
            .into_response()),
        None => Err(AppError::NotFound(format!("Backup file not found: {}", file))),
    }
}

// Error handling
pub enum AppError {
    Core(Error),
    BadRequest(String),
    NotFound(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Core(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Core(err) if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Core(err @ Error::BackupExists(_)) => (StatusCode::CONFLICT, err.to_string()),
            AppError::Core(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
