use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use mailassist_agent::{EmailAssistant, EmailInput, EmailResponse, IngestResponse};
use mailassist_rag::IngestionPipeline;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::quota::DailyQuota;

const EMPTY_BODY_MESSAGE: &str = "Email body cannot be empty.";

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<EmailAssistant>,
    pub pipeline: Arc<IngestionPipeline>,
    pub quota: Arc<DailyQuota>,
    /// Reported in quota errors.
    pub model: String,
}

impl AppState {
    pub fn new(
        assistant: Arc<EmailAssistant>,
        pipeline: Arc<IngestionPipeline>,
        quota: DailyQuota,
        model: impl Into<String>,
    ) -> Self {
        Self { assistant, pipeline, quota: Arc::new(quota), model: model.into() }
    }
}

pub fn app_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ui", get(ui))
        .route("/ingest", post(ingest))
        .route("/process-email", post(process_email))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn run_server(addr: &str, state: AppState, cors_origins: &[String]) -> anyhow::Result<()> {
    let addr: SocketAddr = addr.parse().with_context(|| format!("invalid bind address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mailassist listening on http://{}", addr);

    axum::serve(listener, app_router(state, cors_origins))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failure")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

async fn index() -> impl IntoResponse {
    Json(json!({ "message": "AI Email Assistant API is active." }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn ui() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

/// Start re-indexing in the background and acknowledge immediately.
async fn ingest(State(state): State<AppState>) -> Json<IngestResponse> {
    let pipeline = state.pipeline.clone();
    tokio::spawn(
        async move {
            let report = pipeline.run().await;
            if report.is_success() {
                info!(
                    documents = report.documents_processed,
                    chunk_count = report.chunks_created,
                    "background ingestion complete"
                );
            } else {
                warn!(message = %report.message, "background ingestion did not complete");
            }
        }
        .instrument(info_span!("ingest")),
    );
    Json(IngestResponse::started())
}

async fn process_email(
    State(state): State<AppState>,
    Json(email): Json<EmailInput>,
) -> Result<Json<EmailResponse>, ApiError> {
    if email.body.trim().is_empty() {
        return Err(ApiError::BadRequest(EMPTY_BODY_MESSAGE.to_string()));
    }
    if !state.quota.try_acquire().await {
        warn!(limit = state.quota.limit(), "daily request quota exhausted");
        return Err(ApiError::QuotaExceeded { limit: state.quota.limit(), model: state.model.clone() });
    }

    let span = info_span!("process_email", request.id = %Uuid::new_v4());
    let assistant = state.assistant.clone();
    let content = email.to_content();

    // a panic inside processing surfaces here as a JoinError
    let response = tokio::spawn(async move { assistant.process_email(&content).await }.instrument(span))
        .await
        .map_err(|e| ApiError::Internal(format!("Error processing email: {e}")))?;

    Ok(Json(response))
}
