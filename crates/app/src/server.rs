use crate::config::DynPipeline;
use crate::matching;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use researcher_match_core::{
    MatchingStore, PipelineOptions, SearchError, SearchRequest, SearchResult, StoreError,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Headroom over the pipeline's worst case for routing and serialization.
pub const REQUEST_DEADLINE_SLACK: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DynPipeline>,
    /// Absent when no database is configured.
    pub store: Option<Arc<dyn MatchingStore>>,
}

impl AppState {
    pub fn store(&self) -> Result<&dyn MatchingStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::StoreUnavailable)
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    /// Allowed browser origins; empty means any origin.
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

/// Whole-request deadline for a pipeline running with `options`.
///
/// Without an explicit deadline this is the pipeline's worst case plus
/// [`REQUEST_DEADLINE_SLACK`]. An explicit deadline below that is rejected,
/// since it would cut off searches the pipeline is still allowed to finish.
pub fn request_deadline(
    options: &PipelineOptions,
    requested: Option<Duration>,
) -> anyhow::Result<Duration> {
    let required = options.worst_case_duration().saturating_add(REQUEST_DEADLINE_SLACK);
    match requested {
        None => Ok(required),
        Some(deadline) if deadline >= required => Ok(deadline),
        Some(deadline) => anyhow::bail!(
            "request timeout of {}s is shorter than the {}s a search may take; \
             raise it or lower the max top_k or provider timeout",
            deadline.as_secs(),
            required.as_secs()
        ),
    }
}

pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .map_err(|error| anyhow::anyhow!("invalid CORS origin {origin:?}: {error}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

pub fn router(state: AppState, cors: CorsLayer, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/search_researchers", post(search_researchers))
        .route("/researchers", get(matching::list_researchers))
        .route("/search-researcher", get(matching::search_researcher))
        .route("/matching-information", get(matching::matching_information))
        .route("/matching-id/{matching_id}", get(matching::matching_by_id))
        .route("/matching-status/{matching_id}", patch(matching::update_matching_status))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, settings: ServerSettings) -> anyhow::Result<()> {
    let cors = cors_layer(&settings.cors_origins)?;
    let app = router(state, cors, settings.request_timeout);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    info!(
        bind_addr = %settings.bind_addr,
        request_timeout_secs = settings.request_timeout.as_secs(),
        "researcher-match server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "researcher-match",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// POST /search_researchers - ranked researchers with match explanations.
async fn search_researchers(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = state.pipeline.search_researchers(&request).await?;
    Ok(Json(results))
}

#[derive(Debug)]
pub enum ApiError {
    Search(SearchError),
    Store(StoreError),
    BadRequest(String),
    NotFound(String),
    StoreUnavailable,
}

impl From<SearchError> for ApiError {
    fn from(error: SearchError) -> Self {
        Self::Search(error)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Search(SearchError::InvalidRequest(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Search(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Search(error) => error.to_string(),
            ApiError::Store(error) => error.to_string(),
            ApiError::BadRequest(message) | ApiError::NotFound(message) => message.clone(),
            ApiError::StoreUnavailable => "matching store is not configured".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }
        (status, Json(json!({"error": message}))).into_response()
    }
}
