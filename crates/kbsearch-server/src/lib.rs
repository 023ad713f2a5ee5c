//! HTTP surface for the knowledge base search engine.
//!
//! # Endpoints
//!
//! - `GET /` - Health summary
//! - `POST /search` - Search with a JSON body `{ "query": ..., "top_k": 3 }`
//! - `GET /query/?query=...&top_k=3` - Same search via query parameters
//! - `GET /stats` - Corpus and index statistics

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kbsearch_core::types::Stats;
use kbsearch_core::Error;
use kbsearch_engine::{SearchAnswer, SearchEngine};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

/// Shared application state. The engine is an immutable snapshot, so
/// handlers read it concurrently without locking.
pub struct AppState {
    pub engine: SearchEngine,
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(engine: SearchEngine, default_top_k: usize) -> Self { Self { engine, default_top_k } }
}

/// Search request body
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,

    /// Number of chunks to retrieve (server default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub message: String,
    pub status: String,
    pub docs_loaded: usize,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    pub search: String,
    pub query: String,
    pub stats: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Maps the domain taxonomy onto status codes: bad requests are 400,
/// everything else is an internal failure.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
        if status.is_server_error() {
            tracing::error!("error processing query: {}", self.0);
        }
        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}

/// GET / - Health check
async fn home(State(state): State<Arc<AppState>>) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Knowledge Base Search Engine API".to_string(),
        status: "running".to_string(),
        docs_loaded: state.engine.corpus().len(),
        endpoints: Endpoints {
            search: "/search (POST)".to_string(),
            query: "/query/ (GET)".to_string(),
            stats: "/stats (GET)".to_string(),
        },
    })
}

/// POST /search
async fn search_post(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchAnswer>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(Error::InvalidInput("Query is required".to_string()).into());
    }
    tracing::info!(query = %request.query, "received POST query");
    let top_k = request.top_k.unwrap_or(state.default_top_k);
    run_search(state, request.query, top_k).await
}

/// GET /query/
async fn query_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<SearchAnswer>, ApiError> {
    let query = params.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("Query parameter is required".to_string()).into());
    }
    tracing::info!(query = %query, "received GET query");
    let top_k = params.top_k.unwrap_or(state.default_top_k);
    run_search(state, query, top_k).await
}

/// GET /stats
async fn stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.engine.stats())
}

/// Embedding is CPU-bound, so retrieval runs off the async workers.
async fn run_search(state: Arc<AppState>, query: String, top_k: usize) -> Result<Json<SearchAnswer>, ApiError> {
    let engine = state.engine.clone();
    let answer = tokio::task::spawn_blocking(move || engine.search(&query, top_k))
        .await
        .map_err(|e| Error::Operation(format!("search task failed: {e}")))??;
    Ok(Json(answer))
}

/// Create the axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/search", post(search_post))
        .route("/query/", get(query_get))
        .route("/query", get(query_get))
        .route("/stats", get(stats))
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    tracing::info!("starting knowledge base search server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
