//! HTTP surface of the gateway.
//!
//! | Route | Pipeline call |
//! |-------|---------------|
//! | `GET /health`, `GET /sources` | registry listing |
//! | `GET /search?q=&source=` | [`Pipeline::search`] |
//! | `POST /anime` | [`Pipeline::anime`] |
//! | `POST /episodes` | [`Pipeline::episodes`] |
//! | `POST /video` | [`Pipeline::video`] |
//!
//! Errors are always JSON: `{"error": "..."}`, plus `"available"` for an
//! unknown source.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::error::{GatewayError, Result};
use crate::model::{Episode, SearchResult, Stream};
use crate::pipeline::Pipeline;
use crate::registry::SourceRegistry;

/// Source used when a request does not name one.
pub const DEFAULT_SOURCE: &str = "animego";

/// Build the axum Router with all endpoints.
pub fn router(registry: Arc<SourceRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/sources", get(sources))
        .route("/search", get(search))
        .route("/anime", post(anime))
        .route("/episodes", post(episodes))
        .route("/video", post(video))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Serve the gateway on all interfaces at `port` until Ctrl-C.
pub async fn serve(port: u16, registry: Arc<SourceRegistry>) -> anyhow::Result<()> {
    let app = router(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ── Request and response bodies ─────────────────────────────────

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default = "default_source")]
    source: String,
}

#[derive(Debug, Deserialize)]
struct AnimeRequest {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct EpisodesRequest {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    anime_index: i64,
}

#[derive(Debug, Deserialize)]
struct VideoRequest {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    anime_index: i64,
    #[serde(default)]
    episode_index: i64,
}

#[derive(Debug, Serialize)]
struct SearchResultBody {
    id: String,
    title: String,
    source: String,
    #[serde(rename = "_raw_index")]
    raw_index: usize,
}

impl SearchResultBody {
    fn new(result: &SearchResult, source: &str) -> Self {
        Self {
            id: result.position.to_string(),
            title: result.title.clone(),
            source: source.to_string(),
            raw_index: result.position,
        }
    }
}

#[derive(Debug, Serialize)]
struct EpisodeBody {
    id: String,
    number: usize,
    title: String,
    #[serde(rename = "_raw_index")]
    raw_index: usize,
}

impl From<&Episode> for EpisodeBody {
    fn from(episode: &Episode) -> Self {
        Self {
            id: episode.position.to_string(),
            number: episode.number,
            title: episode.label.clone(),
            raw_index: episode.position,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<SearchResultBody>,
}

#[derive(Debug, Serialize)]
struct AnimeResponse {
    title: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct EpisodesResponse {
    episodes: Vec<EpisodeBody>,
}

#[derive(Debug, Serialize)]
struct VideoResponse {
    videos: Vec<Stream>,
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::invalid_input(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::invalid_input(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            GatewayError::InvalidSource { available, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "available": available }),
            ),
            GatewayError::Backend(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
            GatewayError::InvalidInput(_) | GatewayError::IndexOutOfRange { .. } => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
        };

        if self.is_client_error() {
            debug!(kind = self.kind(), "Rejected request: {message}");
        } else {
            error!(kind = self.kind(), "Backend fault: {message}");
        }
        (status, Json(body)).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(registry): State<Arc<SourceRegistry>>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "sources": registry.names() }))
}

async fn sources(State(registry): State<Arc<SourceRegistry>>) -> Json<serde_json::Value> {
    Json(json!({ "sources": registry.names() }))
}

async fn search(
    State(registry): State<Arc<SourceRegistry>>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = params?;
    let results = Pipeline::new(&registry)
        .search(&params.source, &params.q)
        .await?;
    Ok(Json(SearchResponse {
        results: results
            .iter()
            .map(|r| SearchResultBody::new(r, &params.source))
            .collect(),
    }))
}

async fn anime(
    State(registry): State<Arc<SourceRegistry>>,
    body: std::result::Result<Json<AnimeRequest>, JsonRejection>,
) -> Result<Json<AnimeResponse>> {
    let Json(req) = body?;
    let title = Pipeline::new(&registry)
        .anime(&req.source, &req.query, req.index)
        .await?;
    Ok(Json(AnimeResponse {
        title: title.name,
        source: req.source,
    }))
}

async fn episodes(
    State(registry): State<Arc<SourceRegistry>>,
    body: std::result::Result<Json<EpisodesRequest>, JsonRejection>,
) -> Result<Json<EpisodesResponse>> {
    let Json(req) = body?;
    let episodes = Pipeline::new(&registry)
        .episodes(&req.source, &req.query, req.anime_index)
        .await?;
    Ok(Json(EpisodesResponse {
        episodes: episodes.iter().map(EpisodeBody::from).collect(),
    }))
}

async fn video(
    State(registry): State<Arc<SourceRegistry>>,
    body: std::result::Result<Json<VideoRequest>, JsonRejection>,
) -> Result<Json<VideoResponse>> {
    let Json(req) = body?;
    let videos = Pipeline::new(&registry)
        .video(&req.source, &req.query, req.anime_index, req.episode_index)
        .await?;
    Ok(Json(VideoResponse { videos }))
}
