use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use crate::config::{SearchConfig, ServerConfig};
use crate::error::RetrievalError;
use crate::retrieval::{IndexInfo, RetrievalPipeline, SearchHit};
use crate::storage::Document;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RetrievalPipeline>,
    search: SearchConfig,
}

impl AppState {
    pub fn new(pipeline: Arc<RetrievalPipeline>, search: SearchConfig) -> Self {
        Self { pipeline, search }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentsResponse {
    pub status: String,
    pub accepted_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_embedding: Vec<f32>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Builds the service router: `/add-documents`, `/search`, `/info`, `/health`.
///
/// Request bodies may be up to `server.max_body_bytes`; a 768-d document
/// serializes to roughly 15 KiB of JSON.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/add-documents", post(add_documents))
        .route("/search", post(search))
        .route("/info", get(info))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if server.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn add_documents(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Document>>, JsonRejection>,
) -> Result<Json<AddDocumentsResponse>, ApiError> {
    let Json(documents) = payload?;

    // Lock wait, validation and the journal fsync all block
    let pipeline = Arc::clone(&state.pipeline);
    let receipt = tokio::task::spawn_blocking(move || pipeline.ingest(documents)).await??;

    Ok(Json(AddDocumentsResponse {
        status: "success".to_string(),
        accepted_count: receipt.accepted,
    }))
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;

    let top_k = request.top_k.unwrap_or(state.search.top_k);
    if top_k > state.search.max_top_k {
        return Err(RetrievalError::invalid_request(format!(
            "top_k {top_k} exceeds the maximum of {}",
            state.search.max_top_k
        ))
        .into());
    }
    let threshold = request.threshold.unwrap_or(state.search.threshold);

    // Exact search scans every stored vector
    let pipeline = Arc::clone(&state.pipeline);
    let results = tokio::task::spawn_blocking(move || {
        pipeline.search(&request.query_embedding, top_k, threshold)
    })
    .await??;
    Ok(Json(SearchResponse { results }))
}

async fn info(State(state): State<AppState>) -> Json<IndexInfo> {
    Json(state.pipeline.describe())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
