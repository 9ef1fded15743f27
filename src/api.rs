//! HTTP surface for medlit.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /search` – Search PubMed, resolve each hit to PMC full text or its abstract, and return
//!   `{ "pubmed": [...] }` with a bounded summary per paper. Accepts `query` (required) and
//!   `max_results` (optional).
//! - `GET /` – Liveness probe.
//! - `GET /metrics` – Observe query and resolution counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The CLI `search` subcommand runs the same pipeline, so behavior is identical across interfaces.

use crate::metrics::MetricsSnapshot;
use crate::search::{Query, SearchApi, SearchError, SearchResponse};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the search API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SearchApi + 'static,
{
    Router::new()
        .route("/", get(health))
        .route("/search", post(search_papers::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /search` endpoint.
#[derive(Deserialize)]
struct SearchRequest {
    /// Free-text PubMed query.
    #[serde(default)]
    query: Option<String>,
    /// Optional cap on the number of papers (defaults to `SEARCH_DEFAULT_MAX_RESULTS`).
    #[serde(default)]
    max_results: Option<usize>,
}

/// Search PubMed and summarize each resolved paper.
///
/// Individual papers that fail are left out of the list; only a failed identifier search turns
/// into an error response.
async fn search_papers<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: SearchApi,
{
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let text = request
        .query
        .filter(|query| !query.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Query is required".into()))?;
    let max_results = request
        .max_results
        .unwrap_or_else(|| service.default_max_results());

    let pubmed = service.search(Query::new(text, max_results)).await?;
    tracing::info!(papers = pubmed.len(), "Search request completed");
    Ok(Json(SearchResponse { pubmed }))
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is working well" }))
}

/// Return the search counters accumulated since startup.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SearchApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Search PubMed, resolve open-access full text or the abstract, and summarize each paper. Response returns { \"pubmed\": [ { source, title, authors, publication_date, url, full_text_snippet, summary } ] }.",
                request_example: Some(json!({
                    "query": "sepsis lactate",
                    "max_results": 5
                })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/",
                description: "Liveness probe.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return query, resolution and summarization counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Search(SearchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Search(error @ SearchError::InvalidQuery(_)) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Search(error @ SearchError::UpstreamUnavailable(_)) => {
                tracing::error!(error = %error, "Search request failed");
                (StatusCode::BAD_GATEWAY, error.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}
