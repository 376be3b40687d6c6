use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::protocol::{
    LinkedRequest, LinkedResponse, PingParams, RegisterPeerRequest, RegisterPeerResponse,
    SearchRequest, SearchResponse, StateSnapshot, StoreResponse,
};
use super::service::Barrel;
use crate::site::RecordEnvelope;

pub async fn handle_store(
    Extension(barrel): Extension<Arc<Barrel>>,
    Json(envelope): Json<RecordEnvelope>,
) -> (StatusCode, Json<StoreResponse>) {
    if barrel.store_record(envelope).await {
        (StatusCode::OK, Json(StoreResponse { accepted: true }))
    } else {
        (StatusCode::BAD_REQUEST, Json(StoreResponse { accepted: false }))
    }
}

pub async fn handle_search(
    Extension(barrel): Extension<Arc<Barrel>>,
    Json(req): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let urls = barrel.state.search_pages_by_words(&req.words);
    Json(SearchResponse { urls })
}

pub async fn handle_linked(
    Extension(barrel): Extension<Arc<Barrel>>,
    Json(req): Json<LinkedRequest>,
) -> Json<LinkedResponse> {
    let urls = barrel.state.incoming_links_for_url(&req.url);
    Json(LinkedResponse { urls })
}

/// Liveness probe. Always succeeds if the process is alive.
pub async fn handle_ping(
    Extension(barrel): Extension<Arc<Barrel>>,
    Query(params): Query<PingParams>,
) -> StatusCode {
    let from = params.from.unwrap_or_else(|| "unknown".to_string());
    tracing::debug!("[barrel {}] {}: pong", barrel.id, from);
    StatusCode::OK
}

/// Full-state dump, used only for join-time peer sync.
pub async fn handle_snapshot(Extension(barrel): Extension<Arc<Barrel>>) -> Json<StateSnapshot> {
    Json(barrel.state.snapshot())
}

pub async fn handle_register_peer(
    Extension(barrel): Extension<Arc<Barrel>>,
    Json(req): Json<RegisterPeerRequest>,
) -> (StatusCode, Json<RegisterPeerResponse>) {
    let accepted = barrel.register_peer(req.id, req.endpoint);
    (StatusCode::OK, Json(RegisterPeerResponse { accepted }))
}
