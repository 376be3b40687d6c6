use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::frontier::Frontier;
use super::protocol::{
    BarrelsResponse, EnqueueResponse, IndexUrlRequest, LinkedParams, PopResponse,
    QueueUrlRequest, RegisterBarrelRequest, RegisterBarrelResponse, SearchParams,
    SearchResultsResponse, UnsubscribeResponse,
};
use super::service::GatewayService;

pub async fn handle_index_url(
    Extension(frontier): Extension<Arc<Frontier>>,
    Json(req): Json<IndexUrlRequest>,
) -> Json<EnqueueResponse> {
    let queued = frontier.client_index_url(&req.url);
    Json(EnqueueResponse { queued })
}

pub async fn handle_queue_url(
    Extension(frontier): Extension<Arc<Frontier>>,
    Json(req): Json<QueueUrlRequest>,
) -> Json<EnqueueResponse> {
    let queued = frontier.queue_discovered(&req.url);
    Json(EnqueueResponse { queued })
}

/// Blocking dequeue: this handler suspends until a url is available. There
/// is no server-side timeout; only the caller's transport can bound the wait.
pub async fn handle_popqueue(
    Extension(frontier): Extension<Arc<Frontier>>,
) -> Json<PopResponse> {
    let url = frontier.pop().await;
    Json(PopResponse { url })
}

pub async fn handle_search(
    Extension(service): Extension<Arc<GatewayService>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResultsResponse> {
    let urls = service.return_pages_by_words(&params.q).await;
    Json(SearchResultsResponse { urls })
}

pub async fn handle_linked(
    Extension(service): Extension<Arc<GatewayService>>,
    Query(params): Query<LinkedParams>,
) -> Json<SearchResultsResponse> {
    let urls = service.return_linked_urls(&params.url).await;
    Json(SearchResultsResponse { urls })
}

pub async fn handle_register_barrel(
    Extension(service): Extension<Arc<GatewayService>>,
    Json(req): Json<RegisterBarrelRequest>,
) -> (StatusCode, Json<RegisterBarrelResponse>) {
    match service.register_ibs(req.id, req.endpoint).await {
        Ok(()) => (StatusCode::OK, Json(RegisterBarrelResponse { accepted: true })),
        Err(e) => {
            tracing::warn!("Registration of barrel {} rejected: {}", req.id, e);
            (
                StatusCode::CONFLICT,
                Json(RegisterBarrelResponse { accepted: false }),
            )
        }
    }
}

pub async fn handle_unsubscribe_barrel(
    Extension(service): Extension<Arc<GatewayService>>,
    Path(id): Path<u32>,
) -> Json<UnsubscribeResponse> {
    let removed = service.unsubscribe_ibs(id);
    Json(UnsubscribeResponse { removed })
}

pub async fn handle_get_barrels(
    Extension(service): Extension<Arc<GatewayService>>,
) -> Json<BarrelsResponse> {
    Json(BarrelsResponse {
        barrels: service.get_barrels(),
    })
}
