use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{WatchNextRequest, WatchNextResponse},
    routes::AppState,
    services::watch_next,
};

/// Handler for the watch-next endpoint
///
/// The run is cancelled once `resolve_timeout` elapses; whatever chains were
/// finished by then are returned with `stats.cancelled` set.
pub async fn watch_next(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<WatchNextRequest>,
) -> AppResult<Json<WatchNextResponse>> {
    tracing::info!(
        request_id = %request_id,
        quota = request.quota,
        consumed_count = request.consumed_ids.len(),
        "Processing watch-next request"
    );

    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        let timeout = state.resolve_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let result = watch_next::watch_next(
        state.catalog.as_ref(),
        state.provider.as_ref(),
        request,
        cancel,
    )
    .await;
    timer.abort();

    let response = result?;

    tracing::info!(
        request_id = %request_id,
        rows = response.rows.len(),
        chains = response.stats.chains_emitted,
        cancelled = response.stats.cancelled,
        "Watch-next completed"
    );

    Ok(Json(response))
}
