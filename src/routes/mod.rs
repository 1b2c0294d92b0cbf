use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    catalog::CatalogIndex,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::providers::ConnectionProvider,
};

pub mod titles;
pub mod watch_next;

/// Shared state handed to every handler
pub struct AppState {
    pub catalog: Arc<CatalogIndex>,
    pub provider: Arc<dyn ConnectionProvider>,
    /// Wall-clock budget for one resolver run
    pub resolve_timeout: Duration,
}

/// Slack past the resolver budget before a request is cut off with 408
const REQUEST_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_timeout = state.resolve_timeout + REQUEST_TIMEOUT_GRACE;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/titles/:id", get(titles::get_title))
        .route("/watch-next", post(watch_next::watch_next))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
