//! Route definitions for the Feedwire HTTP boundary.
//!
//! The hub callback routes are mounted only when push subscriptions are
//! enabled.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(health_routes())
        .merge(event_routes());

    if state.hubbub.is_some() {
        router = router.merge(hubbub_routes(&state.config.hubbub.endpoint));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server-sent event stream
fn event_routes() -> Router<AppState> {
    Router::new().route("/v2/events", get(handlers::events::stream_events))
}

/// Hub intent verification and content distribution
fn hubbub_routes(endpoint: &str) -> Router<AppState> {
    let path = format!("{}/{{feed_id}}", endpoint.trim_end_matches('/'));
    Router::new().route(
        &path,
        get(handlers::hubbub::verify).post(handlers::hubbub::content),
    )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
