//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Registered event streams.
    pub streams: usize,
    /// Active hub subscriptions, absent when push is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<usize>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let subscriptions = match &state.hubbub {
        Some(hubbub) => Some(hubbub.active_subscriptions().await.len()),
        None => None,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        streams: state.events.connection_count().await,
        subscriptions,
    })
}
