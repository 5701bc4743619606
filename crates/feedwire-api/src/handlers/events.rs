//! Server-sent event stream handler.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use feedwire_auth::{Claims, JwtDecoder};
use feedwire_core::types::FeedId;
use feedwire_realtime::ConnectionValidator;

use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientKey};
use crate::state::AppState;

/// Re-checks a stream's bearer token before each delivery.
pub struct BearerRevalidator {
    decoder: Arc<JwtDecoder>,
    token: String,
    claims: Claims,
}

impl BearerRevalidator {
    /// Revalidator for an already accepted token.
    pub fn new(decoder: Arc<JwtDecoder>, token: String, claims: Claims) -> Self {
        Self {
            decoder,
            token,
            claims,
        }
    }
}

#[async_trait]
impl ConnectionValidator for BearerRevalidator {
    async fn is_valid(&self) -> bool {
        self.decoder.revalidate(&self.token, &self.claims).await
    }
}

/// GET /v2/events: open an event stream for the caller's feeds.
///
/// The body ends when the stream's termination signal fires; dropping
/// the body releases its registration.
pub async fn stream_events(
    State(state): State<AppState>,
    ClientKey(key): ClientKey,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let feeds = state.feeds.for_user(user.login()).await?;
    let interests: HashSet<FeedId> = feeds.iter().map(|f| f.id).collect();

    info!(key = %key, login = %user.login(), feeds = interests.len(), "Event stream opened");

    let (writer, reader) = tokio::io::duplex(state.config.realtime.stream_buffer_bytes);
    let validator = Arc::new(BearerRevalidator::new(
        Arc::clone(&state.jwt_decoder),
        user.token.clone(),
        user.claims.clone(),
    ));
    let registration = state
        .events
        .register(key, Box::new(writer), validator, interests);

    let terminated = registration.terminated().clone().cancelled_owned();
    let body = ReaderStream::new(reader)
        .take_until(terminated)
        .map(move |chunk| {
            let _held = &registration;
            chunk
        });

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
