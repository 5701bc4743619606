//! Push hub callback handlers: intent verification and content distribution.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use feedwire_core::error::AppError;
use feedwire_core::types::FeedId;
use feedwire_entity::{Feed, MAX_LEASE_SECONDS, bounded_lease};

use crate::content::parse_articles;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters of a hub verification request.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.topic")]
    pub topic: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.lease_seconds")]
    pub lease_seconds: Option<i64>,
    #[serde(rename = "hub.reason")]
    pub reason: Option<String>,
}

/// GET {endpoint}/{feed_id}
pub async fn verify(
    State(state): State<AppState>,
    Path(feed_id): Path<FeedId>,
    Query(query): Query<VerifyQuery>,
) -> Result<Response, ApiError> {
    let feed = load_feed(&state, feed_id).await?;
    if query.topic.as_deref() != Some(feed.link.as_str()) {
        warn!(feed_id = %feed_id, topic = ?query.topic, "Verification topic does not match feed");
        return Err(AppError::not_found(format!("Feed {feed_id} has no such topic")).into());
    }

    match query.mode.as_deref() {
        Some("subscribe") => {
            let challenge = require_challenge(&query)?;
            let mut subscription = state
                .subscriptions
                .find_by_feed(feed_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Feed {feed_id} is not subscribed")))?;

            let lease = match query.lease_seconds {
                Some(lease) if (1..=MAX_LEASE_SECONDS).contains(&lease) => lease,
                Some(lease) => {
                    return Err(AppError::validation(format!(
                        "hub.lease_seconds must be between 1 and {MAX_LEASE_SECONDS}, got {lease}"
                    ))
                    .into());
                }
                None => bounded_lease(state.config.hubbub.default_lease_seconds),
            };
            subscription.confirm(Utc::now(), lease);
            state.subscriptions.update(&subscription).await?;

            if feed.subscribe_error.is_some() {
                state.feeds.set_subscribe_error(feed_id, None).await?;
            }
            if let Some(hubbub) = &state.hubbub {
                hubbub.confirm(subscription);
            }

            info!(feed_id = %feed_id, lease_seconds = lease, "Hub verified subscription");
            Ok(challenge.into_response())
        }
        Some("unsubscribe") => {
            let challenge = require_challenge(&query)?;
            let pending = state
                .hubbub
                .as_ref()
                .is_some_and(|hubbub| hubbub.is_unsubscribe_pending(feed_id));
            if !pending && state.subscriptions.find_by_feed(feed_id).await?.is_some() {
                warn!(feed_id = %feed_id, "Unsubscribe verification for a feed we still follow");
                return Err(
                    AppError::not_found(format!("Feed {feed_id} has no pending unsubscribe")).into(),
                );
            }
            info!(feed_id = %feed_id, "Hub verified unsubscription");
            Ok(challenge.into_response())
        }
        Some("denied") => {
            let reason = query
                .reason
                .clone()
                .unwrap_or_else(|| "subscription denied by hub".to_string());
            warn!(feed_id = %feed_id, reason = %reason, "Hub denied subscription");

            state.feeds.set_subscribe_error(feed_id, Some(reason)).await?;

            if let Some(mut subscription) = state.subscriptions.find_by_feed(feed_id).await? {
                subscription.subscription_failure = true;
                state.subscriptions.update(&subscription).await?;
            }
            if let Some(hubbub) = &state.hubbub {
                hubbub.reject(feed_id);
            }
            Ok(StatusCode::OK.into_response())
        }
        other => Err(AppError::validation(format!("Unsupported hub.mode: {other:?}")).into()),
    }
}

/// POST {endpoint}/{feed_id}
pub async fn content(
    State(state): State<AppState>,
    Path(feed_id): Path<FeedId>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let feed = load_feed(&state, feed_id).await?;
    let articles = parse_articles(feed_id, &body)?;

    info!(feed_id = %feed_id, articles = articles.len(), "Hub pushed feed content");
    state.monitors.feed_updated(&feed, &articles).await;
    Ok(StatusCode::OK)
}

async fn load_feed(state: &AppState, feed_id: FeedId) -> Result<Feed, ApiError> {
    state
        .feeds
        .find_by_id(feed_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Feed {feed_id} not found")).into())
}

fn require_challenge(query: &VerifyQuery) -> Result<String, ApiError> {
    query
        .challenge
        .clone()
        .ok_or_else(|| AppError::validation("Missing hub.challenge").into())
}
