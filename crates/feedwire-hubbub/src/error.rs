//! Subscription lifecycle errors.

use feedwire_core::error::{AppError, ErrorKind};
use feedwire_core::types::FeedId;
use thiserror::Error;

/// Result alias for hub operations.
pub type HubbubResult<T> = Result<T, HubbubError>;

/// Errors produced by the subscription lifecycle manager.
#[derive(Debug, Error)]
pub enum HubbubError {
    /// No absolute callback base URL is configured.
    #[error("Hubbub callback URL is not set")]
    NotConfigured,
    /// The feed does not advertise an absolute hub link.
    #[error("Feed does not contain a hub link")]
    NoFeedHubLink,
    /// A subscription record already targets the feed.
    #[error("Feed already subscribed")]
    AlreadySubscribed,
    /// No subscription record targets the feed.
    #[error("Feed is not subscribed")]
    NotSubscribed,
    /// The hub could not be reached.
    #[error("Hub request to {hub} for feed {feed_id} failed: {source}")]
    Transport {
        /// Feed the handshake was for.
        feed_id: FeedId,
        /// Hub endpoint.
        hub: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The hub answered with something other than 202 Accepted.
    #[error("Expected response status 202 from {hub} for feed {feed_id}, got {status}")]
    UnexpectedStatus {
        /// Feed the handshake was for.
        feed_id: FeedId,
        /// Hub endpoint.
        hub: String,
        /// Status returned by the hub.
        status: reqwest::StatusCode,
    },
    /// A persistence call failed.
    #[error("{context}: {source}")]
    Repository {
        /// What was being done.
        context: String,
        /// Underlying repository error.
        #[source]
        source: AppError,
    },
    /// The outbound HTTP client could not be built.
    #[error("Failed to build hub client: {0}")]
    Client(#[source] reqwest::Error),
}

impl HubbubError {
    /// Wrap a repository error with context.
    pub fn repository(context: impl Into<String>, source: AppError) -> Self {
        Self::Repository {
            context: context.into(),
            source,
        }
    }

    /// Whether this is a synchronous precondition or configuration
    /// failure, raised before any side effect.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::NoFeedHubLink | Self::AlreadySubscribed | Self::NotSubscribed
        )
    }
}

impl From<HubbubError> for AppError {
    fn from(err: HubbubError) -> Self {
        let kind = match &err {
            HubbubError::NotConfigured | HubbubError::Client(_) => ErrorKind::Configuration,
            HubbubError::NoFeedHubLink => ErrorKind::Validation,
            HubbubError::AlreadySubscribed | HubbubError::NotSubscribed => ErrorKind::Conflict,
            HubbubError::Transport { .. } | HubbubError::UnexpectedStatus { .. } => {
                ErrorKind::ExternalService
            }
            HubbubError::Repository { source, .. } => source.kind,
        };
        let message = err.to_string();
        AppError::with_source(kind, message, err)
    }
}
