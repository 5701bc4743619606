//! Article entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedwire_core::types::{ArticleId, FeedId};

/// A single entry of a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Article identifier; zero until persisted.
    pub id: ArticleId,
    /// The feed this article belongs to.
    pub feed_id: FeedId,
    /// Article title.
    pub title: String,
    /// Article summary or body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Permalink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Publisher-assigned unique identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// Publication date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}
