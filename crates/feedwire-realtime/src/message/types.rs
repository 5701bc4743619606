//! Event envelope types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use feedwire_entity::{Article, Feed};

/// Event type emitted when a feed has new content.
pub const FEED_UPDATE: &str = "feed-update";

/// Outbound envelope `{type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload.
    pub data: Value,
}

impl Event {
    /// A `feed-update` event. `articles` is omitted from the payload when empty.
    pub fn feed_update(feed: &Feed, articles: &[Article]) -> Result<Self, serde_json::Error> {
        let mut data = Map::new();
        data.insert("feed".to_string(), serde_json::to_value(feed)?);
        if !articles.is_empty() {
            data.insert("articles".to_string(), serde_json::to_value(articles)?);
        }

        Ok(Self {
            kind: FEED_UPDATE.to_string(),
            data: Value::Object(data),
        })
    }
}
