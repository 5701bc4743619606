//! Feed entity model.

use std::fmt;

use serde::{Deserialize, Serialize};

use feedwire_core::types::FeedId;

/// A syndicated feed tracked by the server.
///
/// Owned by the persistence layer. The push subsystem only reads the
/// links and writes [`Feed::subscribe_error`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    /// Unique feed identifier.
    pub id: FeedId,
    /// Feed title.
    pub title: String,
    /// Feed description.
    #[serde(default)]
    pub description: String,
    /// URL of the feed document itself (the hub topic).
    pub link: String,
    /// URL of the site the feed belongs to.
    #[serde(default)]
    pub site_link: String,
    /// Address of the feed's push hub, if it advertises one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_link: Option<String>,
    /// Last error reported by a hub subscription attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_error: Option<String>,
}

impl Feed {
    /// Create a feed with the given id and document link.
    pub fn new(id: FeedId, link: impl Into<String>) -> Self {
        Self {
            id,
            link: link.into(),
            ..Self::default()
        }
    }

    /// Set the hub link.
    pub fn with_hub(mut self, hub_link: impl Into<String>) -> Self {
        self.hub_link = Some(hub_link.into());
        self
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{} ({})", self.link, self.id)
        } else {
            write!(f, "{} ({})", self.title, self.id)
        }
    }
}
