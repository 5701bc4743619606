//! Parsing of hub content distribution bodies.

use chrono::{DateTime, Utc};

use feedwire_core::error::AppError;
use feedwire_core::types::FeedId;
use feedwire_entity::Article;

/// Parse an RSS document pushed by a hub into articles of `feed_id`.
pub fn parse_articles(feed_id: FeedId, body: &[u8]) -> Result<Vec<Article>, AppError> {
    let channel = rss::Channel::read_from(body)
        .map_err(|e| AppError::validation(format!("Unparseable feed content: {e}")))?;

    Ok(channel
        .items()
        .iter()
        .map(|item| Article {
            feed_id,
            title: item.title().unwrap_or_default().to_string(),
            description: item.description().map(String::from),
            link: item.link().map(String::from),
            guid: item
                .guid()
                .map(|g| g.value().to_string())
                .or_else(|| item.link().map(String::from)),
            date: item
                .pub_date()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            ..Article::default()
        })
        .collect())
}
