//! Shared domain types.

pub mod id;

pub use id::{ArticleId, FeedId};
