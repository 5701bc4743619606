//! Article entities.

pub mod model;

pub use model::Article;
