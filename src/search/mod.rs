// src/search/mod.rs

pub mod handlers;
pub mod pagination;
pub mod query;
pub mod routes;


// Re-export commonly used items
pub use query::{SearchError, StructuredQuery};
pub use routes::search_routes;
