//! End-to-end literature search: identifiers, text resolution, summaries, ordered results.

mod service;
pub mod types;

pub use service::{SearchApi, SearchService, SearchSettings};
pub use types::{PaperResult, Query, SearchError, SearchResponse, article_url};
