//! Query, result and error types for the search pipeline.

use crate::pubmed::{Metadata, PubMedError};
use crate::resolver::{ResolvedText, TextOrigin};
use crate::summarization::Summary;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by [`crate::search::SearchService::search`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request did not carry a usable query.
    #[error("{0}")]
    InvalidQuery(String),
    /// The identifier search could not reach the index or got a non-success status.
    #[error("PubMed search unavailable: {0}")]
    UpstreamUnavailable(#[source] PubMedError),
}

/// Why a single identifier was left out of the result list.
#[derive(Debug, Error)]
pub(crate) enum PaperError {
    /// Metadata lookup failed at the transport or status level.
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] PubMedError),
    /// Neither full text nor abstract yielded any text.
    #[error("no full text or abstract available")]
    Unresolved,
}

/// A literature query as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Free-text search terms.
    pub text: String,
    /// Maximum number of identifiers to request from the index.
    pub max_results: usize,
}

impl Query {
    /// Build a query from its parts.
    pub fn new(text: impl Into<String>, max_results: usize) -> Self {
        Self {
            text: text.into(),
            max_results,
        }
    }
}

/// One paper in the response: metadata, text origin and summary joined by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperResult {
    /// PubMed identifier.
    #[serde(skip)]
    pub identifier: String,
    /// Whether the summary was generated from full text or the abstract.
    #[serde(skip)]
    pub origin: TextOrigin,
    /// Journal or source name.
    pub source: String,
    /// Article title.
    pub title: String,
    /// Author names in upstream order.
    pub authors: Vec<String>,
    /// Free-form publication date.
    pub publication_date: String,
    /// Public article URL derived from the identifier.
    pub url: String,
    /// Exact text passed to the summarizer.
    pub full_text_snippet: String,
    /// Generated summary or its failure sentinel.
    pub summary: String,
}

impl PaperResult {
    /// Join the per-identifier pieces into the record returned to the caller.
    pub fn assemble(
        metadata: Metadata,
        resolved: &ResolvedText,
        summary: Summary,
        article_base_url: &str,
    ) -> Self {
        let url = article_url(article_base_url, &metadata.identifier);
        Self {
            identifier: metadata.identifier,
            origin: resolved.origin,
            source: metadata.source_name,
            title: metadata.title,
            authors: metadata.authors,
            publication_date: metadata.publication_date,
            url,
            full_text_snippet: summary.truncated_input,
            summary: summary.summary_text,
        }
    }
}

/// Response body of a successful search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Papers in upstream relevance order, dropped identifiers omitted.
    pub pubmed: Vec<PaperResult>,
}

/// Public article link for `identifier`.
pub fn article_url(base: &str, identifier: &str) -> String {
    format!("{}/{}/", base.trim_end_matches('/'), identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_url_is_derived_from_identifier() {
        assert_eq!(
            article_url("https://pubmed.ncbi.nlm.nih.gov/", "123"),
            "https://pubmed.ncbi.nlm.nih.gov/123/"
        );
    }

    #[test]
    fn paper_result_serializes_wire_fields_only() {
        let metadata = Metadata {
            identifier: "9".into(),
            title: "Title".into(),
            authors: vec!["A B".into()],
            publication_date: "2024".into(),
            source_name: "Lancet".into(),
        };
        let resolved = ResolvedText {
            identifier: "9".into(),
            text: "Body.".into(),
            origin: TextOrigin::Abstract,
        };
        let summary = Summary {
            identifier: "9".into(),
            summary_text: "Sum.".into(),
            truncated_input: "Body.".into(),
        };

        let paper = PaperResult::assemble(metadata, &resolved, summary, "https://pubmed.ncbi.nlm.nih.gov");
        let value = serde_json::to_value(&paper).expect("json");

        assert_eq!(
            value,
            json!({
                "source": "Lancet",
                "title": "Title",
                "authors": ["A B"],
                "publication_date": "2024",
                "url": "https://pubmed.ncbi.nlm.nih.gov/9/",
                "full_text_snippet": "Body.",
                "summary": "Sum."
            })
        );
    }
}
