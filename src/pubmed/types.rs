//! Shared types used by the E-utilities client and the resolution pipeline.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Placeholder used when the upstream summary omits a title.
pub const MISSING_TITLE: &str = "No title";
/// Placeholder used when the upstream summary omits a publication date.
pub const MISSING_PUBLICATION_DATE: &str = "Unknown";
/// Placeholder used when the upstream summary omits the journal/source name.
pub const DEFAULT_SOURCE_NAME: &str = "PubMed";

/// Errors returned while interacting with the bibliographic index.
#[derive(Debug, Error)]
pub enum PubMedError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid E-utilities URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a complete response (includes timeouts).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The index responded with a non-success status code.
    #[error("Unexpected E-utilities response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the index.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The response body did not have the expected shape.
    #[error("Malformed E-utilities response: {0}")]
    Decode(String),
}

/// Bibliographic metadata for one identifier, with placeholders for missing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// PubMed identifier the metadata belongs to.
    pub identifier: String,
    /// Article title, or [`MISSING_TITLE`].
    pub title: String,
    /// Author names in upstream order.
    pub authors: Vec<String>,
    /// Free-form publication date, or [`MISSING_PUBLICATION_DATE`].
    pub publication_date: String,
    /// Journal or source name, or [`DEFAULT_SOURCE_NAME`].
    pub source_name: String,
}

impl Metadata {
    /// Metadata carrying only placeholders, used when the summary document is absent.
    pub fn placeholder(identifier: &str) -> Self {
        DocumentSummary::default().into_metadata(identifier)
    }
}

/// Outcome of an abstract fetch that reached the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractDocument {
    /// Raw efetch markup.
    Markup(String),
    /// The index answered with a non-success status.
    Unavailable,
}

#[derive(Deserialize, Default)]
pub(crate) struct ESearchResponse {
    #[serde(default)]
    pub(crate) esearchresult: ESearchResult,
}

#[derive(Deserialize, Default)]
pub(crate) struct ESearchResult {
    #[serde(default)]
    pub(crate) idlist: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct ESummaryResponse {
    #[serde(default)]
    pub(crate) result: serde_json::Map<String, Value>,
}

#[derive(Deserialize, Default)]
pub(crate) struct DocumentSummary {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) authors: Vec<AuthorEntry>,
    #[serde(default)]
    pub(crate) pubdate: Option<String>,
    #[serde(default)]
    pub(crate) source: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct AuthorEntry {
    #[serde(default)]
    pub(crate) name: Option<String>,
}

impl DocumentSummary {
    pub(crate) fn into_metadata(self, identifier: &str) -> Metadata {
        Metadata {
            identifier: identifier.to_string(),
            title: non_blank(self.title).unwrap_or_else(|| MISSING_TITLE.to_string()),
            authors: self
                .authors
                .into_iter()
                .filter_map(|author| non_blank(author.name))
                .collect(),
            publication_date: non_blank(self.pubdate)
                .unwrap_or_else(|| MISSING_PUBLICATION_DATE.to_string()),
            source_name: non_blank(self.source).unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ELinkResponse {
    #[serde(default)]
    pub(crate) linksets: Vec<LinkSet>,
}

#[derive(Deserialize)]
pub(crate) struct LinkSet {
    #[serde(default)]
    pub(crate) linksetdbs: Vec<LinkSetDb>,
}

#[derive(Deserialize)]
pub(crate) struct LinkSetDb {
    #[serde(default)]
    pub(crate) linkname: Option<String>,
    #[serde(default)]
    pub(crate) links: Vec<Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
