//! Per-identifier text resolution with a full text → abstract → sentinel fallback chain.

use crate::extract;
use crate::pubmed::{AbstractDocument, LiteratureIndex};
use serde::Serialize;
use std::sync::Arc;

/// Sentinel substituted when the abstract cannot be fetched.
pub const ABSTRACT_NOT_AVAILABLE: &str = "Abstract not available.";

/// Where a resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrigin {
    /// Open-access full text from PMC.
    FullText,
    /// PubMed abstract (or its sentinel).
    Abstract,
}

/// Resolution attempts in the order they are tried.
const FALLBACK_CHAIN: [TextOrigin; 2] = [TextOrigin::FullText, TextOrigin::Abstract];

/// Non-empty text resolved for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    /// PubMed identifier the text belongs to.
    pub identifier: String,
    /// Resolved text; never empty.
    pub text: String,
    /// Which step of the fallback chain produced the text.
    pub origin: TextOrigin,
}

/// Decides between full text and abstract for each identifier.
#[derive(Clone)]
pub struct TextResolver {
    index: Arc<dyn LiteratureIndex>,
}

impl TextResolver {
    /// Build a resolver over the given bibliographic index.
    pub fn new(index: Arc<dyn LiteratureIndex>) -> Self {
        Self { index }
    }

    /// Walk the fallback chain, stopping at the first step that yields non-empty text.
    ///
    /// Returns `None` when neither full text nor abstract produced text; such identifiers are
    /// dropped by the caller.
    pub async fn resolve(&self, identifier: &str) -> Option<ResolvedText> {
        for origin in FALLBACK_CHAIN {
            let attempt = match origin {
                TextOrigin::FullText => self.full_text(identifier).await,
                TextOrigin::Abstract => self.abstract_text(identifier).await,
            };
            if let Some(text) = attempt.filter(|text| !text.trim().is_empty()) {
                tracing::debug!(pmid = identifier, ?origin, chars = text.len(), "Resolved text");
                return Some(ResolvedText {
                    identifier: identifier.to_string(),
                    text,
                    origin,
                });
            }
        }
        tracing::warn!(pmid = identifier, "No full text or abstract available");
        None
    }

    async fn full_text(&self, identifier: &str) -> Option<String> {
        let pmcid = match self.index.resolve_cross_reference(identifier).await {
            Ok(Some(pmcid)) => pmcid,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(pmid = identifier, error = %error, "PMC cross-reference failed");
                return None;
            }
        };

        let markup = match self.index.fetch_full_text(&pmcid).await {
            Ok(Some(markup)) => markup,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(pmid = identifier, pmcid = %pmcid, error = %error, "PMC full-text fetch failed");
                return None;
            }
        };

        let text = extract::extract(&markup);
        if text.is_none() {
            tracing::debug!(pmid = identifier, pmcid = %pmcid, "PMC full text is not well-formed");
        }
        text
    }

    async fn abstract_text(&self, identifier: &str) -> Option<String> {
        match self.index.fetch_abstract_markup(identifier).await {
            Ok(AbstractDocument::Markup(markup)) => extract::extract_abstract(&markup),
            Ok(AbstractDocument::Unavailable) => Some(ABSTRACT_NOT_AVAILABLE.to_string()),
            Err(error) => {
                tracing::warn!(pmid = identifier, error = %error, "Abstract fetch failed");
                Some(ABSTRACT_NOT_AVAILABLE.to_string())
            }
        }
    }
}
