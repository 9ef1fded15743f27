//! In-memory [`LiteratureIndex`] used by unit tests of the resolver and orchestrator.

use crate::pubmed::{AbstractDocument, LiteratureIndex, Metadata, PubMedError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How the stub answers an abstract fetch.
#[derive(Clone)]
pub(crate) enum StubAbstract {
    Markup(String),
    Unavailable,
    TransportFailure,
}

#[derive(Clone)]
pub(crate) struct StubPaper {
    pub(crate) metadata_fails: bool,
    pub(crate) pmcid: Option<String>,
    pub(crate) cross_reference_fails: bool,
    pub(crate) abstract_doc: StubAbstract,
}

impl StubPaper {
    pub(crate) fn with_abstract(text: &str) -> Self {
        Self {
            metadata_fails: false,
            pmcid: None,
            cross_reference_fails: false,
            abstract_doc: StubAbstract::Markup(format!(
                "<PubmedArticleSet><PubmedArticle><Abstract><AbstractText>{text}</AbstractText></Abstract></PubmedArticle></PubmedArticleSet>"
            )),
        }
    }

    pub(crate) fn with_full_text(pmcid: &str) -> Self {
        Self {
            pmcid: Some(pmcid.to_string()),
            ..Self::with_abstract("Abstract fallback.")
        }
    }
}

#[derive(Default)]
pub(crate) struct StubIndex {
    pub(crate) search_fails: bool,
    pub(crate) identifiers: Vec<String>,
    pub(crate) papers: HashMap<String, StubPaper>,
    pub(crate) full_texts: HashMap<String, String>,
    pub(crate) search_calls: AtomicUsize,
}

impl StubIndex {
    pub(crate) fn paper(mut self, identifier: &str, paper: StubPaper) -> Self {
        self.identifiers.push(identifier.to_string());
        self.papers.insert(identifier.to_string(), paper);
        self
    }

    pub(crate) fn full_text(mut self, pmcid: &str, markup: &str) -> Self {
        self.full_texts.insert(pmcid.to_string(), markup.to_string());
        self
    }

    pub(crate) fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, identifier: &str) -> Result<&StubPaper, PubMedError> {
        self.papers.get(identifier).ok_or_else(unavailable)
    }
}

fn unavailable() -> PubMedError {
    PubMedError::UnexpectedStatus {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "stub failure".into(),
    }
}

#[async_trait]
impl LiteratureIndex for StubIndex {
    async fn search_identifiers(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, PubMedError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.search_fails {
            return Err(unavailable());
        }
        Ok(self.identifiers.iter().take(max_results).cloned().collect())
    }

    async fn fetch_metadata(&self, identifier: &str) -> Result<Metadata, PubMedError> {
        let paper = self.lookup(identifier)?;
        if paper.metadata_fails {
            return Err(unavailable());
        }
        Ok(Metadata {
            title: format!("Paper {identifier}"),
            authors: vec!["Doe J".into()],
            ..Metadata::placeholder(identifier)
        })
    }

    async fn resolve_cross_reference(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, PubMedError> {
        let paper = self.lookup(identifier)?;
        if paper.cross_reference_fails {
            return Err(unavailable());
        }
        Ok(paper.pmcid.clone())
    }

    async fn fetch_full_text(
        &self,
        full_text_identifier: &str,
    ) -> Result<Option<String>, PubMedError> {
        Ok(self.full_texts.get(full_text_identifier).cloned())
    }

    async fn fetch_abstract_markup(
        &self,
        identifier: &str,
    ) -> Result<AbstractDocument, PubMedError> {
        match &self.lookup(identifier)?.abstract_doc {
            StubAbstract::Markup(markup) => Ok(AbstractDocument::Markup(markup.clone())),
            StubAbstract::Unavailable => Ok(AbstractDocument::Unavailable),
            StubAbstract::TransportFailure => Err(unavailable()),
        }
    }
}
