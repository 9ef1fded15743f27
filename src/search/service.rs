//! Search orchestrator: identifier search, per-paper fan-out and ordered aggregation.

use crate::{
    config::{Config, get_config},
    metrics::{MetricsSnapshot, QueryTally, SearchMetrics},
    pubmed::{LiteratureIndex, PubMedClient, PubMedError},
    resolver::{TextOrigin, TextResolver},
    search::types::{PaperError, PaperResult, Query, SearchError},
    summarization::Summarizer,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

/// Abstraction over the search pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Run a query end to end and return the papers in upstream order.
    async fn search(&self, query: Query) -> Result<Vec<PaperResult>, SearchError>;

    /// `max_results` applied when the caller omits it.
    fn default_max_results(&self) -> usize;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Knobs controlling one [`SearchService`].
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Maximum number of identifiers processed at once.
    pub concurrency: usize,
    /// `max_results` used when a request omits it.
    pub default_max_results: usize,
    /// Upper bound applied to the requested `max_results`.
    pub max_results_cap: usize,
    /// Base for the per-paper article URL.
    pub article_base_url: String,
}

impl From<&Config> for SearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.search_concurrency,
            default_max_results: config.search_default_max_results,
            max_results_cap: config.search_max_results_cap,
            article_base_url: config.pubmed_article_base_url.clone(),
        }
    }
}

/// One assembled paper plus what the tally needs to know about it.
struct ProcessedPaper {
    paper: PaperResult,
    summary_failed: bool,
}

/// Everything one per-identifier task needs; cheap to clone into each task.
#[derive(Clone)]
struct PaperPipeline {
    index: Arc<dyn LiteratureIndex>,
    resolver: TextResolver,
    summarizer: Summarizer,
    article_base_url: Arc<str>,
}

impl PaperPipeline {
    async fn process(&self, identifier: &str) -> Result<ProcessedPaper, PaperError> {
        let metadata = self.index.fetch_metadata(identifier).await?;
        let resolved = self
            .resolver
            .resolve(identifier)
            .await
            .ok_or(PaperError::Unresolved)?;
        let summary = self.summarizer.summarize(identifier, &resolved.text).await;
        let summary_failed = summary.is_failure();
        Ok(ProcessedPaper {
            paper: PaperResult::assemble(metadata, &resolved, summary, &self.article_base_url),
            summary_failed,
        })
    }
}

/// Drives the retrieval-and-summarization pipeline for each query.
///
/// The service holds the shared HTTP client, the summarizer and the metrics registry; construct
/// it once near process start and share it through an `Arc`.
pub struct SearchService {
    pipeline: PaperPipeline,
    settings: SearchSettings,
    metrics: Arc<SearchMetrics>,
}

impl SearchService {
    /// Build the service from the global configuration.
    pub fn new() -> Result<Self, PubMedError> {
        Self::from_config(get_config())
    }

    /// Build the service from an explicit configuration.
    pub fn from_config(config: &Config) -> Result<Self, PubMedError> {
        tracing::info!("Initializing E-utilities client");
        let index = Arc::new(PubMedClient::from_config(config)?);
        tracing::info!(provider = ?config.summarization_provider, "Initializing summarizer");
        let summarizer = Summarizer::from_config(config);
        Ok(Self::with_components(
            index,
            summarizer,
            SearchSettings::from(config),
        ))
    }

    /// Assemble a service from explicit collaborators.
    pub fn with_components(
        index: Arc<dyn LiteratureIndex>,
        summarizer: Summarizer,
        settings: SearchSettings,
    ) -> Self {
        let pipeline = PaperPipeline {
            resolver: TextResolver::new(index.clone()),
            index,
            summarizer,
            article_base_url: Arc::from(settings.article_base_url.as_str()),
        };
        Self {
            pipeline,
            settings,
            metrics: Arc::new(SearchMetrics::new()),
        }
    }

    /// Run a query end to end.
    ///
    /// Only the identifier search is fatal. Every other failure removes the affected identifier
    /// (or degrades its record with a sentinel) while the rest of the batch proceeds.
    pub async fn search(&self, query: Query) -> Result<Vec<PaperResult>, SearchError> {
        let text = query.text.trim().to_string();
        if text.is_empty() {
            return Err(SearchError::InvalidQuery("Query is required".into()));
        }
        let max_results = query.max_results.min(self.settings.max_results_cap);
        let span = tracing::info_span!("search", query_id = %Uuid::new_v4(), max_results);

        async move {
            tracing::info!(query = %text, "Search started");
            let identifiers = match self
                .pipeline
                .index
                .search_identifiers(&text, max_results)
                .await
            {
                Ok(identifiers) => identifiers,
                Err(error) => {
                    self.metrics.record_failure();
                    tracing::error!(error = %error, "Identifier search failed");
                    return Err(SearchError::UpstreamUnavailable(error));
                }
            };
            tracing::info!(count = identifiers.len(), "Identifiers fetched");

            let (papers, tally) = self.process_all(identifiers).await;
            self.metrics.record_query(tally);
            tracing::info!(
                papers = tally.papers_returned,
                dropped = tally.identifiers_dropped,
                full_text = tally.full_text_resolutions,
                summary_failures = tally.summary_failures,
                "Search completed"
            );
            Ok(papers)
        }
        .instrument(span)
        .await
    }

    /// Process every identifier in its own task and project the results back onto input order.
    ///
    /// Dropping the returned future aborts all in-flight tasks.
    async fn process_all(&self, identifiers: Vec<String>) -> (Vec<PaperResult>, QueryTally) {
        let total = identifiers.len();
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, identifier) in identifiers.into_iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let outcome = pipeline.process(&identifier).await;
                    if let Err(error) = &outcome {
                        tracing::warn!(pmid = %identifier, error = %error, "Dropping identifier");
                    }
                    (position, outcome)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<ProcessedPaper>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Ok(paper))) => slots[position] = Some(paper),
                Ok((_, Err(_))) => {}
                Err(error) => tracing::error!(error = %error, "Paper task aborted"),
            }
        }

        let processed: Vec<ProcessedPaper> = slots.into_iter().flatten().collect();
        let summary_failures = processed
            .iter()
            .filter(|processed| processed.summary_failed)
            .count() as u64;
        let papers: Vec<PaperResult> = processed
            .into_iter()
            .map(|processed| processed.paper)
            .collect();
        let tally = QueryTally {
            papers_returned: papers.len() as u64,
            identifiers_dropped: (total - papers.len()) as u64,
            full_text_resolutions: papers
                .iter()
                .filter(|paper| paper.origin == TextOrigin::FullText)
                .count() as u64,
            abstract_resolutions: papers
                .iter()
                .filter(|paper| paper.origin == TextOrigin::Abstract)
                .count() as u64,
            summary_failures,
        };
        (papers, tally)
    }

    /// Return the current search metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl SearchApi for SearchService {
    async fn search(&self, query: Query) -> Result<Vec<PaperResult>, SearchError> {
        SearchService::search(self, query).await
    }

    fn default_max_results(&self) -> usize {
        self.settings.default_max_results
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SearchService::metrics_snapshot(self)
    }
}
