use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing search activity.
#[derive(Default)]
pub struct SearchMetrics {
    queries_served: AtomicU64,
    queries_failed: AtomicU64,
    papers_returned: AtomicU64,
    identifiers_dropped: AtomicU64,
    full_text_resolutions: AtomicU64,
    abstract_resolutions: AtomicU64,
    summary_failures: AtomicU64,
}

/// Per-query tallies folded into [`SearchMetrics`] once the query completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryTally {
    /// Papers included in the response.
    pub papers_returned: u64,
    /// Identifiers removed from the response because they failed or had no text.
    pub identifiers_dropped: u64,
    /// Papers whose text came from the open-access full text.
    pub full_text_resolutions: u64,
    /// Papers whose text came from the abstract fallback.
    pub abstract_resolutions: u64,
    /// Papers carrying the summary-failure sentinel.
    pub summary_failures: u64,
}

impl SearchMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed query.
    pub fn record_query(&self, tally: QueryTally) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
        self.papers_returned
            .fetch_add(tally.papers_returned, Ordering::Relaxed);
        self.identifiers_dropped
            .fetch_add(tally.identifiers_dropped, Ordering::Relaxed);
        self.full_text_resolutions
            .fetch_add(tally.full_text_resolutions, Ordering::Relaxed);
        self.abstract_resolutions
            .fetch_add(tally.abstract_resolutions, Ordering::Relaxed);
        self.summary_failures
            .fetch_add(tally.summary_failures, Ordering::Relaxed);
    }

    /// Record a query that failed before any identifier was processed.
    pub fn record_failure(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_served: self.queries_served.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            papers_returned: self.papers_returned.load(Ordering::Relaxed),
            identifiers_dropped: self.identifiers_dropped.load(Ordering::Relaxed),
            full_text_resolutions: self.full_text_resolutions.load(Ordering::Relaxed),
            abstract_resolutions: self.abstract_resolutions.load(Ordering::Relaxed),
            summary_failures: self.summary_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of search counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Queries that completed, including those with an empty result list.
    pub queries_served: u64,
    /// Queries rejected because the identifier search failed.
    pub queries_failed: u64,
    /// Papers returned across all queries.
    pub papers_returned: u64,
    /// Identifiers dropped across all queries.
    pub identifiers_dropped: u64,
    /// Papers resolved from open-access full text.
    pub full_text_resolutions: u64,
    /// Papers resolved from the abstract fallback.
    pub abstract_resolutions: u64,
    /// Papers whose summary generation failed.
    pub summary_failures: u64,
}
