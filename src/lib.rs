#![deny(missing_docs)]

//! Core library for the medlit literature search service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PMC and PubMed markup.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Search metrics helpers.
pub mod metrics;
/// NCBI E-utilities client.
pub mod pubmed;
/// Full text / abstract resolution per identifier.
pub mod resolver;
/// Search orchestration.
pub mod search;
/// Summarization providers and the bounded adapter.
pub mod summarization;
