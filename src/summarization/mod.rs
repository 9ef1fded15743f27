//! Abstractive summarization providers and the bounded adapter used by the search pipeline.
//!
//! The Ollama-backed client issues HTTP requests directly to the runtime. When no runtime is
//! configured the extractive client produces deterministic leading-sentence summaries instead.

mod adapter;

pub use adapter::{
    INPUT_CHAR_LIMIT, OUTPUT_MAX_TOKENS, OUTPUT_MIN_TOKENS, SUMMARY_FAILED, Summarizer, Summary,
};

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Text to summarize, already bounded by the adapter.
    pub text: String,
    /// Requested lower bound on the summary length, in tokens.
    pub min_tokens: usize,
    /// Upper bound on the summary length, in tokens.
    pub max_tokens: usize,
}

/// Interface implemented by summarization providers.
///
/// Implementations must be deterministic: identical requests yield identical summaries.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a concise summary using the configured model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build a summarization client based on configuration.
pub fn get_summarization_client(config: &Config) -> Box<dyn SummarizationClient> {
    match config.summarization_provider {
        SummarizationProvider::Extractive => Box::new(ExtractiveSummarizationClient),
        SummarizationProvider::Ollama => Box::new(OllamaSummarizationClient::new(
            config.ollama_url.clone(),
            Duration::from_secs(config.http_timeout_secs.max(60)),
        )),
    }
}

/// Client for the Ollama `/api/generate` endpoint.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Build a client for the runtime at `base_url`.
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("medlit/summary")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for summarization");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

fn build_prompt(request: &SummarizationRequest) -> String {
    format!(
        "Summarize the following biomedical article text in one paragraph of {min} to {max} tokens. \
         Use only facts stated in the text.\n\n{text}",
        min = request.min_tokens,
        max = request.max_tokens,
        text = request.text,
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": build_prompt(&request),
            "stream": false,
            "options": {
                // Greedy decoding with a fixed seed keeps summaries reproducible.
                "temperature": 0.0,
                "seed": 0,
                "num_predict": request.max_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Deterministic summarizer that keeps the leading sentences of the input.
///
/// Sentences are taken until roughly `max_tokens` words have been used; the adapter applies
/// the exact token ceiling afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveSummarizationClient;

#[async_trait]
impl SummarizationClient for ExtractiveSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let summary = leading_sentences(&request.text, request.max_tokens);
        if summary.is_empty() {
            return Err(SummarizationClientError::GenerationFailed(
                "no sentences to extract".into(),
            ));
        }
        Ok(summary)
    }
}

fn leading_sentences(text: &str, max_words: usize) -> String {
    let mut picked: Vec<&str> = Vec::new();
    let mut used_words = 0usize;

    for sentence in split_sentences(text) {
        let words = sentence.split_whitespace().count();
        if !picked.is_empty() && used_words + words > max_words {
            break;
        }
        used_words += words;
        picked.push(sentence);
        if used_words >= max_words {
            break;
        }
    }

    picked.join(" ")
}

fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}
