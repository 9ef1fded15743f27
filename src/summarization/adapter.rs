//! Bounded summarization: truncated input, token-capped output, sentinel on failure.

use super::{SummarizationClient, SummarizationRequest, get_summarization_client};
use crate::config::Config;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Maximum number of characters of resolved text fed to the model.
pub const INPUT_CHAR_LIMIT: usize = 1000;
/// Token ceiling for generated summaries.
pub const OUTPUT_MAX_TOKENS: usize = 130;
/// Token floor requested from the model.
pub const OUTPUT_MIN_TOKENS: usize = 30;
/// Sentinel summary returned when the model call fails.
pub const SUMMARY_FAILED: &str = "Summary generation failed.";

/// Summary of one paper together with the exact input the model saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// PubMed identifier the summary belongs to.
    pub identifier: String,
    /// Generated summary, or [`SUMMARY_FAILED`].
    pub summary_text: String,
    /// Prefix of the resolved text passed to the model, at most [`INPUT_CHAR_LIMIT`] characters.
    pub truncated_input: String,
}

impl Summary {
    /// Whether the summary carries the failure sentinel.
    pub fn is_failure(&self) -> bool {
        self.summary_text == SUMMARY_FAILED
    }
}

/// Wraps a [`SummarizationClient`] behind a uniform, failure-free call.
///
/// The adapter is stateless across calls and safe to share between concurrent tasks.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn SummarizationClient>,
    model: String,
    encoding: Option<Arc<CoreBPE>>,
}

impl Summarizer {
    /// Build an adapter over an explicit client.
    pub fn new(client: Arc<dyn SummarizationClient>, model: impl Into<String>) -> Self {
        let encoding = match cl100k_base() {
            Ok(encoding) => Some(Arc::new(encoding)),
            Err(error) => {
                tracing::warn!(error = %error, "Tokenizer unavailable; counting words instead");
                None
            }
        };
        Self {
            client,
            model: model.into(),
            encoding,
        }
    }

    /// Build an adapter using the configured provider and model.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::from(get_summarization_client(config)),
            config.summarization_model.clone(),
        )
    }

    /// Summarize `text` for `identifier`.
    ///
    /// Never fails: provider errors and empty responses yield [`SUMMARY_FAILED`].
    pub async fn summarize(&self, identifier: &str, text: &str) -> Summary {
        let truncated_input = truncate_input(text);
        let request = SummarizationRequest {
            model: self.model.clone(),
            text: truncated_input.clone(),
            min_tokens: OUTPUT_MIN_TOKENS,
            max_tokens: OUTPUT_MAX_TOKENS,
        };

        let summary_text = match self.client.generate_summary(request).await {
            Ok(generated) => {
                let bounded = self.cap_tokens(generated.trim(), OUTPUT_MAX_TOKENS);
                if bounded.is_empty() {
                    tracing::warn!(pmid = identifier, "Summarizer returned empty output");
                    SUMMARY_FAILED.to_string()
                } else {
                    bounded
                }
            }
            Err(error) => {
                tracing::warn!(pmid = identifier, error = %error, "Summary generation failed");
                SUMMARY_FAILED.to_string()
            }
        };

        Summary {
            identifier: identifier.to_string(),
            summary_text,
            truncated_input,
        }
    }

    fn count_tokens(&self, text: &str) -> usize {
        match &self.encoding {
            Some(encoding) => encoding.encode_ordinary(text).len(),
            None => text.split_whitespace().count(),
        }
    }

    /// Keep the longest whole-word prefix of `text` within `max_tokens`.
    ///
    /// When even the first word is over budget (unspaced scripts, long URLs) the cut falls on
    /// a character boundary instead.
    fn cap_tokens(&self, text: &str, max_tokens: usize) -> String {
        if self.count_tokens(text) <= max_tokens {
            return text.to_string();
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        let low = self.longest_prefix(words.len(), max_tokens, |count| words[..count].join(" "));
        if low > 0 {
            return words[..low].join(" ");
        }

        let ends: Vec<usize> = text
            .char_indices()
            .map(|(index, ch)| index + ch.len_utf8())
            .collect();
        let chars = self.longest_prefix(ends.len(), max_tokens, |count| match count {
            0 => String::new(),
            count => text[..ends[count - 1]].to_string(),
        });
        match chars {
            0 => String::new(),
            count => text[..ends[count - 1]].trim_end().to_string(),
        }
    }

    /// Largest `count` in `0..=len` whose rendered prefix fits in `max_tokens`.
    fn longest_prefix(
        &self,
        len: usize,
        max_tokens: usize,
        prefix: impl Fn(usize) -> String,
    ) -> usize {
        let (mut low, mut high) = (0usize, len);
        while low < high {
            let mid = (low + high).div_ceil(2);
            if self.count_tokens(&prefix(mid)) <= max_tokens {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        low
    }
}

/// Keep the first [`INPUT_CHAR_LIMIT`] characters of `text`.
pub fn truncate_input(text: &str) -> String {
    match text.char_indices().nth(INPUT_CHAR_LIMIT) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarization::{ExtractiveSummarizationClient, SummarizationClientError};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingClient {
        reply: Result<String, String>,
        seen: Mutex<Vec<SummarizationRequest>>,
    }

    impl RecordingClient {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SummarizationClient for RecordingClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            self.seen.lock().await.push(request);
            self.reply
                .clone()
                .map_err(SummarizationClientError::GenerationFailed)
        }
    }

    #[tokio::test]
    async fn truncates_input_before_calling_model() {
        let client = RecordingClient::new(Ok("Short summary."));
        let summarizer = Summarizer::new(client.clone(), "bart");
        let text = "é".repeat(1500);

        let summary = summarizer.summarize("1", &text).await;

        assert_eq!(summary.truncated_input.chars().count(), INPUT_CHAR_LIMIT);
        assert!(text.starts_with(&summary.truncated_input));
        let seen = client.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, summary.truncated_input);
        assert_eq!(seen[0].model, "bart");
        assert_eq!(seen[0].max_tokens, OUTPUT_MAX_TOKENS);
        assert_eq!(seen[0].min_tokens, OUTPUT_MIN_TOKENS);
        assert_eq!(summary.summary_text, "Short summary.");
    }

    #[tokio::test]
    async fn short_input_is_passed_through() {
        let summarizer = Summarizer::new(RecordingClient::new(Ok("ok")), "m");
        let summary = summarizer.summarize("2", "Brief abstract.").await;
        assert_eq!(summary.truncated_input, "Brief abstract.");
        assert_eq!(summary.identifier, "2");
    }

    #[tokio::test]
    async fn model_failure_yields_sentinel() {
        let summarizer = Summarizer::new(RecordingClient::new(Err("model crashed")), "m");
        let summary = summarizer.summarize("3", "Some text.").await;
        assert_eq!(summary.summary_text, SUMMARY_FAILED);
        assert!(summary.is_failure());
        assert_eq!(summary.truncated_input, "Some text.");
    }

    #[tokio::test]
    async fn empty_model_output_yields_sentinel() {
        let summarizer = Summarizer::new(RecordingClient::new(Ok("   ")), "m");
        assert!(summarizer.summarize("4", "Some text.").await.is_failure());
    }

    #[tokio::test]
    async fn overlong_output_is_capped() {
        let long = "lactate ".repeat(400);
        let summarizer = Summarizer::new(RecordingClient::new(Ok(long.as_str())), "m");
        let summary = summarizer.summarize("5", "Some text.").await;
        assert!(!summary.is_failure());
        assert!(summarizer.count_tokens(&summary.summary_text) <= OUTPUT_MAX_TOKENS);
        assert!(long.starts_with(&summary.summary_text));
    }

    #[tokio::test]
    async fn unspaced_output_is_capped_on_character_boundary() {
        let long = "乳酸".repeat(200);
        let summarizer = Summarizer::new(RecordingClient::new(Ok(long.as_str())), "m");

        let summary = summarizer.summarize("7", "Some text.").await;

        assert!(!summary.is_failure());
        assert!(!summary.summary_text.is_empty());
        assert!(summarizer.count_tokens(&summary.summary_text) <= OUTPUT_MAX_TOKENS);
        assert!(long.starts_with(&summary.summary_text));
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_summaries() {
        let summarizer = Summarizer::new(Arc::new(ExtractiveSummarizationClient), "extractive");
        let text = "Sepsis is common. Lactate rises early. Mortality remains high.";
        let first = summarizer.summarize("6", text).await;
        let second = summarizer.summarize("6", text).await;
        assert_eq!(first, second);
    }
}
