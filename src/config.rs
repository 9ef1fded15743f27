use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_PUBMED_ARTICLE_BASE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARIZATION_MODEL: &str = "llama3.2";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the literature search service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the NCBI E-utilities endpoints (esearch, esummary, elink, efetch).
    pub eutils_base_url: String,
    /// Base URL used to derive the public article link for each identifier.
    pub pubmed_article_base_url: String,
    /// Optional NCBI API key raising the upstream rate limit.
    pub ncbi_api_key: Option<String>,
    /// Timeout applied to every outbound HTTP request, in seconds.
    pub http_timeout_secs: u64,
    /// Maximum number of identifiers resolved concurrently for one query.
    pub search_concurrency: usize,
    /// `max_results` applied when a request omits it.
    pub search_default_max_results: usize,
    /// Upper bound applied to the requested `max_results`.
    pub search_max_results_cap: usize,
    /// Summarization backend used for every paper.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the summarization provider.
    pub summarization_model: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Local Ollama runtime generating abstractive summaries.
    Ollama,
    /// Deterministic leading-sentence summaries without a model runtime.
    Extractive,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eutils_base_url: DEFAULT_EUTILS_BASE_URL.to_string(),
            pubmed_article_base_url: DEFAULT_PUBMED_ARTICLE_BASE_URL.to_string(),
            ncbi_api_key: None,
            http_timeout_secs: 15,
            search_concurrency: 3,
            search_default_max_results: 5,
            search_max_results_cap: 20,
            summarization_provider: SummarizationProvider::Ollama,
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            server_port: 6002,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Every variable is optional; unset or blank values keep the defaults from [`Config::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            eutils_base_url: load_env_optional("EUTILS_BASE_URL")
                .unwrap_or(defaults.eutils_base_url),
            pubmed_article_base_url: load_env_optional("PUBMED_ARTICLE_BASE_URL")
                .unwrap_or(defaults.pubmed_article_base_url),
            ncbi_api_key: load_env_optional("NCBI_API_KEY"),
            http_timeout_secs: load_parsed("HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout_secs),
            search_concurrency: load_parsed::<usize>("SEARCH_CONCURRENCY")?
                .map(|value| value.max(1))
                .unwrap_or(defaults.search_concurrency),
            search_default_max_results: load_parsed("SEARCH_DEFAULT_MAX_RESULTS")?
                .unwrap_or(defaults.search_default_max_results),
            search_max_results_cap: load_parsed("SEARCH_MAX_RESULTS_CAP")?
                .unwrap_or(defaults.search_max_results_cap),
            summarization_provider: load_env_optional("SUMMARIZATION_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(defaults.summarization_provider),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            server_port: load_parsed("SERVER_PORT")?.unwrap_or(defaults.server_port),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "extractive" | "none" => Ok(Self::Extractive),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        eutils = %config.eutils_base_url,
        has_api_key = config.ncbi_api_key.is_some(),
        concurrency = config.search_concurrency,
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        server_port = config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
