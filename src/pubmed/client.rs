//! HTTP client for the NCBI E-utilities endpoints.

use crate::config::{Config, get_config};
use crate::pubmed::types::{
    AbstractDocument, DocumentSummary, ELinkResponse, ESearchResponse, ESummaryResponse, Metadata,
    PubMedError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Link set naming the open-access PMC copy of a PubMed record.
const PMC_LINKNAME: &str = "pubmed_pmc";

/// The four lookups the pipeline performs against the bibliographic index.
///
/// Every method issues at most one outbound request and performs no retries.
#[async_trait]
pub trait LiteratureIndex: Send + Sync {
    /// Return up to `max_results` identifiers for `query`, in upstream relevance order.
    async fn search_identifiers(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, PubMedError>;

    /// Fetch bibliographic metadata, substituting placeholders for missing fields.
    async fn fetch_metadata(&self, identifier: &str) -> Result<Metadata, PubMedError>;

    /// Map an identifier to its open-access full-text identifier, if one exists.
    async fn resolve_cross_reference(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, PubMedError>;

    /// Fetch raw full-text markup; `None` on any non-success status.
    async fn fetch_full_text(
        &self,
        full_text_identifier: &str,
    ) -> Result<Option<String>, PubMedError>;

    /// Fetch the abstract markup; only transport failures are errors.
    async fn fetch_abstract_markup(
        &self,
        identifier: &str,
    ) -> Result<AbstractDocument, PubMedError>;
}

/// Lightweight E-utilities client shared by every query.
pub struct PubMedClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl PubMedClient {
    /// Construct a new client using the global configuration.
    pub fn new() -> Result<Self, PubMedError> {
        Self::from_config(get_config())
    }

    /// Construct a client from an explicit configuration.
    pub fn from_config(config: &Config) -> Result<Self, PubMedError> {
        let client = Client::builder()
            .user_agent("medlit/0.1")
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        let base_url =
            normalize_base_url(&config.eutils_base_url).map_err(PubMedError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = config.ncbi_api_key.is_some(),
            timeout_secs = config.http_timeout_secs,
            "Initialized E-utilities HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.ncbi_api_key.clone(),
        })
    }

    fn request(&self, endpoint: &str, params: &[(&str, &str)]) -> RequestBuilder {
        let url = format_endpoint(&self.base_url, endpoint);
        let mut req = self.client.get(url).query(params);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.query(&[("api_key", api_key.as_str())]);
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PubMedError> {
        let response = self.request(endpoint, params).send().await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|error| PubMedError::Decode(format!("{endpoint}: {error}")))
    }
}

#[async_trait]
impl LiteratureIndex for PubMedClient {
    async fn search_identifiers(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, PubMedError> {
        let retmax = max_results.to_string();
        let payload: ESearchResponse = self
            .get_json(
                "esearch.fcgi",
                &[
                    ("db", "pubmed"),
                    ("term", query),
                    ("retmax", &retmax),
                    ("retmode", "json"),
                ],
            )
            .await
            .inspect_err(|error| tracing::error!(error = %error, "PubMed esearch failed"))?;

        let mut ids = payload.esearchresult.idlist;
        ids.truncate(max_results);
        tracing::debug!(count = ids.len(), ?ids, "PubMed esearch returned identifiers");
        Ok(ids)
    }

    async fn fetch_metadata(&self, identifier: &str) -> Result<Metadata, PubMedError> {
        let payload: ESummaryResponse = self
            .get_json(
                "esummary.fcgi",
                &[("db", "pubmed"), ("id", identifier), ("retmode", "json")],
            )
            .await?;

        let Some(value) = payload.result.get(identifier) else {
            tracing::debug!(pmid = identifier, "No document summary; using placeholders");
            return Ok(Metadata::placeholder(identifier));
        };
        match serde_json::from_value::<DocumentSummary>(value.clone()) {
            Ok(summary) => Ok(summary.into_metadata(identifier)),
            Err(error) => {
                tracing::warn!(
                    pmid = identifier,
                    error = %error,
                    "Unexpected document summary shape; using placeholders"
                );
                Ok(Metadata::placeholder(identifier))
            }
        }
    }

    async fn resolve_cross_reference(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, PubMedError> {
        let payload: ELinkResponse = self
            .get_json(
                "elink.fcgi",
                &[
                    ("dbfrom", "pubmed"),
                    ("db", "pmc"),
                    ("id", identifier),
                    ("retmode", "json"),
                ],
            )
            .await?;

        let pmcid = select_pmc_link(payload);
        tracing::debug!(pmid = identifier, pmcid = ?pmcid, "Resolved PMC cross-reference");
        Ok(pmcid)
    }

    async fn fetch_full_text(
        &self,
        full_text_identifier: &str,
    ) -> Result<Option<String>, PubMedError> {
        let id = full_text_identifier
            .strip_prefix("PMC")
            .unwrap_or(full_text_identifier);
        let response = self
            .request(
                "efetch.fcgi",
                &[("db", "pmc"), ("id", id), ("retmode", "xml")],
            )
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(
                pmcid = full_text_identifier,
                status = %response.status(),
                "PMC full text unavailable"
            );
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }

    async fn fetch_abstract_markup(
        &self,
        identifier: &str,
    ) -> Result<AbstractDocument, PubMedError> {
        let response = self
            .request(
                "efetch.fcgi",
                &[("db", "pubmed"), ("id", identifier), ("retmode", "xml")],
            )
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(
                pmid = identifier,
                status = %response.status(),
                "PubMed abstract unavailable"
            );
            return Ok(AbstractDocument::Unavailable);
        }
        Ok(AbstractDocument::Markup(response.text().await?))
    }
}

/// Take the first link of the `pubmed_pmc` link set.
///
/// Other PMC link sets (`pubmed_pmc_refs`, `pubmed_pmc_local`) point at citing or related
/// articles and are ignored.
fn select_pmc_link(payload: ELinkResponse) -> Option<String> {
    payload
        .linksets
        .into_iter()
        .flat_map(|set| set.linksetdbs)
        .find(|db| db.linkname.as_deref() == Some(PMC_LINKNAME))?
        .links
        .into_iter()
        .map(stringify_link)
        .find(|link| !link.is_empty())
        .map(|link| format!("PMC{}", link.trim_start_matches("PMC")))
}

async fn ensure_success(response: Response) -> Result<Response, PubMedError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(PubMedError::UnexpectedStatus { status, body })
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_link(link: Value) -> String {
    match link {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::types::{DEFAULT_SOURCE_NAME, MISSING_PUBLICATION_DATE, MISSING_TITLE};
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn client_for(server: &MockServer) -> PubMedClient {
        PubMedClient::from_config(&Config {
            eutils_base_url: server.base_url(),
            http_timeout_secs: 5,
            ..Config::default()
        })
        .expect("client")
    }

    #[tokio::test]
    async fn search_identifiers_preserves_upstream_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/esearch.fcgi")
                    .query_param("db", "pubmed")
                    .query_param("term", "septic shock")
                    .query_param("retmax", "3")
                    .query_param("retmode", "json");
                then.status(200).json_body(json!({
                    "esearchresult": { "count": "3", "idlist": ["30", "10", "20"] }
                }));
            })
            .await;

        let ids = client_for(&server)
            .search_identifiers("septic shock", 3)
            .await
            .expect("identifiers");

        mock.assert_async().await;
        assert_eq!(ids, vec!["30", "10", "20"]);
    }

    #[tokio::test]
    async fn search_identifiers_fails_on_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/esearch.fcgi");
                then.status(503).body("busy");
            })
            .await;

        let error = client_for(&server)
            .search_identifiers("sepsis", 5)
            .await
            .expect_err("status error");
        assert!(
            matches!(error, PubMedError::UnexpectedStatus { status, .. } if status.as_u16() == 503)
        );
    }

    #[tokio::test]
    async fn api_key_is_forwarded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/esearch.fcgi")
                    .query_param("api_key", "secret");
                then.status(200)
                    .json_body(json!({ "esearchresult": { "idlist": [] } }));
            })
            .await;

        let client = PubMedClient::from_config(&Config {
            eutils_base_url: server.base_url(),
            ncbi_api_key: Some("secret".into()),
            ..Config::default()
        })
        .expect("client");
        let ids = client.search_identifiers("sepsis", 0).await.expect("ids");

        mock.assert_async().await;
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn fetch_metadata_fills_placeholders() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/esummary.fcgi").query_param("id", "42");
                then.status(200).json_body(json!({
                    "result": {
                        "uids": ["42"],
                        "42": {
                            "authors": [{ "name": "Doe J" }, { "authtype": "CollectiveName" }, { "name": "Roe K" }]
                        }
                    }
                }));
            })
            .await;

        let metadata = client_for(&server).fetch_metadata("42").await.expect("metadata");

        assert_eq!(metadata.identifier, "42");
        assert_eq!(metadata.title, MISSING_TITLE);
        assert_eq!(metadata.authors, vec!["Doe J", "Roe K"]);
        assert_eq!(metadata.publication_date, MISSING_PUBLICATION_DATE);
        assert_eq!(metadata.source_name, DEFAULT_SOURCE_NAME);
    }

    #[tokio::test]
    async fn fetch_metadata_without_document_uses_placeholders() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/esummary.fcgi");
                then.status(200)
                    .json_body(json!({ "result": { "uids": [] } }));
            })
            .await;

        let metadata = client_for(&server).fetch_metadata("9").await.expect("metadata");
        assert_eq!(metadata, Metadata::placeholder("9"));
        assert_eq!(metadata.title, MISSING_TITLE);
        assert!(metadata.authors.is_empty());
    }

    #[tokio::test]
    async fn fetch_metadata_reads_document_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/esummary.fcgi");
                then.status(200).json_body(json!({
                    "result": {
                        "7": {
                            "title": "Lactate clearance",
                            "authors": [{ "name": "Smith A" }],
                            "pubdate": "2023 Jan",
                            "source": "Crit Care"
                        }
                    }
                }));
            })
            .await;

        let metadata = client_for(&server).fetch_metadata("7").await.expect("metadata");
        assert_eq!(metadata.title, "Lactate clearance");
        assert_eq!(metadata.authors, vec!["Smith A"]);
        assert_eq!(metadata.publication_date, "2023 Jan");
        assert_eq!(metadata.source_name, "Crit Care");
    }

    #[tokio::test]
    async fn cross_reference_prefers_pmc_link_set() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/elink.fcgi")
                    .query_param("dbfrom", "pubmed")
                    .query_param("db", "pmc");
                then.status(200).json_body(json!({
                    "linksets": [{
                        "linksetdbs": [
                            { "linkname": "pubmed_pmc_refs", "links": ["999"] },
                            { "linkname": "pubmed_pmc", "links": [12345] }
                        ]
                    }]
                }));
            })
            .await;

        let pmcid = client_for(&server)
            .resolve_cross_reference("1")
            .await
            .expect("elink");
        assert_eq!(pmcid.as_deref(), Some("PMC12345"));
    }

    #[tokio::test]
    async fn citing_articles_are_not_a_cross_reference() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/elink.fcgi");
                then.status(200).json_body(json!({
                    "linksets": [{
                        "linksetdbs": [
                            { "dbto": "pmc", "linkname": "pubmed_pmc_refs", "links": ["999"] }
                        ]
                    }]
                }));
            })
            .await;

        let pmcid = client_for(&server)
            .resolve_cross_reference("1")
            .await
            .expect("elink");
        assert_eq!(pmcid, None);
    }

    #[tokio::test]
    async fn cross_reference_absent_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/elink.fcgi");
                then.status(200)
                    .json_body(json!({ "linksets": [{ "dbfrom": "pubmed", "ids": ["1"] }] }));
            })
            .await;

        let pmcid = client_for(&server)
            .resolve_cross_reference("1")
            .await
            .expect("elink");
        assert_eq!(pmcid, None);
    }

    #[tokio::test]
    async fn full_text_non_success_is_none() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/efetch.fcgi")
                    .query_param("db", "pmc")
                    .query_param("id", "555");
                then.status(404);
            })
            .await;

        let body = client_for(&server)
            .fetch_full_text("PMC555")
            .await
            .expect("fetch");
        mock.assert_async().await;
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn abstract_non_success_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/efetch.fcgi")
                    .query_param("db", "pubmed");
                then.status(500);
            })
            .await;

        let document = client_for(&server)
            .fetch_abstract_markup("9")
            .await
            .expect("fetch");
        assert_eq!(document, AbstractDocument::Unavailable);
    }

    #[tokio::test]
    async fn abstract_transport_failure_is_error() {
        let client = PubMedClient::from_config(&Config {
            eutils_base_url: "http://127.0.0.1:9".into(),
            http_timeout_secs: 2,
            ..Config::default()
        })
        .expect("client");

        let error = client
            .fetch_abstract_markup("9")
            .await
            .expect_err("transport error");
        assert!(matches!(error, PubMedError::Http(_)));
    }

    #[test]
    fn endpoint_formatting_trims_slashes() {
        assert_eq!(
            format_endpoint("http://host/entrez/eutils/", "/esearch.fcgi"),
            "http://host/entrez/eutils/esearch.fcgi"
        );
        assert!(normalize_base_url("not a url").is_err());
    }
}
