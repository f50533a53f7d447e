use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::wire::{DuckDuckGoResponse, DuckDuckGoTopic, SerperResponse, TavilyResponse};

const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com";
const TAVILY_ENDPOINT: &str = "https://api.tavily.com";
const SERPER_ENDPOINT: &str = "https://google.serper.dev";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("unknown search provider: {0}")]
    UnknownProvider(String),
    #[error("search request failed: {0}")]
    Provider(String),
    #[error("invalid search response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub relevance_score: Option<f64>,
    pub source: String,
}

#[derive(Debug, Clone)]
pub enum SearchBackend {
    DuckDuckGo,
    Tavily { api_key: String },
    Serper { api_key: String },
}

impl SearchBackend {
    /// Resolves a configured provider name plus optional key; key-requiring
    /// providers fail here, not mid-run.
    pub fn parse(name: &str, api_key: Option<&str>) -> Result<Self, SearchError> {
        let key = || {
            api_key
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SearchError::MissingApiKey {
                    provider: name.to_string(),
                })
        };
        match name {
            "duckduckgo" => Ok(SearchBackend::DuckDuckGo),
            "tavily" => Ok(SearchBackend::Tavily { api_key: key()? }),
            "serper" => Ok(SearchBackend::Serper { api_key: key()? }),
            other => Err(SearchError::UnknownProvider(other.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SearchBackend::DuckDuckGo => "duckduckgo",
            SearchBackend::Tavily { .. } => "tavily",
            SearchBackend::Serper { .. } => "serper",
        }
    }
}

/// The search seam research agents depend on.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

pub struct SearchProvider {
    backend: SearchBackend,
    max_results: usize,
    endpoint: String,
    http: reqwest::Client,
}

impl SearchProvider {
    pub fn new(backend: SearchBackend, max_results: usize) -> Result<Self, SearchError> {
        let endpoint = match &backend {
            SearchBackend::DuckDuckGo => DUCKDUCKGO_ENDPOINT,
            SearchBackend::Tavily { .. } => TAVILY_ENDPOINT,
            SearchBackend::Serper { .. } => SERPER_ENDPOINT,
        }
        .to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| SearchError::Provider(err.to_string()))?;
        Ok(Self {
            backend,
            max_results,
            endpoint,
            http,
        })
    }

    /// Points the provider at a different host; for tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// True when a probe query answers.
    pub async fn test_connection(&self) -> bool {
        match self.search("test query", 1).await {
            Ok(results) => !results.is_empty(),
            Err(_) => false,
        }
    }

    async fn search_duckduckgo(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/", self.endpoint);
        let body: DuckDuckGoResponse = self
            .http
            .get(url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .error_for_status()
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;

        let mut results = Vec::new();
        if !body.abstract_text.is_empty() && !body.abstract_url.is_empty() {
            results.push(SearchResult {
                title: body.heading.clone(),
                url: body.abstract_url.clone(),
                snippet: body.abstract_text.clone(),
                relevance_score: None,
                source: "duckduckgo".to_string(),
            });
        }
        collect_topics(&body.related_topics, &mut results, max_results);
        results.truncate(max_results);
        Ok(results)
    }

    async fn search_tavily(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.endpoint);
        let payload = json!({
            "api_key": api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
            "include_answer": false,
            "include_raw_content": false,
        });
        let body: TavilyResponse = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .error_for_status()
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(|item| SearchResult {
                title: item.title,
                url: item.url,
                snippet: item.content,
                relevance_score: item.score,
                source: "tavily".to_string(),
            })
            .collect())
    }

    async fn search_serper(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.endpoint);
        let payload = json!({ "q": query, "num": max_results });
        let body: SerperResponse = self
            .http
            .post(url)
            .header("X-API-KEY", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .error_for_status()
            .map_err(|err| SearchError::Provider(err.to_string()))?
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;

        Ok(body
            .organic
            .into_iter()
            .take(max_results)
            .map(|item| SearchResult {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
                relevance_score: None,
                source: "serper".to_string(),
            })
            .collect())
    }
}

fn collect_topics(topics: &[DuckDuckGoTopic], out: &mut Vec<SearchResult>, max_results: usize) {
    for topic in topics {
        if out.len() >= max_results {
            return;
        }
        match topic {
            DuckDuckGoTopic::Leaf { text, first_url } => {
                if first_url.is_empty() {
                    continue;
                }
                // The leaf text is "Title - snippet" in one field.
                let (title, snippet) = match text.split_once(" - ") {
                    Some((title, snippet)) => (title.to_string(), snippet.to_string()),
                    None => (text.clone(), String::new()),
                };
                out.push(SearchResult {
                    title,
                    url: first_url.clone(),
                    snippet,
                    relevance_score: None,
                    source: "duckduckgo".to_string(),
                });
            }
            DuckDuckGoTopic::Group { topics, .. } => collect_topics(topics, out, max_results),
            DuckDuckGoTopic::Other(_) => {}
        }
    }
}

#[async_trait]
impl Searcher for SearchProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let max_results = if max_results == 0 {
            self.max_results
        } else {
            max_results
        };
        match &self.backend {
            SearchBackend::DuckDuckGo => self.search_duckduckgo(query, max_results).await,
            SearchBackend::Tavily { api_key } => {
                self.search_tavily(query, max_results, api_key).await
            }
            SearchBackend::Serper { api_key } => {
                self.search_serper(query, max_results, api_key).await
            }
        }
    }
}

/// Runs every query, tolerating individual failures: a failed query maps to
/// an empty result list and a warning, never an aborted batch.
pub async fn search_multiple_queries(
    searcher: &dyn Searcher,
    queries: &[String],
    max_results_per_query: usize,
) -> HashMap<String, Vec<SearchResult>> {
    let mut results_by_query = HashMap::new();
    for query in queries {
        match searcher.search(query, max_results_per_query).await {
            Ok(results) => {
                results_by_query.insert(query.clone(), results);
            }
            Err(err) => {
                tracing::warn!(query = %query, error = %err, "search query failed");
                results_by_query.insert(query.clone(), Vec::new());
            }
        }
    }
    results_by_query
}

/// Drops repeated URLs, keeping first occurrences in order.
pub fn deduplicate_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| !result.url.is_empty() && seen.insert(result.url.clone()))
        .collect()
}
