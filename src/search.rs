//! Competitor discovery through a web search API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use utoipa::ToSchema;

use crate::config::SearchConfig;

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Search engine properties, social platforms, shorteners and encyclopedias.
/// Subdomains of these are excluded as well.
pub const EXCLUDED_DOMAINS: &[&str] = &[
    "google.com",
    "support.google.com",
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "pinterest.com",
    "reddit.com",
    "instagram.com",
    "wikipedia.org",
    "goo.gl",
    "t.co",
    "bit.ly",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// 1-based rank after filtering
    pub rank: usize,
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// One item as returned by the search API, before filtering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RawSearchItem {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search API credentials are not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("search API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed search API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Network(err.to_string())
        }
    }
}

/// Raw access to a search engine.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn fetch(&self, query: &str, num: usize) -> Result<Vec<RawSearchItem>, SearchError>;
}

/// Google Custom Search JSON API.
pub struct GoogleSearchApi {
    client: reqwest::Client,
    api_key: Option<String>,
    cx: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleSearchResponse {
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

impl GoogleSearchApi {
    pub fn new(config: &SearchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.google_api_key.clone(),
            cx: config.google_cx.clone(),
            base_url: GOOGLE_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl SearchApi for GoogleSearchApi {
    #[tracing::instrument(skip(self), fields(query = %query))]
    async fn fetch(&self, query: &str, num: usize) -> Result<Vec<RawSearchItem>, SearchError> {
        let (api_key, cx) = match (&self.api_key, &self.cx) {
            (Some(key), Some(cx)) => (key, cx),
            _ => return Err(SearchError::NotConfigured),
        };

        // The Custom Search API caps `num` at 10
        let num = num.clamp(1, 10).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", api_key.as_str()), ("cx", cx.as_str()), ("q", query), ("num", num.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<GoogleSearchResponse>().await?;
        Ok(body.items)
    }
}

/// Host of `url`, lowercased, without a leading `www.`.
pub fn normalize_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let domain = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

pub fn is_excluded_domain(domain: &str) -> bool {
    EXCLUDED_DOMAINS.iter().any(|excluded| {
        domain == *excluded
            || domain
                .strip_suffix(excluded)
                .map_or(false, |prefix| prefix.ends_with('.'))
    })
}

/// Keep the first result per domain, skip excluded domains, and rank the
/// survivors 1..=limit in API order.
pub fn filter_results(items: &[RawSearchItem], limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut seen_domains: HashSet<String> = HashSet::new();

    for item in items {
        if results.len() >= limit {
            break;
        }

        let Some(url) = item.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) else {
            tracing::debug!("Skipping search item without a link");
            continue;
        };

        let Some(domain) = normalize_domain(url) else {
            tracing::info!("Skipping invalid result URL: {}", url);
            continue;
        };

        if is_excluded_domain(&domain) {
            tracing::info!("Skipping excluded domain: {}", url);
            continue;
        }

        if !seen_domains.insert(domain) {
            tracing::info!("Skipping duplicate domain: {}", url);
            continue;
        }

        results.push(SearchResult {
            rank: results.len() + 1,
            url: url.to_string(),
            title: item.title.clone().unwrap_or_default(),
            snippet: item.snippet.clone().unwrap_or_default(),
        });
    }

    results
}

/// Ranked competitor lookup. API failures degrade to an empty list.
#[derive(Clone)]
pub struct SearchClient {
    api: Arc<dyn SearchApi>,
    candidates: usize,
}

impl SearchClient {
    pub fn new(api: Arc<dyn SearchApi>, candidates: usize) -> Self {
        Self { api, candidates }
    }

    #[tracing::instrument(skip(self), fields(query = %query, limit = %limit))]
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        tracing::info!("Starting search for query: '{}'", query);

        // Over-fetch so duplicate and excluded domains can be dropped
        let raw = match self.api.fetch(query, self.candidates.max(limit.saturating_mul(2))).await {
            Ok(items) => items,
            Err(SearchError::NotConfigured) => {
                tracing::error!("Search API credentials missing; returning no results");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!("Search API call failed: {}", e);
                return Vec::new();
            }
        };

        if raw.is_empty() {
            tracing::warn!("No results returned from search API for query: '{}'", query);
            return Vec::new();
        }

        let results = filter_results(&raw, limit);
        tracing::info!("Found {} valid results", results.len());
        results
    }
}
