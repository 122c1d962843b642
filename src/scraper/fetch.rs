use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

use crate::config::ScrapeConfig;

/// Browser-like User-Agent; plenty of sites refuse obvious bots.
pub const SPOOFED_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Raw HTML plus the HTTP status it came with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected fetch error: {0}")]
    Other(String),
}

impl FetchError {
    /// Status recorded on a [`crate::entities::PageDocument`] built from this error.
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Timeout => 408,
            FetchError::Status(code) => *code,
            FetchError::Network(_) | FetchError::Other(_) => 500,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_connect() || err.is_request() || err.is_redirect() {
            FetchError::Network(err.to_string())
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

/// Something that can turn a URL into HTML within its own time budget.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Plain HTTP GET. Cheap, but sees only server-rendered markup.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(SPOOFED_USER_AGENT)
            .default_headers(headers)
            .redirect(Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let html = response.text().await?;
        Ok(FetchedPage {
            html,
            status: status.as_u16(),
        })
    }
}

/// Full browser render through a Browserless `/content` endpoint, waiting
/// for the network to go idle before taking the DOM.
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    render_timeout: Duration,
}

impl BrowserlessFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        // Leave Browserless a moment to report its own navigation timeout
        let client = reqwest::Client::builder()
            .timeout(config.render_timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.browserless_url.trim_end_matches('/').to_string(),
            token: config.browserless_token.clone(),
            render_timeout: config.render_timeout,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let endpoint = format!("{}/content", self.base_url);
        let body = serde_json::json!({
            "url": url,
            "userAgent": SPOOFED_USER_AGENT,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": self.render_timeout.as_millis() as u64,
            },
        });

        let mut request = self.client.post(&endpoint);
        if let Some(ref token) = self.token {
            request = request.query(&[("token", token.as_str())]);
        }

        let response = request
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let service_status = response.status();
        if !service_status.is_success() {
            let message = response.text().await.unwrap_or_default();
            // Browserless answers 408 when the page itself timed out
            if service_status == reqwest::StatusCode::REQUEST_TIMEOUT || message.contains("TimeoutError") {
                return Err(FetchError::Timeout);
            }
            return Err(FetchError::Other(format!(
                "render service returned {}: {}",
                service_status, message
            )));
        }

        // Status of the target page, when the service passes it through
        let status = response
            .headers()
            .get("x-response-code")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or_else(|| service_status.as_u16());

        let html = response.text().await?;
        Ok(FetchedPage { html, status })
    }
}
