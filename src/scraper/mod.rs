//! Two-strategy page scraping: a plain HTTP fetch first, a full browser render
//! when that fails or the result looks like an empty script-rendered shell.

pub mod fetch;

pub use fetch::{BrowserlessFetcher, FetchError, FetchedPage, HttpFetcher, PageFetcher, SPOOFED_USER_AGENT};

use std::sync::Arc;

use crate::config::ScrapeConfig;
use crate::entities::PageDocument;
use crate::extractor;

/// When a fast fetch succeeds but looks like it came back without content.
///
/// This is only a guess that the page is rendered client-side: a short page
/// with no H1 is also what a genuinely thin page looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LowContentHeuristic {
    pub min_words: usize,
    pub require_missing_h1: bool,
}

impl LowContentHeuristic {
    pub fn looks_unrendered(&self, page: &PageDocument) -> bool {
        page.word_count < self.min_words && (!self.require_missing_h1 || page.h1.is_none())
    }
}

impl From<&ScrapeConfig> for LowContentHeuristic {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            min_words: config.min_words,
            require_missing_h1: config.fallback_requires_missing_h1,
        }
    }
}

#[derive(Clone)]
pub struct Scraper {
    fast: Arc<dyn PageFetcher>,
    render: Arc<dyn PageFetcher>,
    heuristic: LowContentHeuristic,
}

impl Scraper {
    pub fn new(fast: Arc<dyn PageFetcher>, render: Arc<dyn PageFetcher>, heuristic: LowContentHeuristic) -> Self {
        Self { fast, render, heuristic }
    }

    /// Build the production scraper: `reqwest` for the fast path, Browserless
    /// for rendering.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, FetchError> {
        let fast = HttpFetcher::new(config.fetch_timeout)?;
        let render = BrowserlessFetcher::new(config)?;
        Ok(Self::new(Arc::new(fast), Arc::new(render), LowContentHeuristic::from(config)))
    }

    /// Scrape `url` into a [`PageDocument`]. Never fails: problems end up in
    /// the document's `error` field.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn scrape(&self, url: &str) -> PageDocument {
        tracing::info!("Starting scrape for URL: {}", url);

        match self.fast.fetch(url).await {
            Ok(fetched) => {
                let page = parse_page(url, fetched.html, fetched.status).await;
                if page.is_ok() && self.heuristic.looks_unrendered(&page) {
                    tracing::warn!(
                        "Low word count ({}, h1 present: {}) for {}, possibly script rendered. Retrying with browser render.",
                        page.word_count,
                        page.h1.is_some(),
                        url
                    );
                    return self.scrape_rendered(url).await;
                }
                tracing::info!("Successfully scraped with plain HTTP: {}", url);
                page
            }
            Err(FetchError::Status(status)) => {
                tracing::warn!("Plain fetch for {} returned HTTP {}. Trying browser render.", url, status);
                self.scrape_rendered(url).await
            }
            Err(e) => {
                tracing::warn!("Plain fetch failed for {} ({}). Trying browser render.", url, e);
                self.scrape_rendered(url).await
            }
        }
    }

    /// The fallback path. Any failure here is final.
    async fn scrape_rendered(&self, url: &str) -> PageDocument {
        tracing::info!("Using browser render fallback for: {}", url);

        match self.render.fetch(url).await {
            Ok(fetched) if fetched.status == 200 => {
                tracing::info!("Browser render fetched: {}", url);
                parse_page(url, fetched.html, fetched.status).await
            }
            Ok(fetched) => {
                tracing::error!("Browser render failed to load {}. Status: {}", url, fetched.status);
                PageDocument::failed(url, fetched.status, format!("Render fetch received status {}", fetched.status))
            }
            Err(FetchError::Timeout) => {
                tracing::error!("Browser render timed out for {}", url);
                PageDocument::failed(url, FetchError::Timeout.status_code(), "Render fetch timed out")
            }
            Err(e) => {
                tracing::error!("Browser render error for {}: {}", url, e);
                PageDocument::failed(url, e.status_code(), format!("Render fetch error: {}", e))
            }
        }
    }
}

/// Run the extractor on the blocking pool; HTML parsing is CPU bound.
async fn parse_page(url: &str, html: String, status: u16) -> PageDocument {
    let processing_span = tracing::info_span!("parse_html", url = %url);
    let owned_url = url.to_string();

    let parsed = tokio::task::spawn_blocking(move || {
        let _enter = processing_span.enter();
        extractor::extract_document(&owned_url, &html, status)
    })
    .await;

    match parsed {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to parse HTML for {}: {}", url, e);
            PageDocument::failed(url, status, format!("HTML parsing error: {}", e))
        }
    }
}
