//! Canned collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use seo_optimizer::config::AnalysisConfig;
use seo_optimizer::jobs::{InMemoryJobStore, Orchestrator};
use seo_optimizer::llm::{LlmError, ReasoningService};
use seo_optimizer::report::ReportGenerator;
use seo_optimizer::scraper::{FetchError, FetchedPage, LowContentHeuristic, PageFetcher, Scraper};
use seo_optimizer::search::{RawSearchItem, SearchApi, SearchClient, SearchError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A search API that always answers with the same items (or fails).
pub struct MockSearchApi {
    pub items: Vec<RawSearchItem>,
    pub fail: bool,
    pub calls: AtomicUsize,
    /// `num` passed on the most recent call.
    pub last_num: AtomicUsize,
}

impl MockSearchApi {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            items: links.iter().map(|link| item(link)).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_num: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_num: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchApi for MockSearchApi {
    async fn fetch(&self, _query: &str, num: usize) -> Result<Vec<RawSearchItem>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_num.store(num, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Api {
                status: 403,
                message: "quota exceeded".to_string(),
            });
        }
        Ok(self.items.clone())
    }
}

pub fn item(link: &str) -> RawSearchItem {
    RawSearchItem {
        link: Some(link.to_string()),
        title: Some(format!("Title for {}", link)),
        snippet: Some("snippet".to_string()),
    }
}

/// How a [`MockFetcher`] answers for one URL.
#[derive(Clone, Debug)]
pub enum Canned {
    Page(u16, String),
    HttpStatus(u16),
    Timeout,
    Network,
}

/// Fetcher that serves canned answers by URL and counts calls.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, Canned>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, answer: Canned) -> Self {
        self.pages.insert(url.to_string(), answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Canned::Page(status, html)) => Ok(FetchedPage {
                html: html.clone(),
                status: *status,
            }),
            Some(Canned::HttpStatus(status)) => Err(FetchError::Status(*status)),
            Some(Canned::Timeout) => Err(FetchError::Timeout),
            Some(Canned::Network) | None => Err(FetchError::Network("connection refused".to_string())),
        }
    }
}

/// Reasoning service with a fixed answer; records every prompt it receives.
pub struct MockReasoning {
    response: Result<String, String>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl MockReasoning {
    pub fn answering(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl ReasoningService for MockReasoning {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(message) => Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

pub const VALID_REPORT: &str = r#"{
  "node_1_keywords": {"performance_score": 70, "must_have_keywords": ["data science"], "trending_keywords": ["ai"]},
  "node_2_competitors": {"top_competitors": []},
  "node_3_content_rewrite": {"title": "MSc Data Science", "empower_paragraph": "Intro.", "why_choose_points": [], "seo_score": 80},
  "node_5_metadata": {"meta_title": "MSc Data Science UK", "meta_description": "Study data science.", "meta_keywords": ["msc"]},
  "final_scores": {"final_seo_score": 80, "final_readability": 75, "engagement_lift": 20, "avg_rank_improvement": 10}
}"#;

/// A server-rendered page with a title, an h1 and `words` body words.
pub fn article_html(title: &str, h1: &str, topic: &str, words: usize) -> String {
    let body: Vec<String> = (0..words)
        .map(|i| match i % 4 {
            0 => topic.to_string(),
            1 => "students".to_string(),
            2 => "learn".to_string(),
            _ => "analytics".to_string(),
        })
        .collect();
    format!(
        "<html><head><title>{}</title><meta name=\"description\" content=\"About {}\"></head>\
         <body><nav>Home Courses Contact</nav><main><h1>{}</h1><p>{}</p></main>\
         <footer>Copyright</footer></body></html>",
        title,
        topic,
        h1,
        body.join(" ")
    )
}

/// A client-side rendered shell: almost no text and no h1.
pub fn empty_shell_html() -> String {
    "<html><head><title>Loading</title></head><body><div id=\"root\"></div>\
     <script>window.app = true;</script></body></html>"
        .to_string()
}

pub fn heuristic() -> LowContentHeuristic {
    LowContentHeuristic {
        min_words: 100,
        require_missing_h1: true,
    }
}

/// Wire an orchestrator over in-memory mocks.
pub fn orchestrator(
    search: Arc<dyn SearchApi>,
    fast: Arc<dyn PageFetcher>,
    render: Arc<dyn PageFetcher>,
    llm: Arc<dyn ReasoningService>,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        SearchClient::new(search, 10),
        Scraper::new(fast, render, heuristic()),
        ReportGenerator::new(llm),
        AnalysisConfig::default(),
    )
}
