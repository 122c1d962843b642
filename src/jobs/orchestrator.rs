use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::{AnalysisConfig, Config};
use crate::entities::{AnalysisJob, JobState, PageDocument, PageFeatures};
use crate::error::AppError;
use crate::features::{compute_relevance, extract_features_with, DEFAULT_MAX_RELEVANCE_TERMS};
use crate::jobs::store::JobStore;
use crate::llm::OpenAiClient;
use crate::report::{Report, ReportGenerator, ReportInput};
use crate::scraper::Scraper;
use crate::search::{GoogleSearchApi, SearchClient};

/// Distinctive TF-IDF terms passed along per page.
const DISTINCTIVE_TERMS_PER_PAGE: usize = 10;

/// A validated analysis request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub target_url: String,
    pub query: String,
}

impl AnalysisRequest {
    /// Reject malformed input before any job exists.
    pub fn validate(target_url: &str, query: &str) -> Result<Self, AppError> {
        let url = Url::parse(target_url.trim())
            .map_err(|e| AppError::InvalidRequest(format!("target_url is not a valid URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::InvalidRequest(
                "target_url must use http or https".to_string(),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(AppError::InvalidRequest("target_url must include a host".to_string()));
        }

        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("query must not be empty".to_string()));
        }

        Ok(Self {
            target_url: url.to_string(),
            query: query.to_string(),
        })
    }
}

/// Conditions with no usable partial result; they fail the job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("No search results found for query '{0}'")]
    NoSearchResults(String),

    #[error("Could not scrape any competitor pages")]
    NoCompetitorPages,

    #[error("Report generation failed: {0}")]
    Report(String),
}

/// Runs analysis jobs: search, scrape, extract features, report.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    search: SearchClient,
    scraper: Scraper,
    reports: ReportGenerator,
    settings: AnalysisConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        search: SearchClient,
        scraper: Scraper,
        reports: ReportGenerator,
        settings: AnalysisConfig,
    ) -> Self {
        Self {
            store,
            search,
            scraper,
            reports,
            settings,
        }
    }

    /// Wire up the production collaborators described by `config`.
    pub fn from_config(config: &Config, store: Arc<dyn JobStore>) -> Result<Self, AppError> {
        let search_api = GoogleSearchApi::new(&config.search)
            .map_err(|e| AppError::InternalError(format!("failed to build search client: {}", e)))?;
        let scraper = Scraper::from_config(&config.scrape)
            .map_err(|e| AppError::InternalError(format!("failed to build scraper: {}", e)))?;
        let llm = OpenAiClient::new(&config.llm)
            .map_err(|e| AppError::InternalError(format!("failed to build LLM client: {}", e)))?;

        Ok(Self::new(
            store,
            SearchClient::new(Arc::new(search_api), config.search.candidates),
            scraper,
            ReportGenerator::new(Arc::new(llm)).with_prompt_keywords(config.analysis.prompt_keywords),
            config.analysis.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Record a new PENDING job for `request` and return it.
    pub fn create_job(&self, request: &AnalysisRequest) -> Result<AnalysisJob, AppError> {
        let job = AnalysisJob::new(Uuid::new_v4().to_string(), &request.target_url, &request.query);
        self.store
            .insert(job.clone())
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        Ok(job)
    }

    /// Create the job, then run the workflow in the background. The job is
    /// visible as PENDING before this returns.
    pub fn submit(&self, request: AnalysisRequest) -> Result<AnalysisJob, AppError> {
        let job = self.create_job(&request)?;

        let orchestrator = self.clone();
        let job_id = job.job_id.clone();
        tokio::spawn(async move {
            orchestrator.run(&job_id, &request).await;
        });

        tracing::info!("Job {}: Created and queued.", job.job_id);
        Ok(job)
    }

    /// Drive one job from PENDING to a terminal state and return its final
    /// record.
    #[tracing::instrument(skip(self, request), fields(job_id = %job_id, query = %request.query, target = %request.target_url))]
    pub async fn run(&self, job_id: &str, request: &AnalysisRequest) -> Option<AnalysisJob> {
        if let Err(e) = self.store.transition(job_id, JobState::Running) {
            tracing::error!("Job {}: could not start: {}", job_id, e);
            return self.store.get(job_id);
        }
        tracing::info!("Job {}: Workflow started", job_id);

        let outcome = AssertUnwindSafe(self.execute(job_id, request)).catch_unwind().await;

        let next = match outcome {
            Ok(Ok(report)) => {
                tracing::info!("Job {}: Workflow complete. Storing report.", job_id);
                JobState::Complete { report }
            }
            Ok(Err(e)) => {
                tracing::error!("Job {}: Workflow failed. Error: {}", job_id, e);
                JobState::Failed { error: e.to_string() }
            }
            Err(_) => {
                tracing::error!("Job {}: Workflow panicked", job_id);
                JobState::Failed {
                    error: "Internal error while running analysis".to_string(),
                }
            }
        };

        match self.store.transition(job_id, next) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::error!("Job {}: could not record result: {}", job_id, e);
                self.store.get(job_id)
            }
        }
    }

    async fn execute(&self, job_id: &str, request: &AnalysisRequest) -> Result<serde_json::Value, WorkflowError> {
        tracing::info!("Job {}: Starting search", job_id);
        let results = self.search.search(&request.query, self.settings.competitor_count).await;
        if results.is_empty() {
            return Err(WorkflowError::NoSearchResults(request.query.clone()));
        }
        let competitor_urls: Vec<String> = results.into_iter().map(|r| r.url).collect();
        tracing::info!("Job {}: Found competitors: {:?}", job_id, competitor_urls);

        tracing::info!("Job {}: Starting scraping", job_id);
        let target_page = self.scraper.scrape(&request.target_url).await;
        if let Some(error) = &target_page.error {
            tracing::warn!("Job {}: Target page scrape failed: {}. Continuing...", job_id, error);
        }

        // join_all keeps search-rank order
        let scraped = join_all(competitor_urls.iter().map(|url| self.scraper.scrape(url))).await;
        let competitor_pages: Vec<PageDocument> = scraped
            .into_iter()
            .filter(|page| match &page.error {
                Some(error) => {
                    tracing::warn!("Job {}: Competitor scrape failed: {} ({}). Skipping.", job_id, page.url, error);
                    false
                }
                None => true,
            })
            .collect();

        if competitor_pages.is_empty() {
            return Err(WorkflowError::NoCompetitorPages);
        }

        tracing::info!("Job {}: Starting feature extraction", job_id);
        let top_keywords = self.settings.top_keywords;
        let target_features = if target_page.is_ok() {
            extract_features_with(&target_page, top_keywords)
        } else {
            PageFeatures::placeholder(&target_page.url)
        };
        let competitor_features: Vec<PageFeatures> = competitor_pages
            .iter()
            .map(|page| extract_features_with(page, top_keywords))
            .collect();

        let contents: Vec<&str> = std::iter::once(&target_page)
            .chain(competitor_pages.iter())
            .map(|page| page.main_content.as_str())
            .collect();
        let relevance = compute_relevance(&contents, DEFAULT_MAX_RELEVANCE_TERMS);
        let distinctive_terms: Vec<Vec<String>> = relevance
            .doc_scores
            .iter()
            .map(|scores| {
                scores
                    .iter()
                    .take(DISTINCTIVE_TERMS_PER_PAGE)
                    .map(|s| s.term.clone())
                    .collect()
            })
            .collect();

        tracing::info!("Job {}: Starting report generation", job_id);
        let report = self
            .reports
            .generate_with(ReportInput {
                target_page: &target_page,
                target_features: &target_features,
                competitor_pages: &competitor_pages,
                competitor_features: &competitor_features,
                distinctive_terms: Some(distinctive_terms.as_slice()),
            })
            .await;

        match report {
            Report::Generated(report) => Ok(report),
            Report::Error(error) => Err(WorkflowError::Report(error)),
        }
    }
}
