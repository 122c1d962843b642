use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod features;
pub mod jobs;
pub mod llm;
pub mod report;
pub mod routes;
pub mod scraper;
pub mod search;

use config::Config;
use jobs::Orchestrator;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SEO Optimizer API",
        version = "0.1.0",
        description = "Compares a page against the top search competitors for a query and returns an LLM-written SEO report."
    ),
    paths(
        health_check,
        routes::analysis::analyze,
        routes::analysis::get_results
    ),
    components(schemas(
        routes::analysis::AnalyzeRequest,
        routes::analysis::AnalyzeResponse,
        entities::ReportStatusResponse,
        entities::JobStatus
    ))
)]
struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState, config: &Config) -> Router {
    let api_doc = ApiDoc::openapi();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(routes::analyze))
        .route("/results/{job_id}", get(routes::get_results))
        .with_state(state);

    // Rate limiting keys on the client IP, so the server must be started with
    // `into_make_service_with_connect_info`.
    let api_routes = match config.rate_limit_per_minute {
        Some(per_minute) => {
            let period = Duration::from_millis(60_000 / u64::from(per_minute.max(1)));
            match GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(period)
                .burst_size(config.rate_limit_burst.max(1))
                .finish()
            {
                Some(governor_conf) => {
                    tracing::info!(
                        "Rate limiting enabled: {} requests/minute, burst {}",
                        per_minute,
                        config.rate_limit_burst
                    );
                    api_routes.layer(GovernorLayer {
                        config: Arc::new(governor_conf),
                    })
                }
                None => {
                    tracing::warn!("Invalid rate limit settings; continuing without rate limiting");
                    api_routes
                }
            }
        }
        None => api_routes,
    };

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc);

    Router::new()
        .merge(api_routes)
        .merge(docs_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
