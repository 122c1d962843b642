mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{article_html, orchestrator, Canned, MockFetcher, MockReasoning, MockSearchApi, VALID_REPORT};
use http_body_util::BodyExt;
use seo_optimizer::config::Config;
use seo_optimizer::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TARGET: &str = "https://example.edu/msc-ds";
const COMPETITOR: &str = "https://uni-a.ac.uk/ds";

fn test_app() -> Router {
    let fast = MockFetcher::new()
        .with(TARGET, Canned::Page(200, article_html("Example MSc", "MSc Data Science", "python", 150)))
        .with(COMPETITOR, Canned::Page(200, article_html("Alpha", "Alpha MSc", "statistics", 150)));
    let orchestrator = orchestrator(
        Arc::new(MockSearchApi::with_links(&[COMPETITOR])),
        Arc::new(fast),
        Arc::new(MockFetcher::new()),
        Arc::new(MockReasoning::answering(VALID_REPORT)),
    );
    create_app(AppState::new(orchestrator), &Config::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Service is healthy");
}

#[tokio::test]
async fn test_analyze_accepts_and_completes() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/analyze",
            json!({"target_url": TARGET, "query": "MSc Data Science course UK"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "PENDING");
    assert!(body["message"].is_string());
    let job_id = body["job_id"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let mut result = Value::Null;
    for _ in 0..200 {
        let response = app.clone().oneshot(get(&format!("/results/{}", job_id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        result = json_body(response).await;
        if result["status"] == "COMPLETE" || result["status"] == "FAILED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(result["status"], "COMPLETE");
    assert_eq!(result["job_id"], job_id.as_str());
    assert_eq!(result["report"]["final_scores"]["final_seo_score"], 80);
    assert!(result.get("error").is_none());
    assert!(result["created_at"].is_string());
    assert!(result["updated_at"].is_string());

    // terminal jobs answer identically on every poll
    let response = app.oneshot(get(&format!("/results/{}", job_id))).await.unwrap();
    assert_eq!(json_body(response).await, result);
}

#[tokio::test]
async fn test_analyze_rejects_invalid_url() {
    let app = test_app();

    let response = app
        .oneshot(post_json("/analyze", json!({"target_url": "example.edu", "query": "msc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));
}

#[tokio::test]
async fn test_analyze_rejects_missing_query() {
    let app = test_app();

    let response = app
        .oneshot(post_json("/analyze", json!({"target_url": TARGET})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_unknown_job_is_404() {
    let app = test_app();

    let response = app.oneshot(get("/results/does-not-exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Job not found: does-not-exist");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = test_app();

    let response = app.oneshot(get("/api-doc/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"].get("/analyze").is_some());
    assert!(body["paths"].get("/results/{job_id}").is_some());
    assert!(body["paths"].get("/health").is_some());
}
