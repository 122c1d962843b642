use axum::{
    http::StatusCode,
    response::IntoResponse,
};
use seo_optimizer::error::AppError;
use http_body_util::BodyExt;
use serde_json::Value;

// Test for AppError Display implementation
#[test]
fn test_app_error_display() {
    let error1 = AppError::InvalidRequest("query must not be empty".to_string());
    assert_eq!(error1.to_string(), "Invalid request: query must not be empty");

    let error2 = AppError::JobNotFound("1234".to_string());
    assert_eq!(error2.to_string(), "Job not found: 1234");

    let error3 = AppError::SerializationError("trailing comma".to_string());
    assert_eq!(error3.to_string(), "Serialization error: trailing comma");

    let error4 = AppError::InternalError("store unavailable".to_string());
    assert_eq!(error4.to_string(), "Internal Server Error: store unavailable");
}

async fn status_and_body(error: AppError) -> (StatusCode, Value) {
    let response = error.into_response();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

// Test for AppError IntoResponse implementation
#[tokio::test]
async fn test_app_error_into_response() {
    let (status, body) = status_and_body(AppError::InvalidRequest("bad url".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request: bad url");

    let (status, body) = status_and_body(AppError::JobNotFound("abc".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found: abc");

    let (status, body) = status_and_body(AppError::SerializationError("eof".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Serialization error: eof");

    let (status, body) = status_and_body(AppError::InternalError("boom".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal Server Error: boom");
}

// Test conversion from serde_json errors
#[test]
fn test_from_serde_json_error() {
    let err = serde_json::from_str::<Value>("{").unwrap_err();
    let app_error = AppError::from(err);
    assert!(matches!(app_error, AppError::SerializationError(_)));
}
