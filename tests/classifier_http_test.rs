//! Gemini client tests against a mock HTTP server

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gmail_sorter::classifier::{Classifier, GeminiClassifier};
use gmail_sorter::error::SorterError;

fn classifier(server: &MockServer) -> GeminiClassifier {
    GeminiClassifier::with_base_url(
        server.uri(),
        "gemini-2.0-flash-lite",
        "test-key",
        Duration::from_secs(5),
    )
}

fn candidate_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {
                "parts": [{"text": text}]
            }
        }]
    }))
}

#[tokio::test]
async fn test_classify_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-lite:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "classify these"}]}]
        })))
        .respond_with(candidate_response(
            r#"[{"id":"m1","category":"Work"}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let reply = classifier(&server).classify("classify these").await.unwrap();
    assert_eq!(reply, r#"[{"id":"m1","category":"Work"}]"#);
}

#[tokio::test]
async fn test_classify_maps_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
        .mount(&server)
        .await;

    let err = classifier(&server).classify("prompt").await.unwrap_err();
    assert!(matches!(err, SorterError::AuthError(_)));
}

#[tokio::test]
async fn test_classify_maps_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = classifier(&server).classify("prompt").await.unwrap_err();
    assert!(matches!(err, SorterError::RateLimitExceeded { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_classify_maps_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = classifier(&server).classify("prompt").await.unwrap_err();
    assert!(matches!(err, SorterError::ServerError { status: 503, .. }));
}

#[tokio::test]
async fn test_classify_rejects_empty_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = classifier(&server).classify("prompt").await.unwrap_err();
    assert!(matches!(err, SorterError::ClassificationError(_)));
}

#[tokio::test]
async fn test_classify_surfaces_embedded_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "invalid request"}
        })))
        .mount(&server)
        .await;

    let err = classifier(&server).classify("prompt").await.unwrap_err();
    match err {
        SorterError::ClassificationError(message) => {
            assert!(message.contains("invalid request"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
