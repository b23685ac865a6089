//! Tests for [`HttpSummarizer`] against a wiremock server.

use super::*;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn summarizer_for(server: &MockServer) -> HttpSummarizer {
    HttpSummarizer::new(format!("{}/summarize", server.uri()), 5).unwrap()
}

/// A well-formed response yields summary and sentiment.
#[tokio::test]
async fn test_successful_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(body_json(serde_json::json!({"transcript": "hello world"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "Caller said hello",
            "sentiment": "positive",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = summarizer_for(&server).await.summarize("hello world").await.unwrap();

    assert_eq!(result.summary, "Caller said hello");
    assert_eq!(result.sentiment, Some(Sentiment::Positive));
}

/// A null sentiment is carried through as None.
#[tokio::test]
async fn test_null_sentiment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "Short call",
            "sentiment": null,
        })))
        .mount(&server)
        .await;

    let result = summarizer_for(&server).await.summarize("hi").await.unwrap();
    assert_eq!(result.sentiment, None);
}

/// An unknown sentiment label degrades to None instead of failing.
#[tokio::test]
async fn test_unknown_sentiment_label_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "Odd call",
            "sentiment": "ecstatic",
        })))
        .mount(&server)
        .await;

    let result = summarizer_for(&server).await.summarize("hi").await.unwrap();
    assert_eq!(result.summary, "Odd call");
    assert_eq!(result.sentiment, None);
}

/// Server errors surface as Unavailable.
#[tokio::test]
async fn test_http_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = summarizer_for(&server).await.summarize("hi").await;
    assert!(matches!(result, Err(SummarizerError::Unavailable { .. })));
}

/// Non-JSON bodies surface as MalformedResponse.
#[tokio::test]
async fn test_garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = summarizer_for(&server).await.summarize("hi").await;
    assert!(matches!(
        result,
        Err(SummarizerError::MalformedResponse { .. })
    ));
}

/// An unreachable endpoint surfaces as Unavailable.
#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    // Port 1 is essentially guaranteed closed.
    let summarizer = HttpSummarizer::new("http://127.0.0.1:1/summarize".to_string(), 1).unwrap();
    let result = summarizer.summarize("hi").await;
    assert!(matches!(result, Err(SummarizerError::Unavailable { .. })));
}
