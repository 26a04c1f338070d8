//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/v2/offres/search";

fn test_client(server: &MockServer, max_retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(max_retries)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

async fn get(
    client: &HttpClient,
    query: &[(String, String)],
) -> crate::error::Result<reqwest::Response> {
    client.send(Method::GET, SEARCH_PATH, query).await
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_default_config_matches_api_quota() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(
        config.rate_limit,
        RateLimiterConfig::per_second(API_REQUESTS_PER_SECOND)
    );
    assert!(config.base_url.is_none());
}

#[test_case(BackoffType::Constant, [200, 200, 200, 200] ; "constant")]
#[test_case(BackoffType::Linear, [200, 400, 600, 800] ; "linear")]
#[test_case(BackoffType::Exponential, [200, 400, 800, 1000] ; "exponential capped")]
fn test_retry_delays(backoff: BackoffType, expected_ms: [u64; 4]) {
    let policy = RetryPolicy {
        max_retries: 4,
        initial_backoff: Duration::from_millis(200),
        max_backoff: Duration::from_secs(1),
        backoff,
    };
    let delays: Vec<_> = (0..4).map(|retry| policy.delay(retry)).collect();
    let expected: Vec<_> = expected_ms.into_iter().map(Duration::from_millis).collect();
    assert_eq!(delays, expected);
}

#[test]
fn test_exponential_delay_does_not_overflow() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(u32::MAX), policy.max_backoff);
}

#[test]
fn test_build_url() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com/partenaire/offresdemploi/")
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(
        client.build_url("/v2/offres/search"),
        "https://api.example.com/partenaire/offresdemploi/v2/offres/search"
    );
    assert_eq!(
        client.build_url("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_query_and_accept_header_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("departement", "42"))
        .and(query_param("minCreationDate", "2024-01-01T00:00:00Z"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resultats": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = vec![
        ("departement".to_string(), "42".to_string()),
        ("minCreationDate".to_string(), "2024-01-01T00:00:00Z".to_string()),
    ];
    let response = get(&test_client(&server, 0), &query).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_non_transient_status_is_returned_once() {
    for status in [204_u16, 206, 400, 404] {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&test_client(&server, 3), &[]).await.unwrap();
        assert_eq!(response.status().as_u16(), status);
    }
}

#[tokio::test]
async fn test_head_request() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(206).insert_header("Content-Range", "offres 0-149/3500"))
        .mount(&server)
        .await;

    let response = test_client(&server, 0)
        .send(Method::HEAD, SEARCH_PATH, &[])
        .await
        .unwrap();

    assert_eq!(response.status(), 206);
    assert_eq!(
        response.headers().get("Content-Range").unwrap(),
        "offres 0-149/3500"
    );
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = get(&test_client(&server, 4), &[]).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_retry_after_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = get(&test_client(&server, 1), &[]).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limited_after_last_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = get(&test_client(&server, 1), &[]).await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after_seconds: 0 }));
}

#[tokio::test]
async fn test_last_server_error_is_returned_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(3)
        .mount(&server)
        .await;

    let err = get(&test_client(&server, 2), &[]).await.unwrap_err();
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bearer_auth_is_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("Authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(
        config,
        AuthConfig::Bearer {
            token: "token-1".to_string(),
        },
    )
    .unwrap();

    let response = get(&client, &[]).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(format!("{client:?}").contains("bearer"));
}
