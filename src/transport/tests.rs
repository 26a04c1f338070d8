//! Tests for the HTTP transport

use super::*;
use crate::auth::AuthConfig;
use crate::http::{HttpClient, HttpClientConfig};
use crate::search::QueryParams;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/partenaire/offresdemploi/v2/offres/search";

fn config(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(format!("{}/partenaire/offresdemploi/", server.uri()))
        .max_retries(0)
        .no_rate_limit()
        .build()
}

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(HttpClient::with_config(config(server)).unwrap())
}

fn oauth_transport(server: &MockServer) -> HttpTransport {
    let auth = AuthConfig::client_credentials(
        format!("{}/connexion/oauth2/access_token", server.uri()),
        "client",
        "secret",
        vec!["api_offresdemploiv2".to_string()],
    );
    HttpTransport::new(HttpClient::with_auth(config(server), auth).unwrap())
}

// ============================================================================
// ApiResponse Tests
// ============================================================================

#[test]
fn test_api_response_headers_case_insensitive() {
    let response = ApiResponse::new(206, "").with_header("Content-Range", "offres 0-149/3500");
    assert_eq!(response.header("content-range"), Some("offres 0-149/3500"));
    assert!(response.is_partial());
    assert!(!response.is_complete());
}

#[test]
fn test_api_response_ignores_invalid_header() {
    let response = ApiResponse::new(200, "").with_header("bad header", "x");
    assert!(response.headers.is_empty());
}

// ============================================================================
// HttpTransport Tests
// ============================================================================

#[tokio::test]
async fn test_get_passes_params_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("departement", "42"))
        .and(query_param("publieeDepuis", "7"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "offres 0-149/320")
                .insert_header("Accept-Range", "150")
                .set_body_json(json!({"resultats": [{"id": "1"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = QueryParams::new()
        .with("departement", "42")
        .with("publieeDepuis", 7_i64);
    let response = transport(&server)
        .get("v2/offres/search", &params)
        .await
        .unwrap();

    assert_eq!(response.status, 206);
    assert_eq!(response.header("Accept-Range"), Some("150"));
    assert!(response.body.contains("resultats"));
}

#[tokio::test]
async fn test_head_has_no_body() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(206).insert_header("Content-Range", "offres 0-0/3500"))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server)
        .head("v2/offres/search", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(response.status, 206);
    assert_eq!(response.header("Content-Range"), Some("offres 0-0/3500"));
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_client_error_is_returned_as_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad departement"))
        .mount(&server)
        .await;

    let response = transport(&server)
        .get("v2/offres/search", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(response.body, "bad departement");
}

#[tokio::test]
async fn test_forbidden_refreshes_token_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connexion/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "expired",
            "expires_in": 1500
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/connexion/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 1500
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("Authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultats": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = oauth_transport(&server)
        .get("v2/offres/search", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_forbidden_twice_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connexion/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token",
            "expires_in": 1500
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let response = oauth_transport(&server)
        .get("v2/offres/search", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn test_forbidden_without_oauth_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server)
        .get("v2/offres/search", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(response.status, 403);
}
