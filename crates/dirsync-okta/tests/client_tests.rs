//! Integration tests for the Okta client against a mock HTTP server.

use dirsync_core::RetryPolicy;
use dirsync_okta::{OktaClient, OktaCredentials, OktaError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> OktaClient {
    OktaClient::new(
        &server.uri(),
        OktaCredentials::ApiToken {
            token: "test-token".to_string(),
        },
        // No backoff delays in tests.
        RetryPolicy::new(2, 0),
    )
    .unwrap()
}

fn group_json(id: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "profile": { "name": name } })
}

fn user_json(id: &str, email: &str) -> serde_json::Value {
    json!({ "id": id, "profile": { "email": email, "firstName": "Test", "lastName": "User" } })
}

#[tokio::test]
async fn sends_ssws_authorization_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(header("Authorization", "SSWS test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([group_json("00g1", "Engineering")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let group = client.get_group_by_name("Engineering").await.unwrap();
    assert_eq!(group.id, "00g1");
}

#[tokio::test]
async fn group_lookup_requires_exact_name_match() {
    let server = MockServer::start().await;

    // Okta's ?q= filter matches prefixes, so the search for "Engineering"
    // also returns "Engineering-QA". Only the exact match may win.
    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(query_param("q", "Engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            group_json("00g2", "Engineering-QA"),
            group_json("00g1", "Engineering"),
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let group = client.get_group_by_name("Engineering").await.unwrap();
    assert_eq!(group.id, "00g1");
    assert_eq!(group.profile.name, "Engineering");
}

#[tokio::test]
async fn group_lookup_fails_when_only_prefix_matches_exist() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([group_json("00g2", "Engineering-QA")])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get_group_by_name("Engineering").await;
    assert!(matches!(result, Err(OktaError::NotFound(_))));
}

#[tokio::test]
async fn group_members_follow_link_pagination() {
    let server = MockServer::start().await;

    let next = format!(
        "<{}/api/v1/groups/00g1/users?after=cursor&limit=200>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/groups/00g1/users"))
        .and(query_param("after", "cursor"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([user_json("00u2", "bob@example.com")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups/00g1/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_json("00u1", "alice@example.com")]))
                .insert_header("Link", next.as_str()),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let users = client.group_users("00g1").await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].profile.email.as_str(), "alice@example.com");
    assert_eq!(users[1].profile.email.as_str(), "bob@example.com");
}

#[tokio::test]
async fn missing_group_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups/00gX/users"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorSummary": "Resource not found"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.group_users("00gX").await;
    assert!(matches!(result, Err(OktaError::NotFound(_))));
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;

    let reset = chrono::Utc::now().timestamp() + 1;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/00g1/users"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("x-rate-limit-reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups/00g1/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_json("00u1", "alice@example.com")])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let users = client.group_users("00g1").await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get_group_by_name("Engineering").await;
    assert!(matches!(result, Err(OktaError::Auth(_))));
}
