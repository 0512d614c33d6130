//! GitHub webhook client against a mocked REST API

use scm::github::GithubClient;
use scm::{HookEvent, HookOptions, HookValidation, ScmError, WebhookClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(id: Option<&str>, events: &[HookEvent]) -> HookOptions {
    HookOptions {
        base_url: "https://github.com".to_string(),
        owner: "acme".to_string(),
        project: "app".to_string(),
        access_token: "ghp_token".to_string(),
        secret_token: "shared".to_string(),
        url: "https://receiver.example.com".to_string(),
        events: events.to_vec(),
        id: id.map(str::to_string),
        ssl_verify: true,
    }
}

fn remote_hook(id: u64, url: &str, events: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "name": "web",
        "active": true,
        "events": events,
        "config": { "url": url, "content_type": "json", "insecure_ssl": "0" }
    })
}

async fn client(server: &MockServer) -> GithubClient {
    GithubClient::with_api_base(&server.uri(), "ghp_token").unwrap()
}

#[tokio::test]
async fn validate_without_id_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .validate(&options(None, &[HookEvent::Push]))
        .await
        .unwrap();
    assert_eq!(result, HookValidation::MISSING);
}

#[tokio::test]
async fn validate_reports_missing_when_hook_was_removed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/hooks/12"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .validate(&options(Some("12"), &[HookEvent::Push]))
        .await
        .unwrap();
    assert_eq!(result, HookValidation::MISSING);
}

#[tokio::test]
async fn validate_is_order_independent_and_side_effect_free() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/hooks/12"))
        .and(header("authorization", "Bearer ghp_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_hook(
            12,
            "https://receiver.example.com",
            &["issues", "push"],
        )))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let github = client(&server).await;
    let opts = options(Some("12"), &[HookEvent::Push, HookEvent::Issues]);

    let first = github.validate(&opts).await.unwrap();
    let second = github.validate(&opts).await.unwrap();
    assert_eq!(first, HookValidation::IN_SYNC);
    assert_eq!(first, second);
}

#[tokio::test]
async fn validate_detects_url_and_event_drift() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/hooks/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_hook(
            12,
            "https://receiver.example.com",
            &["push"],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/hooks/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_hook(
            13,
            "http://old-receiver.example.com",
            &["push"],
        )))
        .mount(&server)
        .await;

    let github = client(&server).await;

    let more_events = options(Some("12"), &[HookEvent::Push, HookEvent::Issues]);
    assert_eq!(
        github.validate(&more_events).await.unwrap(),
        HookValidation::DRIFTED
    );

    let moved = options(Some("13"), &[HookEvent::Push]);
    assert_eq!(github.validate(&moved).await.unwrap(), HookValidation::DRIFTED);
}

#[tokio::test]
async fn create_registers_json_hook_and_returns_numeric_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/hooks"))
        .and(body_partial_json(json!({
            "name": "web",
            "active": true,
            "events": ["push"],
            "config": {
                "url": "https://receiver.example.com",
                "content_type": "json",
                "secret": "shared"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(remote_hook(
            987_654,
            "https://receiver.example.com",
            &["push"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .await
        .create(&options(None, &[HookEvent::Push]))
        .await
        .unwrap();
    assert_eq!(id, "987654");
}

#[tokio::test]
async fn update_requires_an_id() {
    let server = MockServer::start().await;
    let err = client(&server)
        .await
        .update(&options(None, &[HookEvent::Push]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScmError::MissingHookId));
}

#[tokio::test]
async fn update_edits_existing_hook() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/app/hooks/12"))
        .and(body_partial_json(json!({ "events": ["push", "issues"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_hook(
            12,
            "https://receiver.example.com",
            &["push", "issues"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .await
        .update(&options(Some("12"), &[HookEvent::Issues, HookEvent::Push]))
        .await
        .unwrap();
    assert_eq!(id, "12");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/repos/acme/app/hooks/12"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;

    let github = client(&server).await;
    github
        .delete(&options(Some("12"), &[HookEvent::Push]))
        .await
        .unwrap();
    github.delete(&options(None, &[HookEvent::Push])).await.unwrap();
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/hooks"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Validation Failed"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .create(&options(None, &[HookEvent::Push]))
        .await
        .unwrap_err();
    match err {
        ScmError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Validation Failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
