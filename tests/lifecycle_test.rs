//! End-to-end lifecycle tests: register, enable, disable, re-enable.

mod helpers;

use std::sync::Arc;

use http::StatusCode;
use serde_json::json;

use exthub_core::error::ErrorKind;
use exthub_core::types::ExtensionState;

#[tokio::test]
async fn register_duplicate_name_fails_and_keeps_first() {
    let app = helpers::TestApp::new().await;

    let err = app
        .registry
        .register(Arc::new(ext_webhooks::WebhooksExtension::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateName);
    assert_eq!(err.message, "extension already registered: webhooks");

    // The first registration is untouched.
    let status = app.registry.status("webhooks").await.unwrap();
    assert_eq!(status.state, ExtensionState::Registered);
}

#[tokio::test]
async fn enable_mounts_routes_and_disable_unmounts_them() {
    let app = helpers::TestApp::new().await;
    let admin = helpers::TestApp::admin_headers();

    // Not running yet: namespace is unmounted.
    let response = app
        .request("GET", "/ext/webhooks/dashboard", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["state"], json!("running"));

    let response = app
        .request("GET", "/ext/webhooks/dashboard", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("POST", "/api/v1/extensions/webhooks/disable", None, &admin)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // The very next request sees the swapped table.
    let response = app
        .request("GET", "/ext/webhooks/dashboard", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reenable_mounts_routes_exactly_once() {
    let app = helpers::TestApp::new().await;
    let admin = helpers::TestApp::admin_headers();

    for _ in 0..2 {
        let response = app
            .request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        let response = app
            .request("POST", "/api/v1/extensions/webhooks/disable", None, &admin)
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let table = app.registry.dispatch().current().await;
    assert_eq!(table.route_count(), 3);
    assert!(table.is_mounted("webhooks"));
}

#[tokio::test]
async fn enable_while_running_conflicts() {
    let app = helpers::TestApp::new().await;
    let admin = helpers::TestApp::admin_headers();

    app.request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
        .await;
    let response = app
        .request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn lifecycle_endpoints_require_admin() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("POST", "/api/v1/extensions/webhooks/enable", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let user = [
        ("x-auth-user-id", "7f9c24e5-2a31-47a4-9f1e-6d2b8b6e0a12"),
        ("x-auth-username", "alice"),
        ("x-auth-roles", "user"),
    ];
    let response = app
        .request("POST", "/api/v1/extensions/webhooks/enable", None, &user)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoint_reports_running_extension_healthy() {
    let app = helpers::TestApp::new().await;
    let admin = helpers::TestApp::admin_headers();

    app.request("POST", "/api/v1/extensions/webhooks/enable", None, &admin)
        .await;

    // Without a delivery URL the extension reports itself degraded, and
    // anything short of healthy answers 503.
    let response = app
        .request("GET", "/api/v1/extensions/webhooks/health", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["status"], json!("degraded"));

    let response = app
        .request(
            "PUT",
            "/api/v1/extensions/webhooks/config",
            Some(json!({ "delivery_url": "https://example.com/hook" })),
            &admin,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", "/api/v1/extensions/webhooks/health", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], json!("healthy"));
}

#[tokio::test]
async fn health_endpoint_answers_for_disabled_extensions() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", "/api/v1/extensions/webhooks/health", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["status"], json!("stopped"));
}

#[tokio::test]
async fn unknown_extension_is_404() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", "/api/v1/extensions/missing", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("GET", "/ext/missing/anything", None, &[]).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_shows_registered_extensions() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/v1/extensions", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    let list = response.body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], json!("webhooks"));
    assert_eq!(list[0]["state"], json!("registered"));
}
