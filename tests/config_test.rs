//! Configuration validation and hot-apply tests.

mod helpers;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn invalid_config_is_rejected_and_previous_stays_in_force() {
    let app = helpers::TestApp::new().await;
    let admin = helpers::TestApp::admin_headers();

    let response = app
        .request(
            "PUT",
            "/api/v1/extensions/webhooks/config",
            Some(json!({ "delivery_url": "https://example.com/hook", "retry_limit": 5 })),
            &admin,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Missing required field: rejected, and the error names it.
    let response = app
        .request(
            "PUT",
            "/api/v1/extensions/webhooks/config",
            Some(json!({ "retry_limit": 9 })),
            &admin,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .contains("delivery_url")
    );

    let response = app
        .request("GET", "/api/v1/extensions/webhooks/config", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["data"]["delivery_url"],
        json!("https://example.com/hook")
    );
    assert_eq!(response.body["data"]["retry_limit"], json!(5));
}

#[tokio::test]
async fn config_schema_is_exposed() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", "/api/v1/extensions/webhooks/config/schema", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let fields = response.body["data"]["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["name"] == json!("delivery_url")));
}

#[tokio::test]
async fn put_config_requires_admin() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "PUT",
            "/api/v1/extensions/webhooks/config",
            Some(json!({ "delivery_url": "https://example.com/hook" })),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
