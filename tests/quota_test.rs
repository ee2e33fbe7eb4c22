//! Quota enforcement tests: hard rejection and audit-on-deny.

mod helpers;

use std::sync::Arc;

use http::StatusCode;

use exthub_core::types::{AuditResult, Quota};

use helpers::StubExtension;

#[tokio::test]
async fn exceeding_rate_limit_rejects_and_audits_once() {
    let quota = Quota {
        max_requests_per_second: 2,
        ..Quota::default()
    };
    let app = helpers::TestApp::with_extensions(vec![Arc::new(
        StubExtension::new("limited").with_quota(quota),
    )])
    .await;
    app.registry.enable("limited").await.unwrap();

    for _ in 0..2 {
        let response = app.request("GET", "/ext/limited/ping", None, &[]).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    // Third request inside the same window is rejected outright.
    let response = app.request("GET", "/ext/limited/ping", None, &[]).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error"], serde_json::json!("QUOTA_EXCEEDED"));

    let entries = app.registry.audit("limited", 50).await.unwrap();
    let denied = entries
        .iter()
        .filter(|e| e.result == AuditResult::Denied)
        .count();
    assert_eq!(denied, 1);
}

#[tokio::test]
async fn requests_under_quota_are_not_audited_as_denied() {
    let app = helpers::TestApp::with_extensions(vec![Arc::new(StubExtension::new("roomy"))]).await;
    app.registry.enable("roomy").await.unwrap();

    let response = app.request("GET", "/ext/roomy/ping", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);

    let entries = app.registry.audit("roomy", 50).await.unwrap();
    assert!(entries.iter().all(|e| e.result != AuditResult::Denied));
}
