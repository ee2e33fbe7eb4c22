//! Hook pipeline tests: ordering and per-callback fault isolation.

mod helpers;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;

use exthub_core::{AppError, AppResult};
use exthub_core::hooks::{HookCallback, HookContext, HookOutcome, HookRegistration, HookType};

use helpers::StubExtension;

/// Appends its name to a shared log when invoked.
struct RecordingHook {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl HookCallback for RecordingHook {
    async fn call(&self, _ctx: &mut HookContext) -> AppResult<HookOutcome> {
        self.log.lock().unwrap().push(self.name.to_string());
        Ok(HookOutcome::Continue)
    }
}

/// Always fails.
struct FailingHook;

#[async_trait]
impl HookCallback for FailingHook {
    async fn call(&self, _ctx: &mut HookContext) -> AppResult<HookOutcome> {
        Err(AppError::internal("boom"))
    }
}

/// Counts invocations.
struct CountingHook {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl HookCallback for CountingHook {
    async fn call(&self, _ctx: &mut HookContext) -> AppResult<HookOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HookOutcome::Continue)
    }
}

#[tokio::test]
async fn hooks_run_in_priority_then_enable_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let reg = |name: &'static str, priority: i32| {
        HookRegistration::new(
            HookType::PreRequest,
            priority,
            Arc::new(RecordingHook {
                name,
                log: Arc::clone(&log),
            }),
        )
    };

    let app = helpers::TestApp::with_extensions(vec![
        Arc::new(StubExtension::new("mod-a").with_hooks(vec![reg("a", 10)])),
        Arc::new(StubExtension::new("mod-b").with_hooks(vec![reg("b", 5)])),
        Arc::new(StubExtension::new("mod-c").with_hooks(vec![reg("c", 5)])),
    ])
    .await;

    // Enable order breaks the b/c priority tie.
    for name in ["mod-a", "mod-b", "mod-c"] {
        app.registry.enable(name).await.unwrap();
    }

    let response = app.request("GET", "/ext/mod-a/ping", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(*log.lock().unwrap(), vec!["b", "c", "a"]);
}

#[tokio::test]
async fn one_modules_hook_failure_does_not_stop_anothers() {
    let calls = Arc::new(AtomicU32::new(0));

    let app = helpers::TestApp::with_extensions(vec![
        Arc::new(StubExtension::new("faulty").with_hooks(vec![HookRegistration::new(
            HookType::PreRequest,
            1,
            Arc::new(FailingHook),
        )])),
        Arc::new(StubExtension::new("steady").with_hooks(vec![HookRegistration::new(
            HookType::PreRequest,
            2,
            Arc::new(CountingHook {
                calls: Arc::clone(&calls),
            }),
        )])),
    ])
    .await;

    app.registry.enable("faulty").await.unwrap();
    app.registry.enable("steady").await.unwrap();

    // The faulty hook runs first, fails, and the chain continues.
    let response = app.request("GET", "/ext/steady/ping", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
