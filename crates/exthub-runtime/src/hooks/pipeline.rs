//! Sequential hook dispatch over the active table's merged chains.
//!
//! Callbacks run inline on the request path, in chain order. A callback
//! that errors or panics is skipped without aborting the chain; the faulting
//! extension is reported to the caller so repeated offenders can be
//! disabled.

use std::sync::Arc;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use exthub_core::hooks::{HookContext, HookOutcome, HookType};

use crate::dispatch::DispatchTable;
use crate::metrics::MetricsCollector;

/// Result of dispatching one hook point.
pub struct HookDispatchReport {
    /// `Handled` when a callback short-circuited the chain.
    pub outcome: HookOutcome,
    /// Extensions whose callback errored or panicked, in order.
    pub faulted: Vec<String>,
}

/// Runs hook chains from the current dispatch snapshot.
pub struct HookPipeline {
    metrics: Arc<MetricsCollector>,
}

impl HookPipeline {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }

    /// Execute the chain for `hook` against `ctx`.
    ///
    /// Mutations a callback makes to `ctx` are visible to later callbacks.
    /// A `Handled` outcome stops the chain; faults skip only the faulting
    /// callback.
    pub async fn dispatch(
        &self,
        table: &DispatchTable,
        hook: HookType,
        ctx: &mut HookContext,
    ) -> HookDispatchReport {
        let mut report = HookDispatchReport {
            outcome: HookOutcome::Continue,
            faulted: Vec::new(),
        };

        for entry in table.hooks_for(hook) {
            let result = AssertUnwindSafe(entry.callback.call(ctx))
                .catch_unwind()
                .await;
            self.metrics.record_hook(&entry.extension);

            match result {
                Ok(Ok(HookOutcome::Continue)) => {}
                Ok(Ok(HookOutcome::Handled)) => {
                    debug!(
                        extension = %entry.extension,
                        hook = %hook,
                        "Hook handled the request"
                    );
                    report.outcome = HookOutcome::Handled;
                    break;
                }
                Ok(Err(err)) => {
                    warn!(
                        extension = %entry.extension,
                        hook = %hook,
                        error = %err,
                        "Hook callback failed; continuing chain"
                    );
                    report.faulted.push(entry.extension.clone());
                }
                Err(_) => {
                    warn!(
                        extension = %entry.extension,
                        hook = %hook,
                        "Hook callback panicked; continuing chain"
                    );
                    report.faulted.push(entry.extension.clone());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exthub_core::AppError;
    use exthub_core::AppResult;
    use exthub_core::hooks::{HookCallback, HookRegistration};
    use exthub_core::traits::{Extension, HookProvider, ServiceScope};
    use exthub_core::types::ExtensionMetadata;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        behavior: Behavior,
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Continue,
        Handle,
        Fail,
        Panic,
    }

    #[async_trait]
    impl HookCallback for Recorder {
        async fn call(&self, ctx: &mut HookContext) -> AppResult<HookOutcome> {
            self.log.lock().unwrap().push(self.label);
            ctx.data.insert(self.label.to_string(), json!(true));
            match self.behavior {
                Behavior::Continue => Ok(HookOutcome::Continue),
                Behavior::Handle => Ok(HookOutcome::Handled),
                Behavior::Fail => Err(AppError::internal("callback failed")),
                Behavior::Panic => panic!("callback panicked"),
            }
        }
    }

    struct HookOnly {
        name: &'static str,
        regs: Vec<(i32, &'static str, Behavior)>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Extension for HookOnly {
        fn metadata(&self) -> ExtensionMetadata {
            ExtensionMetadata {
                name: self.name.to_string(),
                version: "1.0.0".to_string(),
                author: "test".to_string(),
                ..Default::default()
            }
        }

        async fn initialize(&self, _services: ServiceScope) -> AppResult<()> {
            Ok(())
        }

        fn as_hook_provider(&self) -> Option<&dyn HookProvider> {
            Some(self)
        }
    }

    impl HookProvider for HookOnly {
        fn hooks(&self) -> Vec<HookRegistration> {
            self.regs
                .iter()
                .map(|(priority, label, behavior)| HookRegistration {
                    hook: HookType::PreRequest,
                    priority: *priority,
                    callback: Arc::new(Recorder {
                        label,
                        log: self.log.clone(),
                        behavior: *behavior,
                    }),
                })
                .collect()
        }
    }

    fn pipeline() -> HookPipeline {
        HookPipeline::new(Arc::new(MetricsCollector::new()))
    }

    #[tokio::test]
    async fn chains_run_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ext: Arc<dyn Extension> = Arc::new(HookOnly {
            name: "multi",
            regs: vec![
                (10, "a", Behavior::Continue),
                (-5, "b", Behavior::Continue),
                (0, "c", Behavior::Continue),
            ],
            log: log.clone(),
        });
        let table = DispatchTable::build(&[(ext, 1)]).unwrap();

        let mut ctx = HookContext::new(HookType::PreRequest);
        let report = pipeline()
            .dispatch(&table, HookType::PreRequest, &mut ctx)
            .await;

        assert_eq!(report.outcome, HookOutcome::Continue);
        assert_eq!(*log.lock().unwrap(), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn fault_skips_only_the_faulting_callback() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ext: Arc<dyn Extension> = Arc::new(HookOnly {
            name: "faulty",
            regs: vec![
                (1, "first", Behavior::Fail),
                (2, "second", Behavior::Panic),
                (3, "third", Behavior::Continue),
            ],
            log: log.clone(),
        });
        let table = DispatchTable::build(&[(ext, 1)]).unwrap();

        let mut ctx = HookContext::new(HookType::PreRequest);
        let report = pipeline()
            .dispatch(&table, HookType::PreRequest, &mut ctx)
            .await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(report.faulted, vec!["faulty", "faulty"]);
        // Mutations before the fault survive it.
        assert!(ctx.data.contains_key("first"));
    }

    #[tokio::test]
    async fn handled_short_circuits_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ext: Arc<dyn Extension> = Arc::new(HookOnly {
            name: "short",
            regs: vec![
                (1, "gate", Behavior::Handle),
                (2, "never", Behavior::Continue),
            ],
            log: log.clone(),
        });
        let table = DispatchTable::build(&[(ext, 1)]).unwrap();

        let mut ctx = HookContext::new(HookType::PreRequest);
        let report = pipeline()
            .dispatch(&table, HookType::PreRequest, &mut ctx)
            .await;

        assert_eq!(report.outcome, HookOutcome::Handled);
        assert_eq!(*log.lock().unwrap(), vec!["gate"]);
    }
}
