//! Hook definitions shared between the runtime and extensions.
//!
//! Hooks run synchronously (inline-await) on the request's own task so their
//! ordering relative to the host's request handling stays deterministic and
//! request cancellation propagates naturally.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::result::AppResult;
use crate::types::request::AuthContext;

/// Named points in the host's request and database lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    /// Before the route handler runs.
    PreRequest,
    /// After the route handler produced a response.
    PostRequest,
    /// Before the auth gate is evaluated.
    PreAuth,
    /// After the auth gate passed.
    PostAuth,
    /// Before a broker database operation executes.
    PreDatabase,
    /// After a broker database operation completed.
    PostDatabase,
}

impl HookType {
    /// All hook types, in a stable order.
    pub const ALL: [HookType; 6] = [
        HookType::PreRequest,
        HookType::PostRequest,
        HookType::PreAuth,
        HookType::PostAuth,
        HookType::PreDatabase,
        HookType::PostDatabase,
    ];

    /// The string name of this hook type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreRequest => "pre_request",
            Self::PostRequest => "post_request",
            Self::PreAuth => "pre_auth",
            Self::PostAuth => "post_auth",
            Self::PreDatabase => "pre_database",
            Self::PostDatabase => "post_database",
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared mutable context passed along a hook chain.
///
/// A callback may mutate the context; later callbacks in the same chain see
/// the mutated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    /// The hook type being fired.
    pub hook: HookType,
    /// Arbitrary event data keyed by string.
    pub data: HashMap<String, Value>,
    /// Caller identity, if authenticated.
    pub auth: Option<AuthContext>,
    /// Outgoing response headers; mutations are applied to the final
    /// response for request-scoped chains.
    pub response_headers: HashMap<String, String>,
    /// Correlation id of the originating request or operation.
    pub correlation_id: Uuid,
    /// When the event fired.
    pub timestamp: DateTime<Utc>,
}

impl HookContext {
    /// Create a context for the given hook type.
    pub fn new(hook: HookType) -> Self {
        Self {
            hook,
            data: HashMap::new(),
            auth: None,
            response_headers: HashMap::new(),
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    /// Set the caller identity.
    pub fn with_auth(mut self, auth: Option<AuthContext>) -> Self {
        self.auth = auth;
        self
    }

    /// Set the correlation id.
    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Insert a data value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Get a data value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a string data value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome of a single hook callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookOutcome {
    /// Continue to the next callback in the chain.
    Continue,
    /// The event is handled; skip the remaining callbacks for this event.
    Handled,
}

/// A callback invoked at a hook point.
#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Execute the callback against the shared context.
    async fn call(&self, ctx: &mut HookContext) -> AppResult<HookOutcome>;
}

/// A hook callback registered by an extension.
#[derive(Clone)]
pub struct HookRegistration {
    /// The hook point to attach to.
    pub hook: HookType,
    /// Execution priority; lower runs first, ties broken by enable order.
    pub priority: i32,
    /// The callback.
    pub callback: Arc<dyn HookCallback>,
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("hook", &self.hook)
            .field("priority", &self.priority)
            .finish()
    }
}

impl HookRegistration {
    /// Register a callback at the given hook point and priority.
    pub fn new(hook: HookType, priority: i32, callback: Arc<dyn HookCallback>) -> Self {
        Self {
            hook,
            priority,
            callback,
        }
    }
}
