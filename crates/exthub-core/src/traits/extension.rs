//! The extension capability interface set.
//!
//! Every extension implements [`Extension`]; the optional capabilities
//! (routes, hooks, middleware, configuration, migrations) are separate
//! traits exposed through accessor methods, so the registry composes
//! behavior through interface checks instead of a deep hierarchy.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use crate::hooks::HookRegistration;
use crate::result::AppResult;
use crate::types::health::HealthStatus;
use crate::types::metadata::ExtensionMetadata;
use crate::types::migration::Migration;
use crate::types::permission::Permission;
use crate::types::quota::Quota;
use crate::types::request::{AuthRequirement, ExtensionRequest, ExtensionResponse};
use crate::types::schema::ConfigSchema;

use super::services::ServiceScope;

/// Handler for one extension route.
#[async_trait]
pub trait ExtensionHandler: Send + Sync {
    /// Handle a request dispatched to this route.
    async fn handle(&self, req: ExtensionRequest) -> AppResult<ExtensionResponse>;
}

/// A route declared by an extension, mounted under `/ext/<name>/...`.
#[derive(Clone)]
pub struct RouteDef {
    /// HTTP method.
    pub method: Method,
    /// Path pattern inside the extension namespace, e.g. `/endpoints/:id`.
    pub path: String,
    /// Auth gate for the route.
    pub auth: AuthRequirement,
    /// The handler.
    pub handler: Arc<dyn ExtensionHandler>,
}

impl std::fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDef")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("auth", &self.auth)
            .finish()
    }
}

impl RouteDef {
    /// Declare a route.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        auth: AuthRequirement,
        handler: Arc<dyn ExtensionHandler>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            auth,
            handler,
        }
    }
}

/// Middleware applied to the dispatch chain for matching paths.
#[async_trait]
pub trait ExtensionMiddleware: Send + Sync {
    /// Inspect or mutate the request before the handler runs.
    ///
    /// Returning `Some(response)` ends the chain with that response.
    async fn before(&self, req: &mut ExtensionRequest) -> AppResult<Option<ExtensionResponse>>;
}

/// A middleware registration declared by an extension.
#[derive(Clone)]
pub struct MiddlewareRegistration {
    /// Execution priority; lower runs first.
    pub priority: i32,
    /// Path pattern the middleware applies to, e.g. `/endpoints/*`.
    pub path_pattern: String,
    /// The middleware.
    pub middleware: Arc<dyn ExtensionMiddleware>,
}

impl std::fmt::Debug for MiddlewareRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistration")
            .field("priority", &self.priority)
            .field("path_pattern", &self.path_pattern)
            .finish()
    }
}

/// Capability: the extension mounts HTTP routes.
///
/// Middleware is part of this capability rather than a trait of its own:
/// registrations only apply to the extension's mounted namespace, so an
/// extension without routes has nothing for middleware to wrap.
pub trait RouteProvider: Send + Sync {
    /// The routes to mount under the extension's namespace.
    fn routes(&self) -> Vec<RouteDef>;

    /// Middleware applied to this extension's dispatch chain.
    fn middleware(&self) -> Vec<MiddlewareRegistration> {
        Vec::new()
    }
}

/// Capability: the extension registers lifecycle/request hooks.
pub trait HookProvider: Send + Sync {
    /// The hook callbacks to merge into the host's chains.
    fn hooks(&self) -> Vec<HookRegistration>;
}

/// Capability: the extension accepts runtime configuration.
#[async_trait]
pub trait Configurable: Send + Sync {
    /// The declared configuration schema.
    fn config_schema(&self) -> ConfigSchema;

    /// The currently active configuration.
    fn current_config(&self) -> Value;

    /// Apply a configuration document that already passed schema validation.
    async fn apply_config(&self, config: Value) -> AppResult<()>;
}

/// Capability: the extension owns versioned schema migrations.
pub trait Migratable: Send + Sync {
    /// The migration sequence, in ascending version order.
    fn migrations(&self) -> Vec<Migration>;
}

/// A compile-time-linked unit of optional functionality.
///
/// Implementations must be cheap to construct; all I/O belongs in
/// `initialize`/`start`, which the registry invokes outside its lock.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Immutable descriptive metadata.
    fn metadata(&self) -> ExtensionMetadata;

    /// Capabilities this extension declares over host resources.
    fn permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Resource ceilings for this extension; `None` uses the host default.
    fn quota(&self) -> Option<Quota> {
        None
    }

    /// Additional role names merged into the host's role set.
    fn declared_roles(&self) -> Vec<String> {
        Vec::new()
    }

    /// Initialization entry point, called once with a freshly constructed
    /// service scope. The extension keeps the scope for later use.
    async fn initialize(&self, services: ServiceScope) -> AppResult<()>;

    /// Start entry point, called on enable after initialization.
    async fn start(&self) -> AppResult<()> {
        Ok(())
    }

    /// Stop entry point, called on disable. Best effort; errors are logged.
    async fn stop(&self) -> AppResult<()> {
        Ok(())
    }

    /// Health probe, invoked on demand under a timeout.
    async fn health(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    /// Route capability, if implemented.
    fn as_route_provider(&self) -> Option<&dyn RouteProvider> {
        None
    }

    /// Hook capability, if implemented.
    fn as_hook_provider(&self) -> Option<&dyn HookProvider> {
        None
    }

    /// Configuration capability, if implemented.
    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }

    /// Migration capability, if implemented.
    fn as_migratable(&self) -> Option<&dyn Migratable> {
        None
    }
}
