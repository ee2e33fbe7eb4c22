//! # exthub-sdk
//!
//! SDK for developing ExtHub extensions.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use exthub_sdk::prelude::*;
//!
//! struct MyExtension;
//!
//! #[async_trait]
//! impl Extension for MyExtension {
//!     fn metadata(&self) -> ExtensionMetadata {
//!         extension_metadata!(
//!             name: "my-extension",
//!             version: "1.0.0",
//!             description: "A sample extension",
//!             author: "Developer"
//!         )
//!     }
//!
//!     async fn initialize(&self, services: ServiceScope) -> AppResult<()> {
//!         services.logger.info("initialized");
//!         Ok(())
//!     }
//! }
//! ```

pub mod harness;
pub mod macros;

/// Prelude for convenient imports.
pub mod prelude {
    pub use async_trait::async_trait;

    pub use exthub_core::error::{AppError, ErrorKind};
    pub use exthub_core::hooks::{
        HookCallback, HookContext, HookOutcome, HookRegistration, HookType,
    };
    pub use exthub_core::result::AppResult;
    pub use exthub_core::traits::{
        Configurable, Extension, ExtensionHandler, ExtensionMiddleware, HookProvider, Migratable,
        MiddlewareRegistration, RouteDef, RouteProvider, ScopedConfig, ScopedDatabase,
        ScopedLogger, ScopedStorage, ServiceScope,
    };
    pub use exthub_core::types::{
        AuthContext, AuthRequirement, ConfigField, ConfigFieldKind, ConfigSchema,
        ExtensionMetadata, ExtensionRequest, ExtensionResponse, HealthCheck, HealthLevel,
        HealthStatus, Migration, Permission, Quota,
    };
    pub use http::Method;

    pub use crate::extension_metadata;
    pub use crate::harness::TestHarness;
}
