//! Capability traits implemented by extensions and the service traits the
//! broker exposes to them.

pub mod extension;
pub mod services;

pub use extension::{
    Configurable, Extension, ExtensionHandler, ExtensionMiddleware, HookProvider, Migratable,
    MiddlewareRegistration, RouteDef, RouteProvider,
};
pub use services::{ScopedConfig, ScopedDatabase, ScopedLogger, ScopedStorage, ServiceScope};
