//! The extension runtime: registry, lifecycle state machine, service
//! broker, hook pipeline, security enforcement, migrations, metrics, and
//! configuration hot-reload.

pub mod broker;
pub mod db;
pub mod dispatch;
pub mod faults;
pub mod hooks;
pub mod metrics;
pub mod migrate;
pub mod registry;
pub mod security;
pub mod watcher;

pub use db::DatabasePool;
pub use dispatch::{DispatchTable, SharedDispatch};
pub use registry::ExtensionRegistry;
pub use watcher::ConfigWatcher;
