//! Per-extension metrics and health probing.

pub mod collector;
pub mod health;

pub use collector::MetricsCollector;
pub use health::HealthChecker;
