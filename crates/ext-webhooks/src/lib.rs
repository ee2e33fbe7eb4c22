//! Outbound webhook delivery extension for ExtHub.
//!
//! Stores webhook endpoints in its private schema, exposes a small
//! management surface under `/ext/webhooks/...`, and delivers a
//! notification to the configured URL after each host request.

pub mod delivery;
pub mod extension;
pub mod handlers;

pub use extension::WebhooksExtension;
