//! Ordered hook execution with fault isolation.

pub mod pipeline;

pub use pipeline::{HookDispatchReport, HookPipeline};
