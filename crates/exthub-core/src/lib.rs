//! # exthub-core
//!
//! Core crate for the ExtHub extension runtime. Contains capability traits,
//! configuration schemas, shared types (metadata, status, health, metrics,
//! quotas, permissions, audit), hook definitions, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other ExtHub crates.

pub mod config;
pub mod error;
pub mod hooks;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
