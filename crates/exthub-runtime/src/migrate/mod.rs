//! Per-extension schema migrations with a shared ledger.

pub mod runner;

pub use runner::MigrationRunner;
