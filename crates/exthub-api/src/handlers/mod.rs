//! Management API handlers.

pub mod extensions;
pub mod health;
