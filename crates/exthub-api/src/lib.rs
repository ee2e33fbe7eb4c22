//! HTTP surface of the extension host: the management API under
//! `/api/v1/extensions` and the namespaced extension dispatch under
//! `/ext/{name}/...`.

pub mod auth;
pub mod dispatch;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
