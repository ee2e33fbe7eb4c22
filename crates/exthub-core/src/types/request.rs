//! Request and response types crossing the host/extension boundary.
//!
//! Extensions never see the host's raw HTTP types; the router integration
//! layer translates to and from these structs so the transport stays an
//! external collaborator.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity and role claims of the caller, issued by the host's auth
/// subsystem and consumed read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Stable user identifier.
    pub user_id: Uuid,
    /// Username for display and audit.
    pub username: String,
    /// Granted role names (host roles plus extension-declared roles).
    pub roles: Vec<String>,
}

impl AuthContext {
    /// Whether the caller holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Auth gate applied to a mounted extension route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthRequirement {
    /// No authentication required.
    Public,
    /// Any authenticated caller.
    RequireAuth,
    /// Caller must hold the named role.
    RequireRole(String),
}

/// A request dispatched to an extension route handler.
#[derive(Debug, Clone)]
pub struct ExtensionRequest {
    /// HTTP method.
    pub method: Method,
    /// Path inside the extension's namespace, e.g. `/dashboard`.
    pub path: String,
    /// Path parameters captured from the route pattern.
    pub params: HashMap<String, String>,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
    /// Caller identity, if authenticated.
    pub auth: Option<AuthContext>,
    /// Correlation id threaded through logging and hooks.
    pub correlation_id: Uuid,
}

impl ExtensionRequest {
    /// Build a request with the given method and path; other fields default.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Bytes::new(),
            auth: None,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::AppResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            crate::AppError::validation(format!("invalid JSON request body: {e}"))
        })
    }
}

/// A response produced by an extension route handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// JSON response body.
    pub body: Value,
}

impl ExtensionResponse {
    /// A 200 response with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// A response with the given status and JSON body.
    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Add a response header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
