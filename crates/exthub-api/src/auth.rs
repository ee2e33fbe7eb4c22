//! Caller identity injected by the host's auth layer.
//!
//! The host terminates authentication upstream and forwards verified
//! identity as trusted headers; this module only parses them. Absent or
//! malformed headers mean an anonymous caller.

use axum::http::HeaderMap;
use uuid::Uuid;

use exthub_core::AppError;
use exthub_core::AppResult;
use exthub_core::types::AuthContext;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USERNAME_HEADER: &str = "x-auth-username";
pub const ROLES_HEADER: &str = "x-auth-roles";

/// Parse the caller identity from trusted headers, if present.
pub fn auth_from_headers(headers: &HeaderMap) -> Option<AuthContext> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())?;
    let username = headers
        .get(USERNAME_HEADER)
        .and_then(|v| v.to_str().ok())?
        .to_string();
    let roles = headers
        .get(ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(AuthContext {
        user_id,
        username,
        roles,
    })
}

/// Require an authenticated admin caller for management mutations.
pub fn require_admin(auth: &Option<AuthContext>) -> AppResult<&AuthContext> {
    let auth = auth
        .as_ref()
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;
    if !auth.has_role("admin") {
        return Err(AppError::permission_denied(format!(
            "user '{}' is not an administrator",
            auth.username
        )));
    }
    Ok(auth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, name: &str, roles: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        map.insert(USERNAME_HEADER, HeaderValue::from_str(name).unwrap());
        map.insert(ROLES_HEADER, HeaderValue::from_str(roles).unwrap());
        map
    }

    #[test]
    fn parses_identity_and_roles() {
        let auth = auth_from_headers(&headers(
            "7f2c1a9e-4b3d-4c2a-9a1e-0d5f6b7c8d9e",
            "ops",
            "admin, user",
        ))
        .unwrap();
        assert_eq!(auth.username, "ops");
        assert!(auth.has_role("admin"));
        assert!(auth.has_role("user"));
    }

    #[test]
    fn malformed_user_id_means_anonymous() {
        assert!(auth_from_headers(&headers("not-a-uuid", "ops", "admin")).is_none());
        assert!(auth_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn require_admin_rejects_non_admin() {
        let auth = auth_from_headers(&headers(
            "7f2c1a9e-4b3d-4c2a-9a1e-0d5f6b7c8d9e",
            "viewer",
            "user",
        ));
        assert!(require_admin(&auth).is_err());
        assert!(require_admin(&None).is_err());
    }
}
