//! Capability declarations for extensions.

use serde::{Deserialize, Serialize};

/// A capability declared statically by an extension.
///
/// Never mutated at runtime. The security enforcer checks broker and route
/// calls against the set of permissions granted at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission name, e.g. `"webhooks.database"`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// The protected resource, e.g. `"database"` or `"storage"`.
    pub resource: String,
    /// Allowed actions on the resource, e.g. `["read", "write"]`.
    pub actions: Vec<String>,
}

impl Permission {
    /// Whether this permission covers the given resource/action pair.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.actions.iter().any(|a| a == action || a == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_action_allows_everything_on_resource() {
        let perm = Permission {
            name: "test.database".to_string(),
            description: String::new(),
            resource: "database".to_string(),
            actions: vec!["*".to_string()],
        };
        assert!(perm.allows("database", "execute"));
        assert!(!perm.allows("storage", "read"));
    }
}
