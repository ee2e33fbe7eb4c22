//! Extension metadata — immutable after registration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Descriptive metadata declared by an extension.
///
/// Validated once at registration and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    /// Unique extension name. Also determines the route namespace
    /// (`/ext/<name>/...`) and database schema (`ext_<name>`).
    pub name: String,
    /// Semver version string.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// License identifier.
    #[serde(default)]
    pub license: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Project homepage.
    #[serde(default)]
    pub homepage: String,
}

impl ExtensionMetadata {
    /// Validate that all required fields are present and the name is usable
    /// as a route namespace and schema identifier.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_metadata("extension name is required"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(AppError::invalid_metadata(format!(
                "extension name '{}' must be lowercase alphanumeric with '-' or '_'",
                self.name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(AppError::invalid_metadata(format!(
                "extension '{}' is missing a version",
                self.name
            )));
        }
        if self.author.trim().is_empty() {
            return Err(AppError::invalid_metadata(format!(
                "extension '{}' is missing an author",
                self.name
            )));
        }
        Ok(())
    }

    /// The database schema name owned by this extension.
    pub fn schema_name(&self) -> String {
        format!("ext_{}", self.name.replace('-', "_"))
    }

    /// The route namespace this extension's routes are mounted under.
    pub fn mount_prefix(&self) -> String {
        format!("/ext/{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str) -> ExtensionMetadata {
        ExtensionMetadata {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: "test".to_string(),
            author: "tester".to_string(),
            license: String::new(),
            tags: Vec::new(),
            homepage: String::new(),
        }
    }

    #[test]
    fn valid_metadata_passes() {
        assert!(metadata("webhooks").validate().is_ok());
        assert!(metadata("audit-trail_2").validate().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(metadata("").validate().is_err());
    }

    #[test]
    fn uppercase_name_is_rejected() {
        assert!(metadata("Webhooks").validate().is_err());
    }

    #[test]
    fn schema_name_replaces_dashes() {
        assert_eq!(metadata("audit-trail").schema_name(), "ext_audit_trail");
    }

    #[test]
    fn mount_prefix_uses_name() {
        assert_eq!(metadata("webhooks").mount_prefix(), "/ext/webhooks");
    }
}
