//! Convenience macros for extension development.

/// Build an [`ExtensionMetadata`](exthub_core::types::ExtensionMetadata)
/// from the required fields.
///
/// # Example
/// ```rust,ignore
/// let meta = extension_metadata!(
///     name: "webhooks",
///     version: "1.0.0",
///     description: "Outbound webhook delivery",
///     author: "ExtHub Team"
/// );
/// ```
#[macro_export]
macro_rules! extension_metadata {
    (
        name: $name:expr,
        version: $version:expr,
        description: $desc:expr,
        author: $author:expr
    ) => {
        $crate::prelude::ExtensionMetadata {
            name: $name.to_string(),
            version: $version.to_string(),
            description: $desc.to_string(),
            author: $author.to_string(),
            license: String::new(),
            tags: Vec::new(),
            homepage: String::new(),
        }
    };
    (
        name: $name:expr,
        version: $version:expr,
        description: $desc:expr,
        author: $author:expr,
        tags: [$($tag:expr),* $(,)?]
    ) => {
        $crate::prelude::ExtensionMetadata {
            name: $name.to_string(),
            version: $version.to_string(),
            description: $desc.to_string(),
            author: $author.to_string(),
            license: String::new(),
            tags: vec![$($tag.to_string()),*],
            homepage: String::new(),
        }
    };
}
