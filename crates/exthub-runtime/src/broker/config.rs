//! Configuration accessor handed to extensions.
//!
//! Holds a weak reference back to the extension so a scope stored inside
//! the extension does not form a reference cycle.

use std::sync::Weak;

use async_trait::async_trait;
use serde_json::Value;

use exthub_core::traits::{Extension, ScopedConfig};
use exthub_core::types::ConfigSchema;

/// [`ScopedConfig`] delegating to the extension's own `Configurable`
/// capability.
pub struct ExtensionConfigAccessor {
    ext: Weak<dyn Extension>,
}

impl ExtensionConfigAccessor {
    pub fn new(ext: Weak<dyn Extension>) -> Self {
        Self { ext }
    }
}

#[async_trait]
impl ScopedConfig for ExtensionConfigAccessor {
    fn schema(&self) -> ConfigSchema {
        self.ext
            .upgrade()
            .and_then(|ext| ext.as_configurable().map(|c| c.config_schema()))
            .unwrap_or_default()
    }

    async fn current(&self) -> Value {
        self.ext
            .upgrade()
            .and_then(|ext| ext.as_configurable().map(|c| c.current_config()))
            .unwrap_or(Value::Null)
    }
}
