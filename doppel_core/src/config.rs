//! Configuration for a double.

use serde::{Deserialize, Serialize};

/// Configuration for a double.
///
/// Children created by attribute access inherit the configuration with the
/// name extended by the attribute key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleConfig {
    /// Diagnostic name used in logs and assertion messages (default: "mock")
    pub name: String,

    /// Attribute name used by introspection hooks; reading it never
    /// auto-creates a child (default: "inspect")
    pub introspection_key: String,
}

impl DoubleConfig {
    /// Creates a config with the given name and default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the introspection key.
    pub fn with_introspection_key(mut self, key: impl Into<String>) -> Self {
        self.introspection_key = key.into();
        self
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the config a child at `key` inherits.
    pub(crate) fn child(&self, key: &str) -> Self {
        Self {
            name: format!("{}.{}", self.name, key),
            introspection_key: self.introspection_key.clone(),
        }
    }
}

impl Default for DoubleConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            introspection_key: "inspect".to_string(),
        }
    }
}
