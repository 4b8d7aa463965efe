//! Engine configuration.
//!
//! Built once at startup and handed to [`FragmentEngine`](crate::FragmentEngine).
//! Transforms and the cache store are passed alongside it, since neither is
//! plain data.

use serde::Deserialize;

use crate::types::ApiVersion;

/// Namespace prefixed to every cache key.
pub const DEFAULT_KEY_NAMESPACE: &str = "as_json";

/// Process-wide engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Version used when a render does not ask for one.
    /// `None` means the `unspecified` sentinel.
    pub default_version: Option<ApiVersion>,
    /// Bypass the store entirely; every render recomputes.
    pub disable_caching: bool,
    /// Prefix of every cache key.
    pub key_namespace: String,
    /// Maximum reference depth below the top-level instance.
    /// Deeper references are omitted like cycles.
    pub max_depth: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_version: None,
            disable_caching: false,
            key_namespace: DEFAULT_KEY_NAMESPACE.to_string(),
            max_depth: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Effective default version.
    pub fn default_version(&self) -> ApiVersion {
        self.default_version.clone().unwrap_or_default()
    }
}
