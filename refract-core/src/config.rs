//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// New entries in the identity registry or dependency graph after which
    /// entries for dropped targets are swept. Zero disables automatic sweeps;
    /// [`Runtime::collect_garbage`](crate::Runtime::collect_garbage) still works.
    pub prune_threshold: usize,

    /// Emit a `tracing` warning when a readonly handle is written to.
    pub warn_on_readonly: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prune_threshold: 1024,
            warn_on_readonly: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = RuntimeConfig::from_json(r#"{"prune_threshold": 8}"#).unwrap();
        assert_eq!(config.prune_threshold, 8);
        assert!(config.warn_on_readonly);
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(RuntimeConfig::from_json(r#"{"prune_threshold": "lots"}"#).is_err());
    }
}
