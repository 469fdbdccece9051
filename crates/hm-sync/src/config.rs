//! Sync configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Store key holding the declared rule collection.
pub const DEFAULT_COLLECTION_KEY: &str = "rules";

/// Dynamic rule quota enforced by the bundled engine adapters.
pub const DEFAULT_RULE_LIMIT: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Change notifications for this key trigger a pass
    pub collection_key: String,
    /// Maximum number of active engine rules
    pub rule_limit: usize,
    /// Whether the bundled engines validate URL filters themselves
    pub validate_filters: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
            rule_limit: DEFAULT_RULE_LIMIT,
            validate_filters: true,
        }
    }
}

impl SyncConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
