//! Error types for store, engine and reconciliation failures.

use std::fmt;

use hm_core::rule::RuleError;

/// Failure reading or writing the declared rule collection.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed rule collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by the filtering engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid rule condition: {0}")]
    InvalidCondition(String),
    #[error("Rule quota exceeded: {requested} rules requested, limit is {limit}")]
    QuotaExceeded { limit: usize, requested: usize },
    #[error("Engine rejected update: {0}")]
    Rejected(String),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed engine state: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Classify a raw failure message from the engine.
    pub fn from_reason(reason: &str) -> Self {
        if reason.to_ascii_lowercase().contains("invalid rule condition") {
            Self::InvalidCondition(reason.to_string())
        } else {
            Self::Rejected(reason.to_string())
        }
    }

    pub fn is_invalid_condition(&self) -> bool {
        matches!(self, Self::InvalidCondition(_))
    }
}

/// A failed reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Install reason outside `install`, `update` and `browser_update`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown install reason: {0}")]
pub struct UnknownInstallReason(pub String);

impl SyncError {
    pub fn is_invalid_condition(&self) -> bool {
        matches!(self, Self::Engine(e) if e.is_invalid_condition())
    }

    pub fn user_message(&self) -> &'static str {
        if self.is_invalid_condition() {
            "Error updating rules: Invalid urlFilter pattern likely. Please check your rule patterns."
        } else {
            "Error updating rules."
        }
    }
}

/// Which rule book action touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    Load,
    Save,
    Delete,
}

impl fmt::Display for BookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Delete => "delete",
        })
    }
}

/// Failure of a rule book operation, with a message fit for the user.
#[derive(Debug, thiserror::Error)]
pub enum RuleBookError {
    #[error(transparent)]
    Invalid(#[from] RuleError),
    #[error("Failed to {action} rules: {source}")]
    Store {
        action: BookAction,
        #[source]
        source: StoreError,
    },
    #[error("Rule not found: {0}")]
    NotFound(String),
}

impl RuleBookError {
    pub(crate) fn store(action: BookAction) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { action, source }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "Please fill in Header Name, and Value (unless removing).",
            Self::Store { action: BookAction::Load, .. } => "Error loading rules from storage.",
            Self::Store { action: BookAction::Save, .. } => "Error saving rule to storage.",
            Self::Store { action: BookAction::Delete, .. } => "Error deleting rule from storage.",
            Self::NotFound(_) => "Rule not found.",
        }
    }
}

/// Failure loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
