//! Ports for the collaborators a reconciliation pass talks to.
//!
//! The rule store, the filtering engine and the visible error badge are all
//! external. Adapters in `memory` and `file` implement these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hm_core::hash::RuleId;
use hm_core::rule::DeclaredRule;
use hm_core::types::EngineRule;

use crate::error::{EngineError, StoreError};

/// Notification that a stored collection changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Store key that was written
    pub key: String,
    /// The collection after the write
    pub rules: Vec<DeclaredRule>,
}

/// Persistent declared-rule collection.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Read the full collection. Absent collections read as empty.
    async fn read_rules(&self) -> Result<Vec<DeclaredRule>, StoreError>;

    /// Replace the collection and notify subscribers.
    async fn write_rules(&self, rules: Vec<DeclaredRule>) -> Result<(), StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Packet-filtering engine holding the active rule set.
#[async_trait]
pub trait FilterEngine: Send + Sync {
    async fn active_rules(&self) -> Result<Vec<EngineRule>, EngineError>;

    /// Remove `remove_ids` then add `add_rules` as one atomic batch. Adding a
    /// rule whose id is already active replaces it.
    async fn apply(&self, remove_ids: Vec<RuleId>, add_rules: Vec<EngineRule>)
        -> Result<(), EngineError>;
}

/// Two-state visible error indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorState {
    #[default]
    Clear,
    Error,
}

impl IndicatorState {
    pub fn badge_text(&self) -> &'static str {
        match self {
            Self::Clear => "",
            Self::Error => "ERR",
        }
    }

    /// Crimson while in error.
    pub fn badge_color(&self) -> Option<&'static str> {
        match self {
            Self::Clear => None,
            Self::Error => Some("#DC143C"),
        }
    }

    pub fn from_badge_text(text: &str) -> Self {
        if text == "ERR" {
            Self::Error
        } else {
            Self::Clear
        }
    }
}

/// Where the error indicator is shown.
#[async_trait]
pub trait Badge: Send + Sync {
    async fn set_state(&self, state: IndicatorState);
    async fn state(&self) -> IndicatorState;
}

/// Broadcast channel shared by store adapters.
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    key: String,
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    const CAPACITY: usize = 64;

    pub(crate) fn new(key: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(Self::CAPACITY);
        Self {
            key: key.into(),
            sender,
        }
    }

    pub(crate) fn notify(&self, rules: Vec<DeclaredRule>) {
        // no receivers is fine
        let _ = self.sender.send(StoreChange {
            key: self.key.clone(),
            rules,
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.sender.subscribe()
    }
}
