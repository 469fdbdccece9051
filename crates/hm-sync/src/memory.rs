//! In-process collaborators.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, RwLock};

use hm_core::hash::RuleId;
use hm_core::rule::DeclaredRule;
use hm_core::types::EngineRule;

use crate::config::DEFAULT_COLLECTION_KEY;
use crate::engine::{apply_batch, EngineOptions};
use crate::error::{EngineError, StoreError};
use crate::ports::{Badge, ChangeFeed, FilterEngine, IndicatorState, RuleStore, StoreChange};

// =============================================================================
// Store
// =============================================================================

/// Rule collection held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    rules: RwLock<Vec<DeclaredRule>>,
    feed: ChangeFeed,
    failing: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryStore {
    pub fn new(rules: Vec<DeclaredRule>) -> Self {
        Self::with_key(DEFAULT_COLLECTION_KEY, rules)
    }

    pub fn with_key(key: impl Into<String>, rules: Vec<DeclaredRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
            feed: ChangeFeed::new(key),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every read and write fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn read_rules(&self) -> Result<Vec<DeclaredRule>, StoreError> {
        self.check_available()?;
        Ok(self.rules.read().await.clone())
    }

    async fn write_rules(&self, rules: Vec<DeclaredRule>) -> Result<(), StoreError> {
        self.check_available()?;
        *self.rules.write().await = rules.clone();
        self.feed.notify(rules);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// One recorded `apply` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCall {
    pub remove_ids: Vec<RuleId>,
    pub add_rules: Vec<EngineRule>,
}

#[derive(Debug, Default)]
struct EngineState {
    rules: Vec<EngineRule>,
    calls: Vec<ApplyCall>,
    fail_reason: Option<String>,
}

/// Filtering engine held in memory. Records every apply call.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
    options: EngineOptions,
}

impl MemoryEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            state: Mutex::default(),
            options,
        }
    }

    /// Start with `rules` already active.
    pub fn with_rules(rules: Vec<EngineRule>) -> Self {
        Self {
            state: Mutex::new(EngineState {
                rules,
                ..EngineState::default()
            }),
            options: EngineOptions::default(),
        }
    }

    /// Fail every apply call with `reason` until cleared with `None`.
    pub async fn fail_with(&self, reason: Option<&str>) {
        self.state.lock().await.fail_reason = reason.map(str::to_string);
    }

    pub async fn calls(&self) -> Vec<ApplyCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn rules(&self) -> Vec<EngineRule> {
        self.state.lock().await.rules.clone()
    }
}

#[async_trait]
impl FilterEngine for MemoryEngine {
    async fn active_rules(&self) -> Result<Vec<EngineRule>, EngineError> {
        Ok(self.state.lock().await.rules.clone())
    }

    async fn apply(
        &self,
        remove_ids: Vec<RuleId>,
        add_rules: Vec<EngineRule>,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        state.calls.push(ApplyCall {
            remove_ids: remove_ids.clone(),
            add_rules: add_rules.clone(),
        });

        if let Some(reason) = &state.fail_reason {
            return Err(EngineError::from_reason(reason));
        }

        apply_batch(&mut state.rules, &remove_ids, add_rules, self.options)
    }
}

// =============================================================================
// Badge
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryBadge {
    state: RwLock<IndicatorState>,
}

#[async_trait]
impl Badge for MemoryBadge {
    async fn set_state(&self, state: IndicatorState) {
        *self.state.write().await = state;
    }

    async fn state(&self) -> IndicatorState {
        *self.state.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_core::types::{HeaderAction, RuleAction, RuleCondition};

    fn engine_rule(id: RuleId) -> EngineRule {
        EngineRule {
            id,
            priority: 1,
            action: RuleAction::modify_header(HeaderAction::set("X-Test", "1")),
            condition: RuleCondition::for_pattern(""),
        }
    }

    #[tokio::test]
    async fn test_store_write_notifies() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe();
        store.write_rules(Vec::new()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().key, "rules");
    }

    #[tokio::test]
    async fn test_failing_store_keeps_collection() {
        let rule = DeclaredRule {
            id: "r1".into(),
            domain_pattern: String::new(),
            operation: hm_core::rule::Operation::Set,
            header_name: "X-Test".into(),
            header_value: "1".into(),
            enabled: true,
        };
        let store = MemoryStore::new(vec![rule.clone()]);
        store.set_failing(true);
        assert!(store.write_rules(Vec::new()).await.is_err());
        assert!(store.read_rules().await.is_err());
        store.set_failing(false);
        assert_eq!(store.read_rules().await.unwrap(), vec![rule]);
    }

    #[tokio::test]
    async fn test_engine_records_calls() {
        let engine = MemoryEngine::with_rules(vec![engine_rule(1)]);
        engine.apply(vec![1], vec![engine_rule(2)]).await.unwrap();
        let calls = engine.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].remove_ids, [1]);
        assert_eq!(engine.rules().await, vec![engine_rule(2)]);
    }

    #[tokio::test]
    async fn test_engine_forced_failure() {
        let engine = MemoryEngine::default();
        engine.fail_with(Some("Invalid rule condition")).await;
        let err = engine.apply(Vec::new(), vec![engine_rule(3)]).await.unwrap_err();
        assert!(err.is_invalid_condition());
        assert!(engine.rules().await.is_empty());

        engine.fail_with(None).await;
        engine.apply(Vec::new(), vec![engine_rule(3)]).await.unwrap();
        assert_eq!(engine.rules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_badge_state() {
        let badge = MemoryBadge::default();
        assert_eq!(badge.state().await, IndicatorState::Clear);
        badge.set_state(IndicatorState::Error).await;
        assert_eq!(badge.state().await, IndicatorState::Error);
    }
}
