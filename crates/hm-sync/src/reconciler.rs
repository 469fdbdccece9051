//! Reconciliation pass
//!
//! A pass reads the declared rules, translates the enabled ones, reads the
//! engine's active set and submits one batch that converges the engine onto
//! the desired set. Passes keep no state between runs, so overlapping passes
//! settle on the same result regardless of interleaving.

use std::sync::Arc;

use hm_compiler::{plan_update, translate_rules, UpdatePlan};
use hm_core::types::EngineRule;

use crate::error::{StoreError, SyncError};
use crate::ports::{Badge, FilterEngine, IndicatorState, RuleStore};

/// What a successful pass did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// One combined batch was submitted.
    Applied { removed: usize, added: usize },
    /// Nothing is enabled; every active rule was removed.
    Cleared { removed: usize },
    /// Nothing active and nothing desired.
    Unchanged,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RuleStore>,
    engine: Arc<dyn FilterEngine>,
    badge: Arc<dyn Badge>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RuleStore>,
        engine: Arc<dyn FilterEngine>,
        badge: Arc<dyn Badge>,
    ) -> Self {
        Self {
            store,
            engine,
            badge,
        }
    }

    /// Run one pass and update the error badge.
    ///
    /// Failures are reported, never retried; the next trigger is the retry.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, SyncError> {
        log::info!("Updating header rules...");
        let result = self.run_pass().await;

        match &result {
            Ok(_) => self.badge.set_state(IndicatorState::Clear).await,
            Err(e) => {
                if e.is_invalid_condition() {
                    log::error!(
                        "Error updating rules: Invalid urlFilter pattern likely. Please check your rule patterns. {}",
                        e
                    );
                } else {
                    log::error!("Error updating rules: {}", e);
                }
                self.badge.set_state(IndicatorState::Error).await;
            }
        }

        result
    }

    /// Engine rules the current declared collection translates to.
    pub async fn desired_rules(&self) -> Result<Vec<EngineRule>, StoreError> {
        let declared = self.store.read_rules().await?;
        log::debug!("Stored rules fetched: {}", declared.len());

        let enabled: Vec<_> = declared.into_iter().filter(|r| r.enabled).collect();
        let desired = translate_rules(&enabled);
        log::debug!("Translated {} enabled rules into {} engine rules", enabled.len(), desired.len());

        Ok(desired)
    }

    async fn run_pass(&self) -> Result<ReconcileOutcome, SyncError> {
        let desired = self.desired_rules().await?;
        let active = self.engine.active_rules().await?;

        match plan_update(&active, &desired) {
            UpdatePlan::Apply(diff) => {
                let removed = diff.remove_rule_ids.len();
                let added = diff.add_rules.len();
                log::info!("Attempting rule update: remove {removed} rules, add/update {added} rules.");
                self.engine.apply(diff.remove_rule_ids, diff.add_rules).await?;
                log::info!("Rules updated successfully.");
                Ok(ReconcileOutcome::Applied { removed, added })
            }
            UpdatePlan::Clear { remove_rule_ids } => {
                let removed = remove_rule_ids.len();
                log::info!("No enabled rules in storage, removing all {removed} active rules.");
                self.engine.apply(remove_rule_ids, Vec::new()).await?;
                log::info!("All rules removed successfully.");
                Ok(ReconcileOutcome::Cleared { removed })
            }
            UpdatePlan::Noop => {
                log::info!("No changes needed (no active rules, no desired rules).");
                Ok(ReconcileOutcome::Unchanged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBadge, MemoryEngine, MemoryStore};
    use hm_core::hash::rule_id;
    use hm_core::rule::{DeclaredRule, Operation};

    fn declared(id: &str, enabled: bool) -> DeclaredRule {
        DeclaredRule {
            id: id.to_string(),
            domain_pattern: String::new(),
            operation: Operation::Set,
            header_name: "X-Test".to_string(),
            header_value: "1".to_string(),
            enabled,
        }
    }

    fn setup(
        rules: Vec<DeclaredRule>,
    ) -> (Reconciler, Arc<MemoryStore>, Arc<MemoryEngine>, Arc<MemoryBadge>) {
        let store = Arc::new(MemoryStore::new(rules));
        let engine = Arc::new(MemoryEngine::default());
        let badge = Arc::new(MemoryBadge::default());
        let reconciler = Reconciler::new(store.clone(), engine.clone(), badge.clone());
        (reconciler, store, engine, badge)
    }

    #[tokio::test]
    async fn test_noop_on_empty() {
        let (reconciler, _, engine, _) = setup(Vec::new());
        assert_eq!(reconciler.reconcile().await.unwrap(), ReconcileOutcome::Unchanged);
        assert!(engine.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_applies_enabled_rules_only() {
        let (reconciler, _, engine, _) = setup(vec![declared("a", true), declared("b", false)]);
        let outcome = reconciler.reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied { removed: 0, added: 1 });
        let ids: Vec<_> = engine.rules().await.iter().map(|r| r.id).collect();
        assert_eq!(ids, [rule_id("a")]);
    }

    #[tokio::test]
    async fn test_disabling_everything_clears() {
        let (reconciler, store, engine, _) = setup(vec![declared("a", true)]);
        reconciler.reconcile().await.unwrap();

        store.write_rules(vec![declared("a", false)]).await.unwrap();
        let outcome = reconciler.reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Cleared { removed: 1 });
        assert!(engine.rules().await.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_sets_badge_and_success_clears_it() {
        let (reconciler, _, engine, badge) = setup(vec![declared("a", true)]);
        engine.fail_with(Some("Internal error")).await;
        assert!(reconciler.reconcile().await.is_err());
        assert_eq!(badge.state().await, IndicatorState::Error);

        engine.fail_with(None).await;
        reconciler.reconcile().await.unwrap();
        assert_eq!(badge.state().await, IndicatorState::Clear);
    }

    #[tokio::test]
    async fn test_store_failure_fails_pass() {
        let (reconciler, store, engine, badge) = setup(vec![declared("a", true)]);
        store.set_failing(true);
        let err = reconciler.reconcile().await.unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(badge.state().await, IndicatorState::Error);
        assert!(engine.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_condition_detected() {
        let mut bad = declared("bad", true);
        bad.domain_pattern = "exa mple.com".to_string();
        let (reconciler, _, engine, _) = setup(vec![declared("ok", true), bad]);
        let err = reconciler.reconcile().await.unwrap_err();
        assert!(err.is_invalid_condition());
        // the batch is all or nothing
        assert!(engine.rules().await.is_empty());
    }
}
