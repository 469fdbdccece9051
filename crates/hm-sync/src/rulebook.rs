//! Rule book: the operations a rule list UI performs against the store.

use std::sync::Arc;

use hm_core::rule::{DeclaredRule, NewRule};

use crate::error::{BookAction, RuleBookError};
use crate::ports::{Badge, IndicatorState, RuleStore};

/// Shown while the badge reports a failed pass.
pub const APPLY_WARNING: &str =
    "Warning: One or more rules may have failed to apply. Check background console.";

/// Badge state as the rule list presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub indicator: IndicatorState,
    pub warning: Option<&'static str>,
}

#[derive(Clone)]
pub struct RuleBook {
    store: Arc<dyn RuleStore>,
    badge: Arc<dyn Badge>,
}

impl RuleBook {
    pub fn new(store: Arc<dyn RuleStore>, badge: Arc<dyn Badge>) -> Self {
        Self { store, badge }
    }

    pub async fn list(&self) -> Result<Vec<DeclaredRule>, RuleBookError> {
        self.store
            .read_rules()
            .await
            .map_err(RuleBookError::store(BookAction::Load))
    }

    /// Validate `input` and append it to the collection.
    pub async fn add(&self, input: NewRule) -> Result<DeclaredRule, RuleBookError> {
        let rule = DeclaredRule::create(input)?;
        let mut rules = self
            .store
            .read_rules()
            .await
            .map_err(RuleBookError::store(BookAction::Save))?;
        rules.push(rule.clone());
        self.store
            .write_rules(rules)
            .await
            .map_err(RuleBookError::store(BookAction::Save))?;
        log::info!("Added rule {} ({})", rule.id, rule.action_label());
        Ok(rule)
    }

    /// Remove the rule with `id`. Returns whether a rule was removed; the
    /// collection is rewritten either way.
    pub async fn delete(&self, id: &str) -> Result<bool, RuleBookError> {
        let rules = self
            .store
            .read_rules()
            .await
            .map_err(RuleBookError::store(BookAction::Delete))?;
        let before = rules.len();
        let kept: Vec<_> = rules.into_iter().filter(|r| r.id != id).collect();
        let removed = kept.len() != before;
        self.store
            .write_rules(kept)
            .await
            .map_err(RuleBookError::store(BookAction::Delete))?;
        if removed {
            log::info!("Deleted rule {id}");
        } else {
            log::debug!("No rule with id {id} to delete");
        }
        Ok(removed)
    }

    /// Toggle a rule without deleting it.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<DeclaredRule, RuleBookError> {
        let mut rules = self
            .store
            .read_rules()
            .await
            .map_err(RuleBookError::store(BookAction::Save))?;
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleBookError::NotFound(id.to_string()))?;
        rule.enabled = enabled;
        let updated = rule.clone();
        self.store
            .write_rules(rules)
            .await
            .map_err(RuleBookError::store(BookAction::Save))?;
        Ok(updated)
    }

    pub async fn status(&self) -> Status {
        let indicator = self.badge.state().await;
        Status {
            indicator,
            warning: (indicator == IndicatorState::Error).then_some(APPLY_WARNING),
        }
    }
}
