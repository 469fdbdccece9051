//! Update planning

use std::collections::HashSet;

use serde::Serialize;

use hm_core::hash::RuleId;
use hm_core::types::EngineRule;

/// Removals and additions for one engine update.
///
/// `add_rules` carries every desired rule, including those whose id is already
/// active: the engine replaces a rule added under an existing id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiff {
    pub remove_rule_ids: Vec<RuleId>,
    pub add_rules: Vec<EngineRule>,
}

impl RuleDiff {
    pub fn is_empty(&self) -> bool {
        self.remove_rule_ids.is_empty() && self.add_rules.is_empty()
    }
}

/// Active ids missing from the desired set, plus the desired rules.
///
/// Each stale id appears once, in the order it was first seen.
pub fn compute_diff(active: &[EngineRule], desired: &[EngineRule]) -> RuleDiff {
    let desired_ids: HashSet<RuleId> = desired.iter().map(|r| r.id).collect();
    let mut seen = HashSet::new();

    let remove_rule_ids = active
        .iter()
        .map(|r| r.id)
        .filter(|id| !desired_ids.contains(id) && seen.insert(*id))
        .collect();

    RuleDiff {
        remove_rule_ids,
        add_rules: desired.to_vec(),
    }
}

/// The single call a pass makes against the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UpdatePlan {
    /// Nothing is desired any more; remove everything that is active.
    Clear {
        #[serde(rename = "removeRuleIds")]
        remove_rule_ids: Vec<RuleId>,
    },
    /// Remove stale ids and add/update the desired rules in one batch.
    Apply(RuleDiff),
    /// Engine and desired set are both empty.
    Noop,
}

impl UpdatePlan {
    /// Resulting `(remove ids, add rules)` batch, if any.
    pub fn into_batch(self) -> Option<(Vec<RuleId>, Vec<EngineRule>)> {
        match self {
            Self::Clear { remove_rule_ids } => Some((remove_rule_ids, Vec::new())),
            Self::Apply(diff) => Some((diff.remove_rule_ids, diff.add_rules)),
            Self::Noop => None,
        }
    }
}

/// Decide the engine call for a pass.
pub fn plan_update(active: &[EngineRule], desired: &[EngineRule]) -> UpdatePlan {
    let diff = compute_diff(active, desired);

    if desired.is_empty() && !active.is_empty() {
        return UpdatePlan::Clear {
            remove_rule_ids: diff.remove_rule_ids,
        };
    }

    if !diff.is_empty() {
        UpdatePlan::Apply(diff)
    } else {
        UpdatePlan::Noop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_core::types::{HeaderAction, RuleAction, RuleCondition};

    fn rule(id: RuleId, priority: u32) -> EngineRule {
        EngineRule {
            id,
            priority,
            action: RuleAction::modify_header(HeaderAction::set("X-Test", "1")),
            condition: RuleCondition::for_pattern(""),
        }
    }

    #[test]
    fn test_stale_id_removed_once() {
        let active = [rule(7, 1), rule(9, 2), rule(7, 3)];
        let desired = [rule(9, 1)];
        let diff = compute_diff(&active, &desired);
        assert_eq!(diff.remove_rule_ids, [7]);
        assert_eq!(diff.add_rules, desired);
    }

    #[test]
    fn test_existing_ids_are_re_added() {
        let active = [rule(1, 1), rule(2, 2)];
        let desired = [rule(1, 1), rule(2, 2)];
        let diff = compute_diff(&active, &desired);
        assert!(diff.remove_rule_ids.is_empty());
        assert_eq!(diff.add_rules.len(), 2);
    }

    #[test]
    fn test_plan_clear_when_nothing_desired() {
        let active = [rule(1, 1), rule(2, 2)];
        assert_eq!(
            plan_update(&active, &[]),
            UpdatePlan::Clear {
                remove_rule_ids: vec![1, 2]
            }
        );
    }

    #[test]
    fn test_plan_noop_when_both_empty() {
        assert_eq!(plan_update(&[], &[]), UpdatePlan::Noop);
        assert_eq!(UpdatePlan::Noop.into_batch(), None);
    }

    #[test]
    fn test_plan_apply_combines_remove_and_add() {
        let active = [rule(1, 1)];
        let desired = [rule(2, 1)];
        let (remove, add) = plan_update(&active, &desired).into_batch().unwrap();
        assert_eq!(remove, [1]);
        assert_eq!(add, desired);
    }

    #[test]
    fn test_plan_json() {
        let plan = plan_update(&[rule(5, 1)], &[]);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["kind"], "clear");
        assert_eq!(json["removeRuleIds"][0], 5);

        let plan = plan_update(&[], &[rule(3, 1)]);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["kind"], "apply");
        assert_eq!(json["addRules"][0]["id"], 3);
    }
}
