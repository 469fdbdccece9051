//! Update semantics shared by the bundled engine adapters.

use hm_core::hash::RuleId;
use hm_core::types::EngineRule;

use crate::config::SyncConfig;
use crate::error::EngineError;

/// Engine-side checks applied to every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub rule_limit: usize,
    pub validate_filters: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for EngineOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            rule_limit: config.rule_limit,
            validate_filters: config.validate_filters,
        }
    }
}

/// Apply one batch to `rules`, all or nothing.
///
/// Removals run first, then additions in order. An added rule with an id that
/// is already present replaces it in place, so among duplicate ids in one
/// batch the last one wins.
pub fn apply_batch(
    rules: &mut Vec<EngineRule>,
    remove_ids: &[RuleId],
    add_rules: Vec<EngineRule>,
    options: EngineOptions,
) -> Result<(), EngineError> {
    let mut next: Vec<EngineRule> = rules
        .iter()
        .filter(|r| !remove_ids.contains(&r.id))
        .cloned()
        .collect();

    for rule in add_rules {
        if rule.id == 0 || rule.priority == 0 {
            return Err(EngineError::Rejected(format!(
                "Rule with id {} must have a positive id and priority",
                rule.id
            )));
        }
        if options.validate_filters {
            check_condition(&rule)?;
        }
        match next.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => *slot = rule,
            None => next.push(rule),
        }
    }

    if next.len() > options.rule_limit {
        return Err(EngineError::QuotaExceeded {
            limit: options.rule_limit,
            requested: next.len(),
        });
    }

    *rules = next;
    Ok(())
}

fn check_condition(rule: &EngineRule) -> Result<(), EngineError> {
    let filter = &rule.condition.url_filter;
    let valid = !filter.is_empty()
        && filter.is_ascii()
        && !filter.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control());
    if valid && !rule.condition.resource_types.is_empty() {
        Ok(())
    } else {
        Err(EngineError::from_reason(&format!(
            "Rule with id {} specifies an Invalid rule condition: {filter:?}",
            rule.id
        )))
    }
}
