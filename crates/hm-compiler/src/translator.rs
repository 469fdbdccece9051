//! Rule translation
//!
//! Maps declared rules onto the engine's modify-headers rules. Disabled and
//! unusable records are dropped; everything else keeps its input order.

use hm_core::hash::rule_id;
use hm_core::pattern::{LenientCheck, PatternCheck};
use hm_core::rule::{DeclaredRule, Operation};
use hm_core::types::{EngineRule, HeaderAction, RuleAction, RuleCondition};

/// Declared rule to engine rule translation.
///
/// Priorities start at 1 and advance once per enabled input record, including
/// records that are later dropped, so surviving rules keep their relative
/// priorities when a neighbour is rejected.
#[derive(Debug, Clone, Default)]
pub struct Translator<C = LenientCheck> {
    check: C,
}

impl Translator<LenientCheck> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: PatternCheck> Translator<C> {
    pub fn with_check(check: C) -> Self {
        Self { check }
    }

    pub fn translate(&self, rules: &[DeclaredRule]) -> Vec<EngineRule> {
        let mut out = Vec::with_capacity(rules.len());
        let mut priority = 0u32;

        for rule in rules {
            if !rule.enabled {
                continue;
            }
            priority += 1;

            if let Some(engine_rule) = self.translate_one(rule, priority) {
                out.push(engine_rule);
            }
        }

        out
    }

    fn translate_one(&self, rule: &DeclaredRule, priority: u32) -> Option<EngineRule> {
        if rule.header_name.trim().is_empty() {
            log::warn!("Rule {} has no header name. Skipping rule.", rule.id);
            return None;
        }

        let condition = RuleCondition::for_pattern(&rule.domain_pattern);

        if !self.check.is_acceptable(&condition.url_filter) {
            log::warn!(
                "Rule {} has a potentially invalid urlFilter: {:?}. Skipping rule.",
                rule.id,
                condition.url_filter
            );
            return None;
        }

        let header = match rule.operation {
            Operation::Remove => HeaderAction::remove(rule.header_name.as_str()),
            Operation::Set => HeaderAction::set(rule.header_name.as_str(), rule.header_value.as_str()),
        };

        Some(EngineRule {
            id: rule_id(&rule.id),
            priority,
            action: RuleAction::modify_header(header),
            condition,
        })
    }
}

/// Translate with the default lenient pattern check.
pub fn translate_rules(rules: &[DeclaredRule]) -> Vec<EngineRule> {
    Translator::new().translate(rules)
}
