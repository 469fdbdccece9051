use std::sync::Arc;

use hm_core::hash::rule_id;
use hm_core::rule::{DeclaredRule, Operation};
use hm_core::types::{EngineRule, HeaderAction, HeaderOperation, RuleAction, RuleCondition, MATCH_ALL_FILTER};
use hm_sync::{
    ApplyCall, Badge, IndicatorState, MemoryBadge, MemoryEngine, MemoryStore, ReconcileOutcome,
    Reconciler, RuleStore,
};

struct Harness {
    reconciler: Reconciler,
    store: Arc<MemoryStore>,
    engine: Arc<MemoryEngine>,
    badge: Arc<MemoryBadge>,
}

impl Harness {
    fn new(rules: Vec<DeclaredRule>, active: Vec<EngineRule>) -> Self {
        let store = Arc::new(MemoryStore::new(rules));
        let engine = Arc::new(MemoryEngine::with_rules(active));
        let badge = Arc::new(MemoryBadge::default());
        let reconciler = Reconciler::new(store.clone(), engine.clone(), badge.clone());
        Self {
            reconciler,
            store,
            engine,
            badge,
        }
    }
}

fn declared(id: &str, pattern: &str, op: Operation, name: &str, value: &str) -> DeclaredRule {
    DeclaredRule {
        id: id.to_string(),
        domain_pattern: pattern.to_string(),
        operation: op,
        header_name: name.to_string(),
        header_value: value.to_string(),
        enabled: true,
    }
}

fn active_rule(id: u32) -> EngineRule {
    EngineRule {
        id,
        priority: 1,
        action: RuleAction::modify_header(HeaderAction::set("X-Old", "1")),
        condition: RuleCondition::for_pattern(""),
    }
}

#[tokio::test]
async fn test_scenario_a_empty_store_clears_engine() {
    let h = Harness::new(Vec::new(), vec![active_rule(11), active_rule(22)]);

    let outcome = h.reconciler.reconcile().await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Cleared { removed: 2 });
    assert_eq!(
        h.engine.calls().await,
        vec![ApplyCall {
            remove_ids: vec![11, 22],
            add_rules: Vec::new(),
        }]
    );
    assert!(h.engine.rules().await.is_empty());
}

#[tokio::test]
async fn test_scenario_b_set_header_on_all_sites() {
    let h = Harness::new(
        vec![declared("r1", "", Operation::Set, "X-Test", "1")],
        Vec::new(),
    );
    h.reconciler.reconcile().await.unwrap();

    let rules = h.engine.rules().await;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, rule_id("r1"));
    assert_eq!(rules[0].priority, 1);
    assert_eq!(rules[0].condition.url_filter, MATCH_ALL_FILTER);
    assert_eq!(rules[0].action.request_headers(), [HeaderAction::set("X-Test", "1")]);
}

#[tokio::test]
async fn test_scenario_c_remove_header_has_no_value() {
    let h = Harness::new(
        vec![declared("r2", "*://*.example.com/*", Operation::Remove, "Referer", "ignored")],
        Vec::new(),
    );
    h.reconciler.reconcile().await.unwrap();

    let rules = h.engine.rules().await;
    assert_eq!(rules.len(), 1);
    let header = &rules[0].action.request_headers()[0];
    assert_eq!(header.header, "Referer");
    assert_eq!(header.operation, HeaderOperation::Remove);
    assert_eq!(header.value, None);

    let json = serde_json::to_value(&rules[0]).unwrap();
    assert!(json["action"]["requestHeaders"][0].get("value").is_none());
}

#[tokio::test]
async fn test_scenario_d_stale_id_removed_once() {
    let h = Harness::new(
        vec![declared("r1", "", Operation::Set, "X-Test", "1")],
        vec![active_rule(404), active_rule(rule_id("r1"))],
    );
    h.reconciler.reconcile().await.unwrap();

    let calls = h.engine.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].remove_ids, [404]);
    let ids: Vec<_> = h.engine.rules().await.iter().map(|r| r.id).collect();
    assert_eq!(ids, [rule_id("r1")]);
}

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let h = Harness::new(
        vec![
            declared("r1", "", Operation::Set, "X-Test", "1"),
            declared("r2", "example.com", Operation::Remove, "Cookie", ""),
        ],
        vec![active_rule(404)],
    );
    h.reconciler.reconcile().await.unwrap();
    let after_first = h.engine.rules().await;

    let outcome = h.reconciler.reconcile().await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied { removed: 0, added: 2 });
    assert_eq!(h.engine.rules().await, after_first);

    let calls = h.engine.calls().await;
    assert!(calls[1].remove_ids.is_empty());
}

#[tokio::test]
async fn test_colliding_keys_last_rule_survives() {
    // "Aa" and "BB" map to the same engine id
    let h = Harness::new(
        vec![
            declared("Aa", "", Operation::Set, "X-First", "1"),
            declared("BB", "", Operation::Set, "X-Second", "2"),
        ],
        Vec::new(),
    );
    h.reconciler.reconcile().await.unwrap();

    let rules = h.engine.rules().await;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, rule_id("Aa"));
    assert_eq!(rules[0].action.request_headers()[0].header, "X-Second");
    assert_eq!(rules[0].priority, 2);
}

#[tokio::test]
async fn test_overlapping_passes_converge() {
    let h = Harness::new(
        vec![
            declared("r1", "", Operation::Set, "X-Test", "1"),
            declared("r2", "/api/*", Operation::Set, "X-Api", "yes"),
        ],
        vec![active_rule(7)],
    );

    let (a, b, c) = tokio::join!(
        h.reconciler.reconcile(),
        h.reconciler.reconcile(),
        h.reconciler.reconcile()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let mut ids: Vec<_> = h.engine.rules().await.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    let mut expected = vec![rule_id("r1"), rule_id("r2")];
    expected.sort_unstable();
    assert_eq!(ids, expected);
    assert_eq!(h.badge.state().await, IndicatorState::Clear);
}

#[tokio::test]
async fn test_failed_pass_is_not_retried() {
    let h = Harness::new(vec![declared("r1", "", Operation::Set, "X-Test", "1")], Vec::new());
    h.engine.fail_with(Some("Invalid rule condition")).await;

    let err = h.reconciler.reconcile().await.unwrap_err();
    assert!(err.is_invalid_condition());
    assert_eq!(h.engine.calls().await.len(), 1);
    assert_eq!(h.badge.state().await, IndicatorState::Error);

    // the next store change acts as the retry
    h.engine.fail_with(None).await;
    h.store
        .write_rules(vec![declared("r1", "", Operation::Set, "X-Test", "2")])
        .await
        .unwrap();
    h.reconciler.reconcile().await.unwrap();
    assert_eq!(h.badge.state().await, IndicatorState::Clear);
    assert_eq!(h.engine.rules().await[0].action.request_headers()[0].value.as_deref(), Some("2"));
}
