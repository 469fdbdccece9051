//! WebAssembly bindings for header rule translation
//!
//! The extension's background script keeps the storage and engine calls and
//! hands rule collections across as JSON.

use wasm_bindgen::prelude::*;

use hm_compiler::{plan_update, translate_rules};
use hm_core::hash::rule_id;
use hm_core::pattern;
use hm_core::rule::DeclaredRule;
use hm_core::types::EngineRule;

#[wasm_bindgen]
pub fn rule_id_js(key: &str) -> u32 {
    rule_id(key)
}

#[wasm_bindgen]
pub fn is_acceptable_pattern(filter: &str) -> bool {
    pattern::is_acceptable(filter)
}

/// Translate a JSON array of stored rules.
///
/// Returns `{ rules, skipped }` where `rules` is the engine rule array and
/// `skipped` counts enabled rules that were dropped.
#[wasm_bindgen]
pub fn translate_rules_js(declared_json: &str) -> Result<JsValue, JsValue> {
    let (rules_json, skipped) = translate_json(declared_json).map_err(|e| JsValue::from_str(&e))?;

    if skipped > 0 {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "{skipped} rule(s) skipped during translation"
        )));
    }

    let rules = js_sys::JSON::parse(&rules_json)?;
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"rules".into(), &rules);
    let _ = js_sys::Reflect::set(&result, &"skipped".into(), &JsValue::from(skipped as u32));
    Ok(result.into())
}

/// Plan the engine update for `active_json` (engine rules) against
/// `declared_json` (stored rules).
///
/// Returns `{ kind: "apply" | "clear" | "noop", removeRuleIds?, addRules? }`.
#[wasm_bindgen]
pub fn plan_update_js(active_json: &str, declared_json: &str) -> Result<JsValue, JsValue> {
    let plan_json = plan_json(active_json, declared_json).map_err(|e| JsValue::from_str(&e))?;
    js_sys::JSON::parse(&plan_json)
}

fn parse_declared(declared_json: &str) -> Result<Vec<DeclaredRule>, String> {
    serde_json::from_str(declared_json).map_err(|e| format!("Invalid stored rules: {}", e))
}

fn translate_json(declared_json: &str) -> Result<(String, usize), String> {
    let declared = parse_declared(declared_json)?;
    let enabled = declared.iter().filter(|r| r.enabled).count();
    let rules = translate_rules(&declared);
    let json = serde_json::to_string(&rules).map_err(|e| format!("Failed to encode rules: {}", e))?;
    Ok((json, enabled - rules.len()))
}

fn plan_json(active_json: &str, declared_json: &str) -> Result<String, String> {
    let active: Vec<EngineRule> =
        serde_json::from_str(active_json).map_err(|e| format!("Invalid active rules: {}", e))?;
    let declared = parse_declared(declared_json)?;
    let desired = translate_rules(&declared);
    serde_json::to_string(&plan_update(&active, &desired))
        .map_err(|e| format!("Failed to encode plan: {}", e))
}
