//! Header Rules Core Library
//!
//! This crate provides the data model shared by every part of the header rule
//! reconciler: the user-declared rules, the engine-native rules they are
//! translated into, and the two leaf functions the translator depends on.
//!
//! # Architecture
//!
//! Declared rules are the only source of truth. Engine rules are derived from
//! them on every reconciliation pass and are never read back into the declared
//! model, so everything in this crate is a pure function of its input.
//!
//! # Modules
//!
//! - `hash`: maps opaque rule keys onto the engine's bounded integer id space
//! - `pattern`: rudimentary URL filter acceptance check
//! - `rule`: declared rules and creation-time validation
//! - `types`: engine rule representation

pub mod hash;
pub mod pattern;
pub mod rule;
pub mod types;

// Re-export commonly used types
pub use hash::{rule_id, RuleId, MAX_RULE_ID};
pub use pattern::{is_acceptable, LenientCheck, PatternCheck, PatternKind};
pub use rule::{DeclaredRule, NewRule, Operation, RuleError};
pub use types::{
    EngineRule, HeaderAction, HeaderOperation, ResourceType, RuleAction, RuleCondition,
    MATCH_ALL_FILTER, TARGET_RESOURCE_TYPES,
};
