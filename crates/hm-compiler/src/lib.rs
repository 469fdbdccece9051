//! Header Rules Compiler
//!
//! This crate turns declared rules into engine rules and plans the single
//! batch update that brings the engine's active set in line with them.

pub mod diff;
pub mod translator;

pub use diff::{compute_diff, plan_update, RuleDiff, UpdatePlan};
pub use translator::{translate_rules, Translator};
