//! Header Rules Sync
//!
//! Keeps a filtering engine's active header rules in line with the declared
//! rule collection.
//!
//! # Modules
//!
//! - `ports`: store, engine and badge traits
//! - `reconciler`: the reconciliation pass
//! - `triggers`: lifecycle and store-change listeners
//! - `rulebook`: add/delete/toggle operations for a rule list UI
//! - `engine`: batch semantics shared by the bundled engines
//! - `memory`, `file`: in-process and JSON file collaborators
//! - `config`, `error`: configuration and error types

pub mod config;
pub mod engine;
pub mod error;
pub mod file;
pub mod memory;
pub mod ports;
pub mod reconciler;
pub mod rulebook;
pub mod triggers;

pub use config::SyncConfig;
pub use engine::EngineOptions;
pub use error::{
    ConfigError, EngineError, RuleBookError, StoreError, SyncError, UnknownInstallReason,
};
pub use file::{JsonFileBadge, JsonFileEngine, JsonFileStore};
pub use memory::{ApplyCall, MemoryBadge, MemoryEngine, MemoryStore};
pub use ports::{Badge, FilterEngine, IndicatorState, RuleStore, StoreChange};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use rulebook::{RuleBook, Status, APPLY_WARNING};
pub use triggers::{InstallReason, Trigger, Triggers};
