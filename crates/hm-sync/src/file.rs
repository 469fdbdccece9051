//! JSON file backed collaborators, used by the command line front end.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use hm_core::hash::RuleId;
use hm_core::rule::DeclaredRule;
use hm_core::types::EngineRule;

use crate::engine::{apply_batch, EngineOptions};
use crate::error::{EngineError, StoreError};
use crate::ports::{Badge, ChangeFeed, FilterEngine, IndicatorState, RuleStore, StoreChange};

/// Read and decode `path`, or `None` when it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> std::io::Result<Option<serde_json::Result<T>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write through a sibling temp file so readers never see a partial document.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

// =============================================================================
// Store
// =============================================================================

/// `{ "<key>": [ ...rules ], ... }` document.
type StoreDocument = serde_json::Map<String, serde_json::Value>;

/// Rule collection kept under one key of a JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    key: String,
    feed: ChangeFeed,
    // serializes read-modify-write of the document
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            path: path.into(),
            feed: ChangeFeed::new(key.clone()),
            key,
            lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<StoreDocument, StoreError> {
        match read_json::<StoreDocument>(&self.path).await? {
            Some(doc) => Ok(doc?),
            None => Ok(StoreDocument::default()),
        }
    }
}

#[async_trait]
impl RuleStore for JsonFileStore {
    async fn read_rules(&self) -> Result<Vec<DeclaredRule>, StoreError> {
        let _guard = self.lock.lock().await;
        let doc = self.read_document().await?;
        match doc.get(&self.key) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_rules(&self, rules: Vec<DeclaredRule>) -> Result<(), StoreError> {
        {
            let _guard = self.lock.lock().await;
            let mut doc = self.read_document().await?;
            doc.insert(self.key.clone(), serde_json::to_value(&rules)?);
            write_json(&self.path, &doc).await?;
        }
        self.feed.notify(rules);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Active engine rules persisted as a JSON array.
#[derive(Debug)]
pub struct JsonFileEngine {
    path: PathBuf,
    options: EngineOptions,
    lock: Mutex<()>,
}

impl JsonFileEngine {
    pub fn new(path: impl Into<PathBuf>, options: EngineOptions) -> Self {
        Self {
            path: path.into(),
            options,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<EngineRule>, EngineError> {
        match read_json(&self.path).await? {
            Some(rules) => Ok(rules?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl FilterEngine for JsonFileEngine {
    async fn active_rules(&self) -> Result<Vec<EngineRule>, EngineError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn apply(
        &self,
        remove_ids: Vec<RuleId>,
        add_rules: Vec<EngineRule>,
    ) -> Result<(), EngineError> {
        let _guard = self.lock.lock().await;
        let mut rules = self.load().await?;
        apply_batch(&mut rules, &remove_ids, add_rules, self.options)?;
        write_json(&self.path, &rules).await?;
        Ok(())
    }
}

// =============================================================================
// Badge
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct BadgeDocument {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

/// Badge text and colour persisted as JSON. Failures are logged, never raised.
#[derive(Debug)]
pub struct JsonFileBadge {
    path: PathBuf,
}

impl JsonFileBadge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Badge for JsonFileBadge {
    async fn set_state(&self, state: IndicatorState) {
        let doc = BadgeDocument {
            text: state.badge_text().to_string(),
            color: state.badge_color().map(str::to_string),
        };
        if let Err(e) = write_json(&self.path, &doc).await {
            log::error!("Failed to write badge '{}': {}", self.path.display(), e);
        }
    }

    async fn state(&self) -> IndicatorState {
        match read_json::<BadgeDocument>(&self.path).await {
            Ok(Some(Ok(doc))) => IndicatorState::from_badge_text(&doc.text),
            Ok(None) => IndicatorState::Clear,
            Ok(Some(Err(e))) => {
                log::warn!("Ignoring malformed badge '{}': {}", self.path.display(), e);
                IndicatorState::Clear
            }
            Err(e) => {
                log::warn!("Failed to read badge '{}': {}", self.path.display(), e);
                IndicatorState::Clear
            }
        }
    }
}
