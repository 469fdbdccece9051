use std::path::{Path, PathBuf};
use std::sync::Arc;

use hm_sync::{
    EngineOptions, JsonFileBadge, JsonFileEngine, JsonFileStore, Reconciler, RuleBook, RuleStore,
    StoreChange, SyncConfig, Trigger, Triggers,
};

const STORE_FILE: &str = "store.json";
const ENGINE_FILE: &str = "engine.json";
const BADGE_FILE: &str = "badge.json";

/// Collaborators backed by files in one state directory.
pub struct State {
    pub store: Arc<JsonFileStore>,
    pub engine: Arc<JsonFileEngine>,
    pub reconciler: Reconciler,
    pub triggers: Triggers,
    pub book: RuleBook,
}

impl State {
    pub fn open(dir: &Path, config: &SyncConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(dir.join(STORE_FILE), &config.collection_key));
        let engine = Arc::new(JsonFileEngine::new(
            dir.join(ENGINE_FILE),
            EngineOptions::from(config),
        ));
        let badge = Arc::new(JsonFileBadge::new(dir.join(BADGE_FILE)));

        let reconciler = Reconciler::new(store.clone(), engine.clone(), badge.clone());
        let triggers = Triggers::new(reconciler.clone(), config);
        let book = RuleBook::new(store.clone(), badge);

        Self {
            store,
            engine,
            reconciler,
            triggers,
            book,
        }
    }

    /// Deliver the change notification produced by a store write.
    pub async fn notify_change(
        &self,
        changes: &mut tokio::sync::broadcast::Receiver<StoreChange>,
    ) -> Result<(), String> {
        let change = changes
            .recv()
            .await
            .map_err(|e| format!("Missed store notification: {}", e))?;
        match self.triggers.fire(Trigger::StoreChanged(change)).await {
            Some(Err(e)) => Err(e.user_message().to_string()),
            _ => Ok(()),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<SyncConfig, String> {
    match path {
        Some(path) => SyncConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {}", path.display(), e)),
        None => Ok(SyncConfig::default()),
    }
}
