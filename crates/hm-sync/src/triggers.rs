//! Trigger layer
//!
//! Installation, startup and rule collection changes all converge on the same
//! reconciliation pass. Passes are not serialized: each accepted event spawns
//! its own pass and overlapping passes are safe because every pass recomputes
//! the full desired and active state.

use std::fmt;
use std::str::FromStr;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::SyncConfig;
use crate::error::{SyncError, UnknownInstallReason};
use crate::ports::StoreChange;
use crate::reconciler::{ReconcileOutcome, Reconciler};

/// Why the extension was (re)installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
}

impl InstallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::BrowserUpdate => "browser_update",
        }
    }
}

impl FromStr for InstallReason {
    type Err = UnknownInstallReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "install" => Ok(Self::Install),
            "update" => Ok(Self::Update),
            "browser_update" | "browser-update" => Ok(Self::BrowserUpdate),
            other => Err(UnknownInstallReason(other.to_string())),
        }
    }
}

impl fmt::Display for InstallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event that may start a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Installed(InstallReason),
    Startup,
    /// The background worker itself started.
    WorkerStarted,
    StoreChanged(StoreChange),
}

#[derive(Clone)]
pub struct Triggers {
    reconciler: Reconciler,
    collection_key: String,
}

impl Triggers {
    pub fn new(reconciler: Reconciler, config: &SyncConfig) -> Self {
        Self {
            reconciler,
            collection_key: config.collection_key.clone(),
        }
    }

    /// Store changes only count for the rule collection key.
    pub fn accepts(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::StoreChanged(change) => change.key == self.collection_key,
            _ => true,
        }
    }

    /// Run a pass for `trigger` inline. `None` when the trigger is ignored.
    pub async fn fire(&self, trigger: Trigger) -> Option<Result<ReconcileOutcome, SyncError>> {
        if !self.accepts(&trigger) {
            log::debug!("Ignoring trigger {trigger:?}");
            return None;
        }
        log_trigger(&trigger);
        Some(self.reconciler.reconcile().await)
    }

    /// Listen for lifecycle events and store changes until `lifecycle` closes.
    ///
    /// An initial pass runs straight away. When the lifecycle channel closes
    /// the listener stops and waits for in-flight passes before returning.
    pub fn spawn(
        self,
        mut lifecycle: mpsc::Receiver<Trigger>,
        mut changes: broadcast::Receiver<StoreChange>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut passes = JoinSet::new();
            let mut changes_open = true;

            self.dispatch(Trigger::WorkerStarted, &mut passes);

            loop {
                tokio::select! {
                    biased;

                    change = changes.recv(), if changes_open => match change {
                        Ok(change) => self.dispatch(Trigger::StoreChanged(change), &mut passes),
                        Err(RecvError::Lagged(missed)) => {
                            log::warn!("Missed {missed} store notifications, reloading rules.");
                            self.spawn_pass(&mut passes);
                        }
                        Err(RecvError::Closed) => changes_open = false,
                    },
                    event = lifecycle.recv() => match event {
                        Some(trigger) => self.dispatch(trigger, &mut passes),
                        None => break,
                    },
                    Some(joined) = passes.join_next(), if !passes.is_empty() => {
                        if let Err(e) = joined {
                            log::error!("Reconciliation task failed: {e}");
                        }
                    }
                }
            }

            while let Some(joined) = passes.join_next().await {
                if let Err(e) = joined {
                    log::error!("Reconciliation task failed: {e}");
                }
            }
        })
    }

    fn dispatch(&self, trigger: Trigger, passes: &mut JoinSet<()>) {
        if !self.accepts(&trigger) {
            log::debug!("Ignoring trigger {trigger:?}");
            return;
        }
        log_trigger(&trigger);
        self.spawn_pass(passes);
    }

    fn spawn_pass(&self, passes: &mut JoinSet<()>) {
        let reconciler = self.reconciler.clone();
        passes.spawn(async move {
            // outcome is logged and reflected on the badge by the reconciler
            let _ = reconciler.reconcile().await;
        });
    }
}

fn log_trigger(trigger: &Trigger) {
    match trigger {
        Trigger::Installed(reason) => {
            log::info!("Extension {}. Initializing rules.", reason.as_str())
        }
        Trigger::Startup => log::info!("Browser startup. Ensuring rules are up-to-date."),
        Trigger::WorkerStarted => {
            log::info!("Background worker started. Ensuring rules are up-to-date.")
        }
        Trigger::StoreChanged(_) => log::info!("Detected change in stored rules. Reloading rules."),
    }
}
