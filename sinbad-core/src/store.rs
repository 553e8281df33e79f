//! Memory persistence adapters.
//!
//! Three sources hold a copy of the memory record: a single-slot local cache
//! file, the in-process shared context, and the remote service. The adapters
//! here move records in and out of those sources without any merge logic.
//! Deciding which copy wins belongs to the reconciliation engine; deciding
//! when to write belongs to the turn controller.

use crate::memory::GameMemory;
use async_trait::async_trait;
use council::{Council, MemoryLoad};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Errors from local cache operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single-slot persistent cache holding the serialized memory record.
///
/// A corrupt slot is treated as absent and purged on read, so a bad write or
/// a truncated file can never wedge the game.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the cached record, if a parseable one exists.
    pub async fn read(&self) -> Option<GameMemory> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read local cache");
                return None;
            }
        };

        match serde_json::from_str::<CacheSlot>(&content) {
            Ok(slot) => Some(slot.memory),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Purging corrupt local cache entry");
                if let Err(e) = fs::remove_file(&self.path).await {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(path = %self.path.display(), error = %e, "Failed to purge corrupt cache");
                    }
                }
                None
            }
        }
    }

    /// Overwrite the slot with the given record.
    pub async fn write(&self, record: &GameMemory) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let slot = CacheSlot {
            memory: record.clone(),
        };
        let content = serde_json::to_string_pretty(&slot)?;
        fs::write(&self.path, content).await?;
        debug!(path = %self.path.display(), session_id = %record.session_id, "Wrote local cache");
        Ok(())
    }

    /// Remove the slot. Missing slots are fine.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// On-disk shape of the cache slot.
#[derive(Debug, Serialize, Deserialize)]
struct CacheSlot {
    memory: GameMemory,
}

/// In-process handoff slot carrying a loaded record or a requested world
/// name between navigation points.
///
/// Always holds copies. It is injected into the reconciliation engine and
/// turn controller at construction rather than living as a global, and its
/// lifetime is scoped to the active navigation session.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    inner: Arc<Mutex<Handoff>>,
}

#[derive(Debug, Default)]
struct Handoff {
    loaded: Option<GameMemory>,
    world_name: Option<String>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record most recently handed off, if any.
    pub async fn loaded(&self) -> Option<GameMemory> {
        self.inner.lock().await.loaded.clone()
    }

    /// Hand off a record that has just become authoritative.
    pub async fn set_loaded(&self, record: GameMemory) {
        self.inner.lock().await.loaded = Some(record);
    }

    /// World requested for a brand-new game, if any.
    pub async fn world_name(&self) -> Option<String> {
        self.inner.lock().await.world_name.clone()
    }

    pub async fn set_world_name(&self, world: impl Into<String>) {
        self.inner.lock().await.world_name = Some(world.into());
    }

    /// Drop any handed-off record, keeping the requested world name.
    pub async fn clear_loaded(&self) {
        self.inner.lock().await.loaded = None;
    }

    /// Reset the slot entirely.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.loaded = None;
        inner.world_name = None;
    }
}

/// Remote persistence for memory records.
///
/// Implementations copy records in and out; they never merge. Transport
/// faults are reported as errors and the caller decides whether they matter.
#[async_trait]
pub trait RemoteMemoryStore: Send + Sync {
    /// Fetch the most recent record for a session, if one exists.
    async fn load(&self, session_id: &str) -> Result<Option<GameMemory>, council::Error>;

    /// Store a full record snapshot. Best-effort.
    async fn save(&self, record: &GameMemory) -> Result<(), council::Error>;

    /// Delete all stored memory for a session.
    async fn clear(&self, session_id: &str) -> Result<(), council::Error>;
}

#[async_trait]
impl RemoteMemoryStore for Council {
    async fn load(&self, session_id: &str) -> Result<Option<GameMemory>, council::Error> {
        match self.init_load(session_id).await? {
            MemoryLoad::Loaded(value) => match serde_json::from_value::<GameMemory>(value) {
                Ok(memory) => Ok(Some(memory)),
                Err(e) => {
                    // An unparseable remote payload is a miss, not a fault.
                    warn!(session_id, error = %e, "Remote memory payload did not parse");
                    Ok(None)
                }
            },
            MemoryLoad::NotFound => Ok(None),
        }
    }

    async fn save(&self, record: &GameMemory) -> Result<(), council::Error> {
        let value = serde_json::to_value(record)
            .map_err(|e| council::Error::Config(format!("Unserializable record: {e}")))?;
        self.save_memory(&record.session_id, &value).await
    }

    async fn clear(&self, session_id: &str) -> Result<(), council::Error> {
        self.clear_memory(session_id).await
    }
}

/// Bundles the three persistence sources behind one write path.
#[derive(Clone)]
pub struct MemoryStore {
    local: LocalCache,
    context: SharedContext,
    remote: Arc<dyn RemoteMemoryStore>,
}

impl MemoryStore {
    pub fn new(local: LocalCache, context: SharedContext, remote: Arc<dyn RemoteMemoryStore>) -> Self {
        Self {
            local,
            context,
            remote,
        }
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn remote(&self) -> Arc<dyn RemoteMemoryStore> {
        Arc::clone(&self.remote)
    }

    /// Persist a freshly reduced record everywhere.
    ///
    /// The local cache and shared context are updated before returning. The
    /// remote save is spawned and forgotten; a failure there is logged and
    /// never blocks gameplay. Each spawned write carries a full snapshot, so
    /// a late completion can only land an equally-recent record.
    pub async fn persist(&self, record: &GameMemory) {
        if let Err(e) = self.local.write(record).await {
            error!(session_id = %record.session_id, error = %e, "Failed to write local cache");
        }
        self.context.set_loaded(record.clone()).await;

        let remote = Arc::clone(&self.remote);
        let snapshot = record.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.save(&snapshot).await {
                warn!(session_id = %snapshot.session_id, error = %e, "Remote memory save failed");
            }
        });
    }

    /// Discard all stored copies for a session. Used when the player starts
    /// a new game.
    pub async fn discard(&self, session_id: &str) {
        if let Err(e) = self.local.clear().await {
            warn!(error = %e, "Failed to clear local cache");
        }
        self.context.clear_loaded().await;
        if let Err(e) = self.remote.clear(session_id).await {
            warn!(session_id, error = %e, "Remote memory clear failed");
        }
    }
}
