//! Startup reconciliation of the memory record.
//!
//! After a reload or a cold start, three sources may each hold a copy of the
//! session's memory: the local cache, the shared context, and the remote
//! service. The engine checks them in strict priority order, short-circuits
//! at the first hit, and back-fills any higher-priority source that was
//! empty so later reads are fast and consistent. All three missing is a
//! fresh session, not an error. Resolution runs once per session lifetime;
//! re-resolving after a result would risk clobbering live gameplay with a
//! stale copy.

use crate::memory::GameMemory;
use crate::store::{LocalCache, MemoryStore, RemoteMemoryStore, SharedContext};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where reconciliation currently stands.
#[derive(Debug, Clone)]
pub enum EngineState {
    /// Resolution has not been requested yet.
    Uninitialized,
    /// Sources are being checked.
    Resolving,
    /// Resolution finished. `None` means no source held a record: the
    /// session is brand new and the caller should start a new game.
    Resolved(Option<GameMemory>),
}

impl EngineState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, EngineState::Resolved(_))
    }
}

/// Resolves which copy of the memory record is authoritative.
pub struct ReconciliationEngine {
    local: LocalCache,
    context: SharedContext,
    remote: Arc<dyn RemoteMemoryStore>,
    state: EngineState,
}

impl ReconciliationEngine {
    pub fn new(
        local: LocalCache,
        context: SharedContext,
        remote: Arc<dyn RemoteMemoryStore>,
    ) -> Self {
        Self {
            local,
            context,
            remote,
            state: EngineState::Uninitialized,
        }
    }

    /// Build an engine over the same sources a [`MemoryStore`] writes to.
    pub fn from_store(store: &MemoryStore) -> Self {
        Self::new(
            store.local().clone(),
            store.context().clone(),
            store.remote(),
        )
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Resolve the authoritative record for `session_id`.
    ///
    /// Priority: local cache, then shared context, then the remote service.
    /// A remote fault is logged and treated as a miss; a cold start must
    /// never hard-fail the game. Idempotent: once resolved, later calls
    /// return the original outcome without touching any source.
    pub async fn resolve(&mut self, session_id: &str) -> Option<GameMemory> {
        if let EngineState::Resolved(record) = &self.state {
            debug!(session_id, "Reconciliation already resolved");
            return record.clone();
        }

        self.state = EngineState::Resolving;

        // Priority 1: local cache, covering reload-within-tab.
        if let Some(record) = self.local.read().await {
            info!(session_id, scenes = record.scenes_completed, "Loaded memory from local cache");
            self.context.set_loaded(record.clone()).await;
            self.state = EngineState::Resolved(Some(record.clone()));
            return Some(record);
        }

        // Priority 2: shared context, covering in-app navigation.
        if let Some(record) = self.context.loaded().await {
            info!(session_id, scenes = record.scenes_completed, "Loaded memory from shared context");
            if let Err(e) = self.local.write(&record).await {
                warn!(session_id, error = %e, "Failed to back-fill local cache");
            }
            self.state = EngineState::Resolved(Some(record.clone()));
            return Some(record);
        }

        // Priority 3: remote service, covering a true cold start. Queried
        // once; any fault is a miss.
        match self.remote.load(session_id).await {
            Ok(Some(record)) => {
                info!(session_id, scenes = record.scenes_completed, "Loaded memory from remote service");
                if let Err(e) = self.local.write(&record).await {
                    warn!(session_id, error = %e, "Failed to back-fill local cache");
                }
                self.context.set_loaded(record.clone()).await;
                self.state = EngineState::Resolved(Some(record.clone()));
                Some(record)
            }
            Ok(None) => {
                info!(session_id, "No saved memory anywhere; fresh session");
                self.state = EngineState::Resolved(None);
                None
            }
            Err(e) => {
                warn!(session_id, error = %e, "Remote memory load failed; treating as fresh session");
                self.state = EngineState::Resolved(None);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRemoteStore;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn memory_with(scenes: u32) -> GameMemory {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut memory = GameMemory::new_session("guest", "Sinbad", now);
        memory.scenes_completed = scenes;
        memory
    }

    fn engine_over(
        dir: &TempDir,
        remote: Arc<MockRemoteStore>,
    ) -> (ReconciliationEngine, LocalCache, SharedContext) {
        let local = LocalCache::new(dir.path().join("memory.json"));
        let context = SharedContext::new();
        let engine = ReconciliationEngine::new(local.clone(), context.clone(), remote);
        (engine, local, context)
    }

    #[tokio::test]
    async fn test_local_cache_wins_over_remote() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new());
        remote.seed(memory_with(9)).await;

        let (mut engine, local, _context) = engine_over(&dir, remote);
        local.write(&memory_with(3)).await.unwrap();

        let resolved = engine.resolve("guest").await.expect("should resolve");
        assert_eq!(resolved.scenes_completed, 3);
    }

    #[tokio::test]
    async fn test_context_hit_back_fills_local() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new());
        let (mut engine, local, context) = engine_over(&dir, remote);

        context.set_loaded(memory_with(5)).await;

        let resolved = engine.resolve("guest").await.expect("should resolve");
        assert_eq!(resolved.scenes_completed, 5);
        assert_eq!(local.read().await.map(|m| m.scenes_completed), Some(5));
    }

    #[tokio::test]
    async fn test_remote_hit_back_fills_local_and_context() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new());
        remote.seed(memory_with(7)).await;

        let (mut engine, local, context) = engine_over(&dir, remote);

        let resolved = engine.resolve("guest").await.expect("should resolve");
        assert_eq!(resolved.scenes_completed, 7);
        assert_eq!(local.read().await.map(|m| m.scenes_completed), Some(7));
        assert_eq!(context.loaded().await.map(|m| m.scenes_completed), Some(7));
    }

    #[tokio::test]
    async fn test_empty_environment_resolves_absent() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new());
        let (mut engine, _local, _context) = engine_over(&dir, remote);

        assert!(engine.resolve("guest").await.is_none());
        assert!(engine.state().is_resolved());
    }

    #[tokio::test]
    async fn test_remote_fault_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new().failing());
        let (mut engine, _local, _context) = engine_over(&dir, remote);

        assert!(engine.resolve("guest").await.is_none());
        assert!(engine.state().is_resolved());
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        tokio::fs::write(&path, "{definitely not json").await.unwrap();

        let remote = Arc::new(MockRemoteStore::new());
        remote.seed(memory_with(4)).await;

        let local = LocalCache::new(&path);
        let context = SharedContext::new();
        let mut engine = ReconciliationEngine::new(local, context, remote);

        let resolved = engine.resolve("guest").await.expect("should fall through");
        assert_eq!(resolved.scenes_completed, 4);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MockRemoteStore::new());
        let (mut engine, local, _context) = engine_over(&dir, remote);

        assert!(engine.resolve("guest").await.is_none());

        // A record appearing later must not change the outcome; re-resolving
        // mid-session would clobber live gameplay.
        local.write(&memory_with(2)).await.unwrap();
        assert!(engine.resolve("guest").await.is_none());
    }
}
