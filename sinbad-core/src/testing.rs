//! Testing utilities for the reconciliation core.
//!
//! This module provides tools for deterministic integration testing:
//! - `MockTurnService` for scripted scenes without a live backend
//! - `MockRemoteStore` for an in-memory remote persistence service
//! - `FixedClock` for reproducible timestamps
//! - `TestHarness` for end-to-end turn scenarios

use crate::memory::GameMemory;
use crate::store::{LocalCache, MemoryStore, RemoteMemoryStore, SharedContext};
use crate::turn::{Clock, PlayerChoice, TurnController, TurnOutcome, TurnService};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use council::{AgentInput, SceneResponse};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A clock that only moves when told to.
pub struct FixedClock {
    now: StdMutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Noon on a fixed date, for tests that do not care about the value.
    pub fn default_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::minutes(minutes);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Self::default_time())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Build a minimal but valid scene for scripting.
pub fn sample_scene(tag: &str, location: &str, world: &str) -> SceneResponse {
    SceneResponse {
        scene_tag: tag.to_string(),
        location: location.to_string(),
        world: world.to_string(),
        narration_text: format!("You stand in {location}."),
        options: vec!["Press on".to_string(), "Wait and watch".to_string()],
        mood_atmosphere: "tense".to_string(),
        history_entry: format!("Reached {location}."),
        ..SceneResponse::default()
    }
}

/// A scripted turn service.
///
/// Responses are returned in queue order; failures can be interleaved to
/// exercise error paths. Once the script runs dry a benign fallback scene is
/// returned.
pub struct MockTurnService {
    script: StdMutex<VecDeque<Result<SceneResponse, council::Error>>>,
    calls: AtomicUsize,
    delay: StdMutex<Option<Duration>>,
    last_input: StdMutex<Option<AgentInput>>,
}

impl MockTurnService {
    pub fn new() -> Self {
        Self {
            script: StdMutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: StdMutex::new(None),
            last_input: StdMutex::new(None),
        }
    }

    /// Queue a scene to return on the next call.
    pub fn queue_scene(&self, scene: SceneResponse) {
        self.script.lock().unwrap().push_back(Ok(scene));
    }

    /// Queue a simulated transport failure.
    pub fn queue_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(council::Error::Network(message.into())));
    }

    /// Make every call pause first, to hold a turn in flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// How many times the service has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, for asserting on what the controller sent.
    pub fn last_input(&self) -> Option<AgentInput> {
        self.last_input.lock().unwrap().clone()
    }
}

impl Default for MockTurnService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnService for MockTurnService {
    async fn interact(&self, input: &AgentInput) -> Result<SceneResponse, council::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => Ok(sample_scene(
                "unscripted",
                "an unremarkable room",
                &input.current_world,
            )),
        }
    }
}

/// An in-memory remote persistence service.
pub struct MockRemoteStore {
    records: Mutex<HashMap<String, GameMemory>>,
    fail: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    /// Make every operation fail with a simulated network error.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Place a record in the store ahead of a test.
    pub async fn seed(&self, record: GameMemory) {
        self.records
            .lock()
            .await
            .insert(record.session_id.clone(), record);
    }

    /// The record currently stored for a session, if any.
    pub async fn stored(&self, session_id: &str) -> Option<GameMemory> {
        self.records.lock().await.get(session_id).cloned()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for MockRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteMemoryStore for MockRemoteStore {
    async fn load(&self, session_id: &str) -> Result<Option<GameMemory>, council::Error> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(council::Error::Network("simulated remote failure".to_string()));
        }
        Ok(self.records.lock().await.get(session_id).cloned())
    }

    async fn save(&self, record: &GameMemory) -> Result<(), council::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(council::Error::Network("simulated remote failure".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), council::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(council::Error::Network("simulated remote failure".to_string()));
        }
        self.records.lock().await.remove(session_id);
        Ok(())
    }
}

/// Harness wiring a controller to mock collaborators for scenario tests.
pub struct TestHarness {
    pub controller: TurnController,
    pub service: Arc<MockTurnService>,
    pub remote: Arc<MockRemoteStore>,
    pub clock: Arc<FixedClock>,
    pub store: MemoryStore,
    cache_path: PathBuf,
}

impl TestHarness {
    /// Harness for a fresh session with no prior memory anywhere.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Harness for a session resuming from an existing record.
    pub fn with_memory(memory: GameMemory) -> Self {
        Self::build(Some(memory))
    }

    fn build(resolved: Option<GameMemory>) -> Self {
        let cache_path =
            std::env::temp_dir().join(format!("sinbad-harness-{}.json", Uuid::new_v4()));
        let service = Arc::new(MockTurnService::new());
        let remote = Arc::new(MockRemoteStore::new());
        let clock = Arc::new(FixedClock::default());
        let store = MemoryStore::new(
            LocalCache::new(&cache_path),
            SharedContext::new(),
            remote.clone(),
        );
        let controller = TurnController::new(
            "guest",
            resolved,
            service.clone(),
            store.clone(),
            clock.clone(),
        );

        Self {
            controller,
            service,
            remote,
            clock,
            store,
            cache_path,
        }
    }

    /// Queue a scene whose narration is the given text.
    pub fn expect_narrative(&self, tag: &str, text: impl Into<String>) -> &Self {
        let mut scene = sample_scene(tag, "somewhere", "Sinbad");
        scene.narration_text = text.into();
        self.service.queue_scene(scene);
        self
    }

    /// Queue a fully specified scene.
    pub fn expect_scene(&self, scene: SceneResponse) -> &Self {
        self.service.queue_scene(scene);
        self
    }

    /// Queue a simulated service failure.
    pub fn expect_failure(&self, message: &str) -> &Self {
        self.service.queue_failure(message);
        self
    }

    /// Submit a plain narrative choice.
    pub async fn submit(&self, text: &str) -> TurnOutcome {
        self.controller
            .submit_choice(PlayerChoice::narrative(text))
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.cache_path);
    }
}

/// Unwrap an advanced outcome or fail the test with a readable message.
#[track_caller]
pub fn assert_advanced(outcome: TurnOutcome) -> (SceneResponse, GameMemory) {
    match outcome {
        TurnOutcome::Advanced { scene, memory } => (scene, memory),
        other => panic!("Expected the turn to advance, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_service_returns_script_in_order() {
        let service = MockTurnService::new();
        service.queue_scene(sample_scene("one", "A", "W"));
        service.queue_scene(sample_scene("two", "B", "W"));

        let input = AgentInput::default();
        let first = service.interact(&input).await.unwrap();
        let second = service.interact(&input).await.unwrap();
        let fallback = service.interact(&input).await.unwrap();

        assert_eq!(first.scene_tag, "one");
        assert_eq!(second.scene_tag, "two");
        assert_eq!(fallback.scene_tag, "unscripted");
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_service_failure() {
        let service = MockTurnService::new();
        service.queue_failure("wire cut");

        let result = service.interact(&AgentInput::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_remote_store_round_trip() {
        let store = MockRemoteStore::new();
        let memory = GameMemory::new_session("guest", "Sinbad", FixedClock::default_time());

        store.save(&memory).await.unwrap();
        assert_eq!(store.load("guest").await.unwrap(), Some(memory));

        store.clear("guest").await.unwrap();
        assert_eq!(store.load("guest").await.unwrap(), None);
    }

    #[test]
    fn test_fixed_clock_advances_only_when_told() {
        let clock = FixedClock::default();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance_minutes(5);
        assert_eq!(clock.now() - start, ChronoDuration::minutes(5));
    }
}
