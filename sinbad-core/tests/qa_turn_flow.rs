//! QA tests for the end-to-end turn flow.
//!
//! These tests drive the turn controller against scripted mock collaborators
//! and verify the memory record advances (or holds still) exactly as the
//! merge rules require.

use sinbad_core::testing::{assert_advanced, sample_scene, TestHarness};
use sinbad_core::{GameMemory, TurnOutcome, HISTORY_CAP};
use std::time::Duration;

fn memory_at(scenes: u32) -> GameMemory {
    let now = sinbad_core::testing::FixedClock::default_time();
    let mut memory = GameMemory::new_session("guest", "Sinbad", now);
    memory.scenes_completed = scenes;
    memory.scene_tag = "harbor".to_string();
    memory.location = "Basra Harbor".to_string();
    memory.current_scene.narration_text = "Gulls wheel over the masts.".to_string();
    memory.current_scene.options = vec!["Press on".to_string()];
    for i in 0..scenes {
        memory.history.push(format!("Entry {i}."));
    }
    memory
}

// =============================================================================
// Fresh sessions
// =============================================================================

#[tokio::test]
async fn test_fresh_session_first_turn_synthesizes_memory() {
    let harness = TestHarness::new();
    harness.expect_scene(sample_scene("opening", "Basra Harbor", "Sinbad"));

    let outcome = harness.submit("Start Game").await;
    let (scene, memory) = assert_advanced(outcome);

    assert_eq!(scene.scene_tag, "opening");
    assert_eq!(memory.scenes_completed, 1);
    assert_eq!(memory.history, vec!["Reached Basra Harbor.".to_string()]);
    assert_eq!(memory.discovered_locations, vec!["Basra Harbor".to_string()]);
}

#[tokio::test]
async fn test_fresh_session_has_no_scene_to_bootstrap() {
    let harness = TestHarness::new();
    assert!(harness.controller.bootstrap().await.is_none());
}

// =============================================================================
// Continuing sessions
// =============================================================================

#[tokio::test]
async fn test_turn_advances_existing_memory_by_one() {
    let harness = TestHarness::with_memory(memory_at(5));
    harness.expect_scene(sample_scene("souk", "Spice Souk", "Sinbad"));

    let outcome = harness.submit("Head for the souk").await;
    let (_, memory) = assert_advanced(outcome);

    assert_eq!(memory.scenes_completed, 6);
    assert_eq!(memory.history.last().unwrap(), "Reached Spice Souk.");
    assert_eq!(memory.history.len(), 6);
}

#[tokio::test]
async fn test_history_cap_drops_oldest_entries() {
    let harness = TestHarness::with_memory(memory_at(HISTORY_CAP as u32));
    harness.expect_scene(sample_scene("souk", "Spice Souk", "Sinbad"));

    let (_, memory) = assert_advanced(harness.submit("Onward").await);

    assert_eq!(memory.history.len(), HISTORY_CAP);
    assert_eq!(memory.history.last().unwrap(), "Reached Spice Souk.");
    // "Entry 0." fell off the front.
    assert_eq!(memory.history.first().unwrap(), "Entry 1.");
}

#[tokio::test]
async fn test_bootstrap_reconstructs_scene_from_memory() {
    let harness = TestHarness::with_memory(memory_at(5));

    let scene = harness
        .controller
        .bootstrap()
        .await
        .expect("stored memory should yield a scene");

    assert_eq!(scene.scene_tag, "harbor");
    assert_eq!(scene.narration_text, "Gulls wheel over the masts.");
    assert_eq!(scene.options, vec!["Press on".to_string()]);
    assert_eq!(harness.controller.progress().await.scenes_completed, 5);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_failed_turn_leaves_memory_untouched_and_retry_succeeds() {
    let harness = TestHarness::with_memory(memory_at(5));
    harness.expect_failure("socket closed");
    harness.expect_scene(sample_scene("souk", "Spice Souk", "Sinbad"));

    let before = harness.controller.memory().await.unwrap();

    let failed = harness.submit("Head for the souk").await;
    assert!(matches!(failed, TurnOutcome::Failed(_)));
    assert_eq!(harness.controller.memory().await.unwrap(), before);

    // Retry advances by exactly one relative to the pre-failure record.
    let (_, memory) = assert_advanced(harness.submit("Head for the souk").await);
    assert_eq!(memory.scenes_completed, before.scenes_completed + 1);
}

#[tokio::test]
async fn test_malformed_scene_is_rejected_without_partial_merge() {
    let harness = TestHarness::with_memory(memory_at(5));
    let mut broken = sample_scene("souk", "Spice Souk", "Sinbad");
    broken.world = String::new();
    harness.expect_scene(broken);

    let outcome = harness.submit("Head for the souk").await;
    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert_eq!(harness.controller.memory().await.unwrap().scenes_completed, 5);
}

// =============================================================================
// Single-in-flight invariant
// =============================================================================

#[tokio::test]
async fn test_concurrent_submission_is_rejected() {
    let harness = TestHarness::new();
    harness.service.set_delay(Duration::from_millis(100));
    harness.expect_scene(sample_scene("opening", "Basra Harbor", "Sinbad"));

    let (first, second) = tokio::join!(
        harness.submit("Start Game"),
        harness.submit("Start Game again"),
    );

    let advanced = usize::from(first.is_advanced()) + usize::from(second.is_advanced());
    let rejected = usize::from(matches!(first, TurnOutcome::Rejected))
        + usize::from(matches!(second, TurnOutcome::Rejected));
    assert_eq!(advanced, 1);
    assert_eq!(rejected, 1);

    // The losing submission never reached the backend.
    assert_eq!(harness.service.call_count(), 1);
}

// =============================================================================
// Persistence and new-game flow
// =============================================================================

#[tokio::test]
async fn test_committed_turn_is_persisted_everywhere() {
    let harness = TestHarness::new();
    harness.expect_scene(sample_scene("opening", "Basra Harbor", "Sinbad"));

    let (_, memory) = assert_advanced(harness.submit("Start Game").await);

    assert_eq!(harness.store.local().read().await, Some(memory.clone()));
    assert_eq!(harness.store.context().loaded().await, Some(memory.clone()));

    // Remote save is fire-and-forget; give the spawned task a moment.
    for _ in 0..50 {
        if harness.remote.save_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(harness.remote.stored("guest").await, Some(memory));
}

#[tokio::test]
async fn test_start_new_game_discards_prior_memory() {
    let harness = TestHarness::with_memory(memory_at(5));
    harness.remote.seed(memory_at(5)).await;
    harness.store.local().write(&memory_at(5)).await.unwrap();
    harness.expect_scene(sample_scene("opening", "Basra Harbor", "Sinbad"));

    let outcome = harness.controller.start_new_game(Some("Sinbad".into())).await;
    let (_, memory) = assert_advanced(outcome);

    // Counters restart; the opening turn is scene one.
    assert_eq!(memory.scenes_completed, 1);

    // The opening choice names the requested world.
    let input = harness.service.last_input().unwrap();
    assert_eq!(input.player_choice, "Start Game in Sinbad");
    assert_eq!(input.current_world, "Sinbad");
}

#[tokio::test]
async fn test_play_time_accumulates_between_turns() {
    let harness = TestHarness::new();
    harness.expect_scene(sample_scene("opening", "Basra Harbor", "Sinbad"));
    harness.expect_scene(sample_scene("souk", "Spice Souk", "Sinbad"));

    let (_, first) = assert_advanced(harness.submit("Start Game").await);
    assert_eq!(first.play_time_minutes, 0);

    harness.clock.advance_minutes(7);
    let (_, second) = assert_advanced(harness.submit("Head for the souk").await);
    assert_eq!(second.play_time_minutes, 7);
}

// =============================================================================
// Request construction
// =============================================================================

#[tokio::test]
async fn test_request_snapshots_current_memory() {
    let harness = TestHarness::with_memory(memory_at(5));
    harness.expect_scene(sample_scene("souk", "Spice Souk", "Sinbad"));

    assert_advanced(harness.submit("Head for the souk").await);

    let input = harness.service.last_input().unwrap();
    assert_eq!(input.session_id, "guest");
    assert_eq!(input.scenes_completed, 6);
    assert_eq!(input.current_location, "Basra Harbor");
    assert_eq!(input.scene_tag.as_deref(), Some("harbor"));
    assert_eq!(input.recent_history.len(), 5);
    assert_eq!(input.user_interaction.choice_text, "Head for the souk");
    assert!(!input.user_interaction.interaction_context.timestamp.is_empty());
}
