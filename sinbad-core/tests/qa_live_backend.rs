//! QA tests against a live Shadow Council backend.
//!
//! These tests exercise the real HTTP client end to end.
//! Run with: `COUNCIL_API_URL=<url> cargo test -p sinbad-core --test qa_live_backend -- --ignored --nocapture`

use council::Council;
use sinbad_core::{
    LocalCache, MemoryStore, ReconciliationEngine, SharedContext, SystemClock, TurnController,
    TurnOutcome,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if a backend URL is configured
fn has_backend() -> bool {
    std::env::var("COUNCIL_API_URL").is_ok()
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    setup();
    if !has_backend() {
        eprintln!("Skipping test: COUNCIL_API_URL not set");
        return;
    }

    let client = Council::from_env().expect("client should build");
    client.health().await.expect("backend should be healthy");
}

#[tokio::test]
#[ignore]
async fn test_opening_turn_round_trip() {
    setup();
    if !has_backend() {
        eprintln!("Skipping test: COUNCIL_API_URL not set");
        return;
    }

    let temp_dir = TempDir::new().expect("temp dir");
    let client = Arc::new(Council::from_env().expect("client should build"));
    let store = MemoryStore::new(
        LocalCache::new(temp_dir.path().join("loaded_memory.json")),
        SharedContext::new(),
        client.clone(),
    );

    let session_id = sinbad_core::guest_session_id();
    let mut engine = ReconciliationEngine::from_store(&store);
    let resolved = engine.resolve(&session_id).await;
    assert!(resolved.is_none(), "fresh guest session should have no memory");

    let controller = TurnController::new(
        session_id.clone(),
        resolved,
        client.clone(),
        store,
        Arc::new(SystemClock),
    );

    match controller.start_new_game(Some("Sinbad".into())).await {
        TurnOutcome::Advanced { scene, memory } => {
            println!("Opening narration:\n{}", scene.narration_text);
            assert!(!scene.scene_tag.is_empty());
            assert!(!scene.options.is_empty());
            assert_eq!(memory.scenes_completed, 1);
        }
        other => panic!("Opening turn did not advance: {other:?}"),
    }

    // Clean up the server-side session we created.
    let _ = client.clear_memory(&session_id).await;
}
