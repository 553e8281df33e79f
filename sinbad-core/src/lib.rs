//! Session-memory reconciliation core for the Sinbad narrative game client.
//!
//! This crate provides:
//! - The durable cross-turn memory record and its merge rules
//! - Startup reconciliation across local cache, shared context, and remote store
//! - A pure scene reducer folding each turn's output into the record
//! - A turn controller orchestrating one backend call per player choice
//!
//! # Quick Start
//!
//! ```ignore
//! use sinbad_core::{
//!     LocalCache, MemoryStore, PlayerChoice, ReconciliationEngine, SharedContext,
//!     SystemClock, TurnController,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(council::Council::from_env()?);
//!     let store = MemoryStore::new(
//!         LocalCache::new("loaded_memory.json"),
//!         SharedContext::new(),
//!         service.clone(),
//!     );
//!
//!     let mut engine = ReconciliationEngine::from_store(&store);
//!     let resolved = engine.resolve("guest").await;
//!
//!     let controller =
//!         TurnController::new("guest", resolved, service, store, Arc::new(SystemClock));
//!
//!     let scene = match controller.bootstrap().await {
//!         Some(scene) => scene,
//!         None => match controller.start_new_game(Some("Sinbad".into())).await {
//!             sinbad_core::TurnOutcome::Advanced { scene, .. } => scene,
//!             other => panic!("opening turn failed: {other:?}"),
//!         },
//!     };
//!     println!("{}", scene.narration_text);
//!
//!     controller
//!         .submit_choice(PlayerChoice::narrative("Press on"))
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod reconcile;
pub mod reducer;
pub mod store;
pub mod testing;
pub mod turn;

// Primary public API
pub use memory::{CurrentScene, GameMemory, HISTORY_CAP};
pub use reconcile::{EngineState, ReconciliationEngine};
pub use reducer::{reduce, TurnContext};
pub use store::{LocalCache, MemoryStore, RemoteMemoryStore, SharedContext, StoreError};
pub use turn::{
    guest_session_id, Clock, PlayerChoice, SystemClock, TurnController, TurnError, TurnOutcome,
    TurnService,
};

// Wire vocabulary used throughout the public API.
pub use council::{AgentInput, GameProgress, InteractionType, SceneResponse};
