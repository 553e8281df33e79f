//! The durable game-memory record.
//!
//! `GameMemory` is the single cross-turn aggregate for a session: pointer
//! fields mirroring the latest scene, a bounded history log, cumulative
//! counters, and deduplicated discovery collections. It is created by the
//! reconciliation engine (loaded) or by the scene reducer (first turn of a
//! fresh session), mutated only by the reducer, and persisted after every
//! mutation by the store adapter.

use chrono::{DateTime, Utc};
use council::{
    Character, CurrentSceneContext, DialogueLine, GameState, InventoryChanges, Item, LoreEntry,
    SceneResponse, WorldInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum history-log sentences retained. Oldest entries drop first.
pub const HISTORY_CAP: usize = 20;

/// Snapshot of the most recent scene, kept inside the memory record so a
/// renderable scene can be rebuilt after a reload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentScene {
    #[serde(default)]
    pub narration_text: String,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub mood_atmosphere: String,
    #[serde(default)]
    pub relationship_changes: HashMap<String, i32>,
    #[serde(default)]
    pub new_secrets: Vec<String>,
    #[serde(default)]
    pub interactive_elements: Vec<council::InteractiveElement>,
    #[serde(default)]
    pub environmental_discoveries: Vec<council::EnvironmentalDiscovery>,
    #[serde(default)]
    pub threat_updates: Vec<council::ThreatUpdate>,
    #[serde(default)]
    pub ambient_events: Vec<council::AmbientEvent>,
    #[serde(default)]
    pub discovered_lore: Vec<LoreEntry>,
    #[serde(default)]
    pub world_info: WorldInfo,
    #[serde(default)]
    pub location_details: council::LocationDetails,
}

impl CurrentScene {
    /// Capture the scene-snapshot fields of a freshly accepted scene.
    pub fn from_scene(scene: &SceneResponse, fallback_world: &WorldInfo) -> Self {
        Self {
            narration_text: scene.narration_text.clone(),
            dialogue: scene.dialogue.clone(),
            characters: scene.characters.clone(),
            options: scene.options.clone(),
            mood_atmosphere: scene.mood_atmosphere.clone(),
            relationship_changes: scene.relationship_changes.clone(),
            new_secrets: scene.new_secrets.clone(),
            interactive_elements: scene.interactive_elements.clone(),
            environmental_discoveries: scene.environmental_discoveries.clone(),
            threat_updates: scene.threat_updates.clone(),
            ambient_events: scene.ambient_events.clone(),
            discovered_lore: scene.discovered_lore.clone(),
            world_info: scene
                .world_info
                .clone()
                .unwrap_or_else(|| fallback_world.clone()),
            location_details: scene.location_details.clone(),
        }
    }
}

/// The durable, cumulative game-state aggregate. One per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMemory {
    pub session_id: String,
    pub last_updated: DateTime<Utc>,

    // Pointer fields mirroring the latest scene.
    #[serde(default)]
    pub scene_tag: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub world: String,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default)]
    pub current_scene: CurrentScene,

    /// Ordered history-log sentences, most recent last, capped at
    /// [`HISTORY_CAP`].
    #[serde(default)]
    pub history: Vec<String>,

    // Cumulative counters.
    #[serde(default)]
    pub play_time_minutes: u32,
    #[serde(default)]
    pub scenes_completed: u32,

    // Cumulative derived collections. Deduplicated by name, id, or full
    // content respectively.
    #[serde(default)]
    pub discovered_locations: Vec<String>,
    #[serde(default)]
    pub met_characters: Vec<String>,
    #[serde(default)]
    pub lore_collection: Vec<LoreEntry>,

    #[serde(default)]
    pub unlocked_features: Vec<String>,
    #[serde(default)]
    pub major_story_beats: Vec<String>,
    #[serde(default)]
    pub active_side_quests: Vec<String>,
    #[serde(default)]
    pub player_choices_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub world_knowledge: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub faction_standings: HashMap<String, String>,
    #[serde(default)]
    pub discovered_secrets: Vec<String>,
    #[serde(default)]
    pub triggered_events: Vec<String>,
    #[serde(default)]
    pub player_preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub resume_context: HashMap<String, serde_json::Value>,

    /// World metadata. Survives scenes that omit it; last non-empty wins.
    #[serde(default)]
    pub world_info: WorldInfo,
}

impl GameMemory {
    /// Default record for a brand-new session. Zeroed counters, empty
    /// collections, world metadata seeded from the requested world name.
    pub fn new_session(session_id: impl Into<String>, world_name: &str, now: DateTime<Utc>) -> Self {
        let world_info = WorldInfo {
            name: world_name.to_string(),
            theme: "survival".to_string(),
            description: "A harsh world where survival is paramount.".to_string(),
            ..WorldInfo::default()
        };

        Self {
            session_id: session_id.into(),
            last_updated: now,
            scene_tag: "game_start".to_string(),
            location: String::new(),
            world: world_name.to_string(),
            inventory: Vec::new(),
            game_state: GameState::default(),
            current_scene: CurrentScene {
                world_info: world_info.clone(),
                mood_atmosphere: "neutral".to_string(),
                ..CurrentScene::default()
            },
            history: Vec::new(),
            play_time_minutes: 0,
            scenes_completed: 0,
            discovered_locations: Vec::new(),
            met_characters: Vec::new(),
            lore_collection: Vec::new(),
            unlocked_features: Vec::new(),
            major_story_beats: Vec::new(),
            active_side_quests: Vec::new(),
            player_choices_history: Vec::new(),
            world_knowledge: HashMap::new(),
            faction_standings: HashMap::new(),
            discovered_secrets: Vec::new(),
            triggered_events: Vec::new(),
            player_preferences: HashMap::new(),
            resume_context: HashMap::new(),
            world_info,
        }
    }

    /// Rebuild a renderable scene from the stored record.
    ///
    /// Used after a reload, when the session has a memory record but no live
    /// scene. The result carries the stored narration, options, and state so
    /// the presentation layer can pick up exactly where the player left off.
    pub fn resume_scene(&self) -> SceneResponse {
        SceneResponse {
            scene_tag: self.scene_tag.clone(),
            location: self.location.clone(),
            world: self.world.clone(),
            narration_text: if self.current_scene.narration_text.is_empty() {
                "You find yourself in a familiar place...".to_string()
            } else {
                self.current_scene.narration_text.clone()
            },
            dialogue: self.current_scene.dialogue.clone(),
            characters: self.current_scene.characters.clone(),
            options: self.current_scene.options.clone(),
            game_state: self.game_state.clone(),
            inventory_changes: InventoryChanges::default(),
            current_inventory: self.inventory.clone(),
            mood_atmosphere: if self.current_scene.mood_atmosphere.is_empty() {
                "neutral".to_string()
            } else {
                self.current_scene.mood_atmosphere.clone()
            },
            history_entry: self.history.last().cloned().unwrap_or_default(),
            relationship_changes: self.current_scene.relationship_changes.clone(),
            new_secrets: self.current_scene.new_secrets.clone(),
            new_objectives: self.game_state.active_objectives.clone(),
            completed_objectives_this_scene: self.game_state.completed_objectives.clone(),
            interactive_elements: self.current_scene.interactive_elements.clone(),
            environmental_discoveries: self.current_scene.environmental_discoveries.clone(),
            threat_updates: self.current_scene.threat_updates.clone(),
            ambient_events: self.current_scene.ambient_events.clone(),
            discovered_lore: self.current_scene.discovered_lore.clone(),
            world_info: Some(self.current_scene.world_info.clone()),
            location_details: self.current_scene.location_details.clone(),
        }
    }

    /// Project the stored scene into turn-request context.
    pub fn scene_context(&self) -> CurrentSceneContext {
        CurrentSceneContext {
            scene_tag: self.scene_tag.clone(),
            location: self.location.clone(),
            world: self.world.clone(),
            narration_text: self.current_scene.narration_text.clone(),
            dialogue: self.current_scene.dialogue.clone(),
            characters: self.current_scene.characters.clone(),
            narrative_options: self.current_scene.options.clone(),
            interactive_elements: self.current_scene.interactive_elements.clone(),
            environmental_discoveries: self.current_scene.environmental_discoveries.clone(),
            mood_atmosphere: self.current_scene.mood_atmosphere.clone(),
            threat_updates: self.current_scene.threat_updates.clone(),
            ambient_events: self.current_scene.ambient_events.clone(),
            relationship_changes: self.current_scene.relationship_changes.clone(),
            new_secrets: self.current_scene.new_secrets.clone(),
            new_objectives: self.game_state.active_objectives.clone(),
            completed_objectives_this_scene: self.game_state.completed_objectives.clone(),
            discovered_lore: self.current_scene.discovered_lore.clone(),
            world_info: self.current_scene.world_info.clone(),
            location_details: self.current_scene.location_details.clone(),
        }
    }
}
