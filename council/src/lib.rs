//! Minimal Shadow Council narrative API client.
//!
//! This crate provides a focused client for the Shadow Council game service:
//! - The `/game/interact` turn endpoint with fully typed requests and responses
//! - Session initialization (load a saved game or start a new one)
//! - Best-effort remote memory save/clear
//!
//! The client performs no game logic. It sends a structured [`AgentInput`],
//! receives a structured [`SceneResponse`], and reports transport or protocol
//! failures through [`Error`]. Deciding what to do with a scene (or with a
//! failure) belongs to the caller.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Errors that can occur when talking to the Shadow Council service.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Service URL not configured")]
    NoBaseUrl,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Shadow Council API client.
#[derive(Clone)]
pub struct Council {
    client: reqwest::Client,
    base_url: String,
}

impl Council {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the `COUNCIL_API_URL` environment variable,
    /// falling back to the local development server.
    pub fn from_env() -> Result<Self, Error> {
        let base = std::env::var("COUNCIL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if base.trim().is_empty() {
            return Err(Error::NoBaseUrl);
        }
        Ok(Self::new(base))
    }

    /// Submit one player turn and receive the next scene.
    pub async fn interact(&self, input: &AgentInput) -> Result<SceneResponse, Error> {
        debug!(session_id = %input.session_id, choice = %input.player_choice, "Sending interact request");

        let response = self
            .client
            .post(format!("{}/game/interact", self.base_url))
            .headers(self.build_headers()?)
            .json(input)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<SceneResponse>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Ask the service for the most recent saved memory for a session.
    ///
    /// The payload is returned as raw JSON. The caller decides whether the
    /// payload still parses into a usable record.
    pub async fn init_load(&self, session_id: &str) -> Result<MemoryLoad, Error> {
        let body = InitRequest {
            session_id: session_id.to_string(),
            action: "load".to_string(),
            world: None,
        };

        let response = self
            .client
            .post(format!("{}/game/init", self.base_url))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let init: InitResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        match (init.status.as_str(), init.latest_memory_data) {
            ("loaded", Some(data)) => Ok(MemoryLoad::Loaded(data)),
            _ => Ok(MemoryLoad::NotFound),
        }
    }

    /// Start a new game server-side, clearing any prior memory for the session.
    pub async fn init_new(&self, session_id: &str, world: &str) -> Result<(), Error> {
        let body = InitRequest {
            session_id: session_id.to_string(),
            action: "new".to_string(),
            world: Some(world.to_string()),
        };

        let response = self
            .client
            .post(format!("{}/game/init", self.base_url))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Save a memory snapshot for a session. Best-effort from the caller's
    /// perspective; the payload is opaque to this client.
    pub async fn save_memory(
        &self,
        session_id: &str,
        record: &serde_json::Value,
    ) -> Result<(), Error> {
        let response = self
            .client
            .post(format!("{}/game/memory/{session_id}", self.base_url))
            .headers(self.build_headers()?)
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Delete all stored memory for a session.
    pub async fn clear_memory(&self, session_id: &str) -> Result<(), Error> {
        let response = self
            .client
            .delete(format!("{}/game/memory/{session_id}", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Health check against the service root.
    pub async fn health(&self) -> Result<(), Error> {
        let response = self
            .client
            .get(format!("{}/game/health", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::check_status(response).await.map(|_| ())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(Error::Api { status, message })
    }
}

/// Result of asking the service for saved memory.
#[derive(Debug, Clone)]
pub enum MemoryLoad {
    /// The service holds a memory snapshot; the payload is the latest one.
    Loaded(serde_json::Value),
    /// No saved memory exists for this session.
    NotFound,
}

#[derive(Debug, Serialize)]
struct InitRequest {
    session_id: String,
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    world: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    latest_memory_data: Option<serde_json::Value>,
}

// ============================================================================
// Wire vocabulary
// ============================================================================

/// An item carried by the player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
    /// Condition from 0 (broken) to 100 (pristine).
    #[serde(default)]
    pub durability: u8,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Items gained, lost, or altered during one scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryChanges {
    #[serde(default)]
    pub added_items: Vec<Item>,
    #[serde(default)]
    pub removed_items: Vec<Item>,
    #[serde(default)]
    pub modified_items: Vec<Item>,
}

/// One line of spoken or internal dialogue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub is_internal_thought: bool,
    #[serde(default)]
    pub audible_to: Vec<String>,
}

/// A character present in a scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub interactable: bool,
    /// Disposition toward the player, -10 to 10.
    #[serde(default)]
    pub relationship_level: i32,
    #[serde(default)]
    pub current_mood: String,
    /// Trust in the player, -10 to 10.
    #[serde(default)]
    pub trust_level: i32,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub personal_objectives: Vec<String>,
    #[serde(default)]
    pub knowledge_flags: HashMap<String, bool>,
    #[serde(default)]
    pub backstory: Option<String>,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub equipment: Option<Vec<String>>,
}

/// An objective the player can pursue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestObjective {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub quest_type: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub involves_npcs: Vec<String>,
    /// Completion from 0 to 100.
    #[serde(default)]
    pub progress: u8,
    /// Urgency from 1 to 10.
    #[serde(default)]
    pub escalation_level: u8,
    #[serde(default)]
    pub rewards: Option<Vec<String>>,
    #[serde(default)]
    pub time_limit: Option<String>,
}

/// Weather and hazard state for the current location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalConditions {
    pub weather: String,
    pub visibility: String,
    pub temperature: String,
    /// Danger from 0 (safe) to 10 (lethal).
    #[serde(default)]
    pub hazard_level: u8,
}

impl Default for EnvironmentalConditions {
    fn default() -> Self {
        Self {
            weather: "clear".to_string(),
            visibility: "normal".to_string(),
            temperature: "comfortable".to_string(),
            hazard_level: 0,
        }
    }
}

/// Coarse availability of survival resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    pub food: String,
    pub water: String,
    pub medical_supplies: String,
    pub shelter_materials: String,
    pub fuel: String,
    pub tools: String,
}

impl Default for ResourceAvailability {
    fn default() -> Self {
        Self {
            food: "moderate".to_string(),
            water: "moderate".to_string(),
            medical_supplies: "scarce".to_string(),
            shelter_materials: "moderate".to_string(),
            fuel: "scarce".to_string(),
            tools: "moderate".to_string(),
        }
    }
}

/// The full mutable game-state snapshot carried by every scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub relationships: HashMap<String, i32>,
    #[serde(default)]
    pub revealed_secrets: Vec<String>,
    #[serde(default)]
    pub completed_objectives: Vec<String>,
    #[serde(default)]
    pub failed_objectives: Vec<String>,
    #[serde(default)]
    pub active_objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub location_flags: HashMap<String, bool>,
    /// Free-form flags the narrative engine threads between turns.
    #[serde(default)]
    pub story_flags: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub reputation: HashMap<String, String>,
    #[serde(default)]
    pub major_events: Vec<String>,
    #[serde(default)]
    pub environmental_conditions: EnvironmentalConditions,
    #[serde(default)]
    pub resource_availability: ResourceAvailability,
}

/// Something in the scene the player can act on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interaction_types: Vec<String>,
    #[serde(default)]
    pub requires_items: Vec<String>,
    #[serde(default)]
    pub unlocks_options: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub potential_outcomes: HashMap<String, String>,
    #[serde(default)]
    pub side_quest_trigger: Option<serde_json::Value>,
}

/// A point of interest surfaced by exploring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentalDiscovery {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub unlocks_content: Vec<String>,
}

/// A change in an active threat.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThreatUpdate {
    pub threat_id: String,
    pub threat_name: String,
    /// Severity from 1 to 10.
    #[serde(default)]
    pub escalation_level: u8,
    #[serde(default)]
    pub immediate_danger: bool,
    #[serde(default)]
    pub resolution_methods: Vec<String>,
    #[serde(default)]
    pub affects_npcs: Vec<String>,
}

/// Background flavor happening around the player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AmbientEvent {
    pub event_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affects_mood: bool,
    #[serde(default)]
    pub creates_opportunities: Vec<String>,
}

/// Category of a lore entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoreCategory {
    #[default]
    History,
    Character,
    Location,
    Faction,
    Event,
    Artifact,
}

/// A piece of world lore revealed to the player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoreEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: LoreCategory,
    #[serde(default)]
    pub discovered_at: String,
    #[serde(default)]
    pub related_entries: Vec<String>,
    /// Narrative weight from 1 to 10.
    #[serde(default)]
    pub importance_level: u8,
}

/// One period of a world's history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    pub period: String,
    #[serde(default)]
    pub events: Vec<String>,
}

/// Durable description of the game world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldInfo {
    pub name: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_locations: Vec<String>,
    #[serde(default)]
    pub dominant_factions: Vec<String>,
    #[serde(default)]
    pub major_threats: Vec<String>,
    #[serde(default)]
    pub cultural_notes: Vec<String>,
    #[serde(default)]
    pub historical_timeline: Vec<HistoricalPeriod>,
}

/// Spatial detail for the current location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetails {
    #[serde(default)]
    pub exits: Vec<String>,
    #[serde(default)]
    pub hidden_areas: Vec<String>,
    #[serde(default)]
    pub resource_nodes: Vec<String>,
    /// Safety from 1 (deadly) to 10 (sanctuary).
    pub safety_level: u8,
}

impl Default for LocationDetails {
    fn default() -> Self {
        Self {
            exits: Vec::new(),
            hidden_areas: Vec::new(),
            resource_nodes: Vec::new(),
            safety_level: 5,
        }
    }
}

/// How the player interacted with the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    #[default]
    NarrativeChoice,
    CharacterInteraction,
    ItemInteraction,
    LocationInteraction,
    QuestInteraction,
    EnvironmentalInteraction,
}

/// Situational context captured at the moment of a choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionContext {
    pub timestamp: String,
    pub scene_context: String,
    pub location_context: String,
    #[serde(default)]
    pub characters_present: Vec<String>,
    #[serde(default)]
    pub available_items: Vec<String>,
    #[serde(default)]
    pub active_threats: Vec<ThreatUpdate>,
    #[serde(default)]
    pub mood_when_chosen: String,
    #[serde(default)]
    pub tension_level: u8,
}

/// A player interaction submitted with a turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserInteraction {
    pub interaction_type: InteractionType,
    pub choice_text: String,
    #[serde(default)]
    pub choice_index: Option<usize>,
    #[serde(default)]
    pub element_id: Option<String>,
    #[serde(default)]
    pub element_type: Option<String>,
    pub interaction_context: InteractionContext,
}

/// The scene the player is currently in, as context for the next turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentSceneContext {
    pub scene_tag: String,
    pub location: String,
    pub world: String,
    #[serde(default)]
    pub narration_text: String,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub narrative_options: Vec<String>,
    #[serde(default)]
    pub interactive_elements: Vec<InteractiveElement>,
    #[serde(default)]
    pub environmental_discoveries: Vec<EnvironmentalDiscovery>,
    #[serde(default)]
    pub mood_atmosphere: String,
    #[serde(default)]
    pub threat_updates: Vec<ThreatUpdate>,
    #[serde(default)]
    pub ambient_events: Vec<AmbientEvent>,
    #[serde(default)]
    pub relationship_changes: HashMap<String, i32>,
    #[serde(default)]
    pub new_secrets: Vec<String>,
    #[serde(default)]
    pub new_objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub completed_objectives_this_scene: Vec<String>,
    #[serde(default)]
    pub discovered_lore: Vec<LoreEntry>,
    #[serde(default)]
    pub world_info: WorldInfo,
    #[serde(default)]
    pub location_details: LocationDetails,
}

/// Cumulative pacing signals sent with every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameProgress {
    #[serde(default)]
    pub scenes_completed: u32,
    #[serde(default)]
    pub play_time_minutes: u32,
    /// Story arc position from 1 to 10.
    pub story_escalation_level: u8,
    /// Moment-to-moment tension from 1 to 10.
    pub tension_level: u8,
    #[serde(default)]
    pub major_story_beats: Vec<String>,
    #[serde(default)]
    pub active_themes: Vec<String>,
    #[serde(default)]
    pub world_knowledge: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub faction_standings: HashMap<String, String>,
    #[serde(default)]
    pub player_preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub preferred_interaction_types: Vec<String>,
}

impl Default for GameProgress {
    fn default() -> Self {
        Self {
            scenes_completed: 0,
            play_time_minutes: 0,
            story_escalation_level: 1,
            tension_level: 1,
            major_story_beats: Vec::new(),
            active_themes: Vec::new(),
            world_knowledge: HashMap::new(),
            faction_standings: HashMap::new(),
            player_preferences: HashMap::new(),
            preferred_interaction_types: Vec::new(),
        }
    }
}

/// Soft guidance for the narrative engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentHints {
    #[serde(default)]
    pub player_seems_to_prefer: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub story_pacing_hint: String,
    #[serde(default)]
    pub interaction_pattern: InteractionType,
    #[serde(default)]
    pub last_major_choice: Option<serde_json::Value>,
    #[serde(default)]
    pub world_theme: String,
    #[serde(default)]
    pub player_resource_status: ResourceAvailability,
}

/// Hard signals the narrative engine must not ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyFlags {
    #[serde(default)]
    pub low_health: bool,
    #[serde(default)]
    pub high_threat: bool,
    #[serde(default)]
    pub story_climax_approaching: bool,
    #[serde(default)]
    pub player_stuck: bool,
    #[serde(default)]
    pub critical_resources_low: bool,
}

/// The complete turn request sent to the narrative engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentInput {
    pub session_id: String,
    pub scenes_completed: u32,
    pub user_interaction: UserInteraction,
    /// Plain choice text, kept alongside the structured interaction.
    pub player_choice: String,
    pub current_location: String,
    pub current_world: String,
    #[serde(default)]
    pub scene_tag: Option<String>,
    #[serde(default)]
    pub present_characters: Vec<String>,
    pub current_scene: CurrentSceneContext,
    #[serde(default)]
    pub current_inventory: Vec<Item>,
    pub game_state: GameState,
    pub game_progress: GameProgress,
    #[serde(default)]
    pub recent_history: Vec<String>,
    #[serde(default)]
    pub agent_hints: AgentHints,
    #[serde(default)]
    pub emergency_flags: EmergencyFlags,
}

/// One turn's narrative output. Never mutated after receipt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneResponse {
    #[serde(default)]
    pub scene_tag: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub world: String,
    #[serde(default)]
    pub narration_text: String,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Player-facing options, normally 2 to 6.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default)]
    pub inventory_changes: InventoryChanges,
    #[serde(default)]
    pub current_inventory: Vec<Item>,
    #[serde(default)]
    pub mood_atmosphere: String,
    /// One-sentence summary of the turn for the history log.
    #[serde(default)]
    pub history_entry: String,
    #[serde(default)]
    pub relationship_changes: HashMap<String, i32>,
    #[serde(default)]
    pub new_secrets: Vec<String>,
    #[serde(default)]
    pub new_objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub completed_objectives_this_scene: Vec<String>,
    #[serde(default)]
    pub interactive_elements: Vec<InteractiveElement>,
    #[serde(default)]
    pub environmental_discoveries: Vec<EnvironmentalDiscovery>,
    #[serde(default)]
    pub threat_updates: Vec<ThreatUpdate>,
    #[serde(default)]
    pub ambient_events: Vec<AmbientEvent>,
    #[serde(default)]
    pub discovered_lore: Vec<LoreEntry>,
    #[serde(default)]
    pub world_info: Option<WorldInfo>,
    #[serde(default)]
    pub location_details: LocationDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_response_parses_partial_payload() {
        let json = r#"{
            "scene_tag": "harbor_arrival",
            "location": "Basra Harbor",
            "world": "Sinbad",
            "narration_text": "Gulls wheel over the masts.",
            "options": ["Approach the dockmaster", "Slip into the crowd"],
            "history_entry": "You arrived at Basra Harbor."
        }"#;

        let scene: SceneResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(scene.scene_tag, "harbor_arrival");
        assert_eq!(scene.options.len(), 2);
        assert!(scene.dialogue.is_empty());
        assert!(scene.world_info.is_none());
        assert_eq!(scene.location_details.safety_level, 5);
    }

    #[test]
    fn test_interaction_type_wire_names() {
        let ty = InteractionType::NarrativeChoice;
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"narrative_choice\"");

        let back: InteractionType = serde_json::from_str("\"item_interaction\"").unwrap();
        assert_eq!(back, InteractionType::ItemInteraction);
    }

    #[test]
    fn test_lore_category_wire_names() {
        let json = serde_json::to_string(&LoreCategory::Artifact).unwrap();
        assert_eq!(json, "\"artifact\"");
    }

    #[test]
    fn test_resource_defaults() {
        let resources = ResourceAvailability::default();
        assert_eq!(resources.food, "moderate");
        assert_eq!(resources.medical_supplies, "scarce");
    }

    #[test]
    fn test_agent_input_round_trip() {
        let input = AgentInput {
            session_id: "guest".to_string(),
            scenes_completed: 3,
            player_choice: "Look around".to_string(),
            current_location: "Basra Harbor".to_string(),
            current_world: "Sinbad".to_string(),
            ..AgentInput::default()
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["session_id"], "guest");
        assert_eq!(json["scenes_completed"], 3);

        let back: AgentInput = serde_json::from_value(json).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_init_response_without_memory() {
        let json = r#"{"status": "no_memory", "message": "No saved game found."}"#;
        let init: InitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(init.status, "no_memory");
        assert!(init.latest_memory_data.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = Council::new("http://example.com/");
        assert_eq!(client.base_url, "http://example.com");
    }
}
