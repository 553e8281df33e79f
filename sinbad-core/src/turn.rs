//! Turn orchestration.
//!
//! The controller runs one player turn end to end: snapshot the current
//! memory record into a request, call the narrative service once, validate
//! the scene it returns, fold it into the record, and persist. A failed turn
//! leaves the record exactly as it was; the player retries by resubmitting.
//! At most one turn is in flight per session, enforced by a `try_lock` on
//! the controller state.

use crate::memory::GameMemory;
use crate::reducer::{reduce, TurnContext};
use crate::store::MemoryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council::{
    AgentHints, AgentInput, Council, CurrentSceneContext, EmergencyFlags, GameProgress,
    InteractionContext, InteractionType, SceneResponse, UserInteraction, WorldInfo,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Scenes-completed threshold past which pacing hints push toward a climax.
const CLIMAX_PACING_THRESHOLD: u32 = 50;

/// Scenes-completed threshold past which the climax flag is raised.
const CLIMAX_FLAG_THRESHOLD: u32 = 80;

/// Injected wall clock. Production uses [`SystemClock`]; tests fix the time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The narrative backend, seen from the core: one structured request in, one
/// structured scene out. Retry policy lives with the caller, not here.
#[async_trait]
pub trait TurnService: Send + Sync {
    async fn interact(&self, input: &AgentInput) -> Result<SceneResponse, council::Error>;
}

#[async_trait]
impl TurnService for Council {
    async fn interact(&self, input: &AgentInput) -> Result<SceneResponse, council::Error> {
        Council::interact(self, input).await
    }
}

/// Errors surfaced from a submitted turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Turn service error: {0}")]
    Service(#[from] council::Error),

    #[error("Malformed scene response: missing {0}")]
    MalformedScene(&'static str),
}

/// A choice the player submitted.
#[derive(Debug, Clone)]
pub struct PlayerChoice {
    pub text: String,
    pub interaction_type: InteractionType,
    pub choice_index: Option<usize>,
    pub element_id: Option<String>,
    pub element_type: Option<String>,
}

impl PlayerChoice {
    pub fn new(text: impl Into<String>, interaction_type: InteractionType) -> Self {
        Self {
            text: text.into(),
            interaction_type,
            choice_index: None,
            element_id: None,
            element_type: None,
        }
    }

    /// Shorthand for a plain narrative choice.
    pub fn narrative(text: impl Into<String>) -> Self {
        Self::new(text, InteractionType::NarrativeChoice)
    }

    /// Tie the choice to an interactive element in the scene.
    pub fn with_element(mut self, id: impl Into<String>, element_type: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self.element_type = Some(element_type.into());
        self
    }

    /// Record which listed option the player picked.
    pub fn with_index(mut self, index: usize) -> Self {
        self.choice_index = Some(index);
        self
    }
}

/// Result of submitting a choice.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn was accepted; the scene and record both advanced.
    Advanced {
        scene: SceneResponse,
        memory: GameMemory,
    },
    /// A turn was already in flight. Nothing happened; resubmit later.
    Rejected,
    /// The service call failed or returned a malformed scene. The prior
    /// record is untouched; resubmitting is safe.
    Failed(TurnError),
}

impl TurnOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, TurnOutcome::Advanced { .. })
    }
}

/// Session identifier for an unauthenticated player.
pub fn guest_session_id() -> String {
    format!("guest-{}", Uuid::new_v4())
}

struct TurnState {
    memory: Option<GameMemory>,
    scene: Option<SceneResponse>,
    progress: GameProgress,
    last_turn_at: DateTime<Utc>,
}

/// Orchestrates player turns for one session.
///
/// Constructed only after reconciliation has produced its outcome, so the
/// first submitted choice always sees the authoritative record (or a
/// confirmed fresh session).
pub struct TurnController {
    session_id: String,
    service: Arc<dyn TurnService>,
    store: MemoryStore,
    clock: Arc<dyn Clock>,
    state: Mutex<TurnState>,
}

impl TurnController {
    pub fn new(
        session_id: impl Into<String>,
        resolved: Option<GameMemory>,
        service: Arc<dyn TurnService>,
        store: MemoryStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let progress = resolved
            .as_ref()
            .map(progress_from_memory)
            .unwrap_or_default();
        let last_turn_at = clock.now();

        Self {
            session_id: session_id.into(),
            service,
            store,
            clock,
            state: Mutex::new(TurnState {
                memory: resolved,
                scene: None,
                progress,
                last_turn_at,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current memory record, if the session has one.
    pub async fn memory(&self) -> Option<GameMemory> {
        self.state.lock().await.memory.clone()
    }

    /// The scene the presentation layer should render, if any.
    pub async fn current_scene(&self) -> Option<SceneResponse> {
        self.state.lock().await.scene.clone()
    }

    /// Cumulative pacing snapshot.
    pub async fn progress(&self) -> GameProgress {
        self.state.lock().await.progress.clone()
    }

    /// Produce a renderable scene for a session that already has a record
    /// but no live scene, as happens right after a reload.
    ///
    /// Returns `None` for a fresh session; the caller starts a new game.
    pub async fn bootstrap(&self) -> Option<SceneResponse> {
        let mut state = self.state.lock().await;
        if let Some(scene) = &state.scene {
            return Some(scene.clone());
        }
        let memory = state.memory.as_ref()?;
        info!(session_id = %self.session_id, scenes = memory.scenes_completed, "Resuming from stored memory");
        let scene = memory.resume_scene();
        state.progress = progress_from_memory(memory);
        state.scene = Some(scene.clone());
        Some(scene)
    }

    /// Discard every stored copy of this session's memory and play the
    /// opening turn of a new game.
    pub async fn start_new_game(&self, world: Option<String>) -> TurnOutcome {
        let world = match world {
            Some(world) => Some(world),
            None => self.store.context().world_name().await,
        };

        info!(session_id = %self.session_id, world = world.as_deref().unwrap_or("default"), "Starting new game");
        self.store.discard(&self.session_id).await;

        {
            let mut state = self.state.lock().await;
            state.memory = None;
            state.scene = None;
            state.progress = GameProgress::default();
        }

        let opening = match &world {
            Some(world) => {
                self.store.context().set_world_name(world.clone()).await;
                format!("Start Game in {world}")
            }
            None => "Start Game".to_string(),
        };

        self.submit_choice(PlayerChoice::narrative(opening)).await
    }

    /// Run one player turn.
    ///
    /// If a turn is already in flight the call is a silent no-op returning
    /// [`TurnOutcome::Rejected`]. The service is invoked exactly once; on
    /// any failure the prior record is left untouched and the error is
    /// surfaced for the player to retry.
    pub async fn submit_choice(&self, choice: PlayerChoice) -> TurnOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            debug!(session_id = %self.session_id, "Turn already in flight; ignoring submission");
            return TurnOutcome::Rejected;
        };

        let now = self.clock.now();
        let elapsed_minutes = (now - state.last_turn_at).num_minutes().max(0) as u32;
        state.last_turn_at = now;

        let world_hint = self.store.context().world_name().await;
        let input = self.build_input(&state, &choice, now, world_hint.as_deref());

        let scene = match self.service.interact(&input).await {
            Ok(scene) => scene,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Turn service call failed");
                return TurnOutcome::Failed(TurnError::Service(e));
            }
        };

        if let Err(e) = validate_scene(&scene) {
            warn!(session_id = %self.session_id, error = %e, "Rejected malformed scene");
            return TurnOutcome::Failed(e);
        }

        let ctx = TurnContext {
            session_id: &self.session_id,
            world_hint: world_hint.as_deref(),
            now,
            elapsed_minutes,
            choice: Some(&input.user_interaction),
        };
        let memory = reduce(state.memory.as_ref(), &scene, &ctx);

        absorb_scene_progress(&mut state.progress, &scene, &memory);
        state.memory = Some(memory.clone());
        state.scene = Some(scene.clone());

        // Persistence is a direct consequence of the committed reduction,
        // and the turn stays in flight until the local write lands.
        self.store.persist(&memory).await;

        info!(
            session_id = %self.session_id,
            scene_tag = %scene.scene_tag,
            scenes_completed = memory.scenes_completed,
            "Turn committed"
        );

        TurnOutcome::Advanced { scene, memory }
    }

    fn build_input(
        &self,
        state: &TurnState,
        choice: &PlayerChoice,
        now: DateTime<Utc>,
        world_hint: Option<&str>,
    ) -> AgentInput {
        let memory = state.memory.as_ref();
        let live = state.scene.as_ref();

        let scene_context = memory
            .map(GameMemory::scene_context)
            .unwrap_or_else(|| default_scene_context(world_hint));
        let game_state = memory.map(|m| m.game_state.clone()).unwrap_or_default();
        let inventory = memory.map(|m| m.inventory.clone()).unwrap_or_default();

        let scenes_completed = state.progress.scenes_completed + 1;

        let characters_present: Vec<String> = live
            .map(|scene| scene.characters.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_else(|| scene_context.characters.iter().map(|c| c.id.clone()).collect());
        let available_items: Vec<String> = live
            .map(|scene| scene.current_inventory.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_else(|| inventory.iter().map(|i| i.name.clone()).collect());
        let threat_source = live
            .map(|scene| scene.threat_updates.as_slice())
            .unwrap_or(scene_context.threat_updates.as_slice());
        let active_threats = threat_source
            .iter()
            .filter(|t| t.immediate_danger)
            .cloned()
            .collect();
        let mood_when_chosen = live
            .map(|scene| scene.mood_atmosphere.clone())
            .filter(|mood| !mood.is_empty())
            .unwrap_or_else(|| {
                if scene_context.mood_atmosphere.is_empty() {
                    "neutral".to_string()
                } else {
                    scene_context.mood_atmosphere.clone()
                }
            });

        let user_interaction = UserInteraction {
            interaction_type: choice.interaction_type,
            choice_text: choice.text.clone(),
            choice_index: choice.choice_index,
            element_id: choice.element_id.clone(),
            element_type: choice.element_type.clone(),
            interaction_context: InteractionContext {
                timestamp: now.to_rfc3339(),
                scene_context: scene_context.scene_tag.clone(),
                location_context: scene_context.location.clone(),
                characters_present: characters_present.clone(),
                available_items,
                active_threats,
                mood_when_chosen,
                tension_level: state.progress.tension_level,
            },
        };

        let agent_hints = AgentHints {
            player_seems_to_prefer: memory
                .map(|m| m.player_preferences.clone())
                .unwrap_or_default(),
            story_pacing_hint: if scenes_completed > CLIMAX_PACING_THRESHOLD {
                "escalate_toward_climax".to_string()
            } else {
                "build_tension".to_string()
            },
            interaction_pattern: choice.interaction_type,
            last_major_choice: memory.and_then(|m| m.player_choices_history.last().cloned()),
            world_theme: memory
                .map(|m| m.world_info.theme.clone())
                .filter(|theme| !theme.is_empty())
                .unwrap_or_else(|| "survival".to_string()),
            player_resource_status: game_state.resource_availability.clone(),
        };

        let emergency_flags = EmergencyFlags {
            low_health: false,
            high_threat: scene_context
                .threat_updates
                .iter()
                .any(|t| t.immediate_danger && t.escalation_level > 7),
            story_climax_approaching: scenes_completed > CLIMAX_FLAG_THRESHOLD,
            player_stuck: false,
            critical_resources_low: game_state.resource_availability.food == "critical"
                || game_state.resource_availability.water == "critical",
        };

        let mut game_progress = state.progress.clone();
        game_progress.scenes_completed = scenes_completed;

        AgentInput {
            session_id: self.session_id.clone(),
            scenes_completed,
            user_interaction,
            player_choice: choice.text.clone(),
            current_location: memory
                .map(|m| m.location.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "starting_area".to_string()),
            current_world: memory
                .map(|m| m.world.clone())
                .filter(|w| !w.is_empty())
                .or_else(|| world_hint.map(str::to_string))
                .unwrap_or_else(|| "default_world".to_string()),
            scene_tag: memory.map(|m| m.scene_tag.clone()),
            present_characters: characters_present,
            current_scene: scene_context,
            current_inventory: inventory,
            game_state,
            game_progress,
            recent_history: memory.map(|m| m.history.clone()).unwrap_or_default(),
            agent_hints,
            emergency_flags,
        }
    }
}

/// A scene missing its identity fields is unusable even if the transport
/// call succeeded.
fn validate_scene(scene: &SceneResponse) -> Result<(), TurnError> {
    if scene.scene_tag.trim().is_empty() {
        return Err(TurnError::MalformedScene("scene_tag"));
    }
    if scene.location.trim().is_empty() {
        return Err(TurnError::MalformedScene("location"));
    }
    if scene.world.trim().is_empty() {
        return Err(TurnError::MalformedScene("world"));
    }
    Ok(())
}

/// Scene context for a session with no memory yet.
fn default_scene_context(world_hint: Option<&str>) -> CurrentSceneContext {
    let world = world_hint.unwrap_or("default_world").to_string();
    CurrentSceneContext {
        scene_tag: "start".to_string(),
        location: "starting_area".to_string(),
        world: world.clone(),
        narration_text: "You find yourself in a new situation...".to_string(),
        mood_atmosphere: "neutral".to_string(),
        world_info: WorldInfo {
            name: world,
            theme: "adventure".to_string(),
            description: "A mysterious world awaits exploration".to_string(),
            ..WorldInfo::default()
        },
        ..CurrentSceneContext::default()
    }
}

fn progress_from_memory(memory: &GameMemory) -> GameProgress {
    let flags = &memory.game_state.story_flags;
    GameProgress {
        scenes_completed: memory.scenes_completed,
        play_time_minutes: memory.play_time_minutes,
        story_escalation_level: flag_u8(flags, "story_escalation_level").unwrap_or(1),
        tension_level: flag_u8(flags, "tension_level").unwrap_or(1),
        major_story_beats: memory.major_story_beats.clone(),
        active_themes: flag_strings(flags, "active_themes").unwrap_or_default(),
        world_knowledge: memory.world_knowledge.clone(),
        faction_standings: memory.faction_standings.clone(),
        player_preferences: memory.player_preferences.clone(),
        preferred_interaction_types: flag_strings(flags, "preferred_interaction_types")
            .unwrap_or_default(),
    }
}

/// Update the pacing snapshot from a freshly committed scene.
fn absorb_scene_progress(progress: &mut GameProgress, scene: &SceneResponse, memory: &GameMemory) {
    progress.scenes_completed = memory.scenes_completed;
    progress.play_time_minutes = memory.play_time_minutes;

    let flags = &scene.game_state.story_flags;
    if let Some(level) = flag_u8(flags, "story_escalation_level") {
        progress.story_escalation_level = level;
    }
    if let Some(level) = flag_u8(flags, "tension_level") {
        progress.tension_level = level;
    }
    if !scene.game_state.major_events.is_empty() {
        progress.major_story_beats = scene.game_state.major_events.clone();
    }
    if let Some(themes) = flag_strings(flags, "active_themes") {
        progress.active_themes = themes;
    }
    if let Some(knowledge) = flag_object(flags, "world_knowledge") {
        progress.world_knowledge = knowledge;
    }
    if !scene.game_state.reputation.is_empty() {
        progress.faction_standings = scene.game_state.reputation.clone();
    }
    if let Some(preferences) = flag_object(flags, "player_preferences") {
        progress.player_preferences = preferences;
    }
    if let Some(types) = flag_strings(flags, "preferred_interaction_types") {
        progress.preferred_interaction_types = types;
    }
}

fn flag_u8(flags: &HashMap<String, serde_json::Value>, key: &str) -> Option<u8> {
    flags.get(key)?.as_u64().map(|v| v.min(u8::MAX as u64) as u8)
}

fn flag_strings(flags: &HashMap<String, serde_json::Value>, key: &str) -> Option<Vec<String>> {
    let values = flags.get(key)?.as_array()?;
    Some(
        values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

fn flag_object(
    flags: &HashMap<String, serde_json::Value>,
    key: &str,
) -> Option<HashMap<String, serde_json::Value>> {
    let map = flags.get(key)?.as_object()?;
    Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}
