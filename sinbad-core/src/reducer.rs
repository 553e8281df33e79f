//! The scene reducer.
//!
//! A pure fold of one accepted scene into the durable memory record. The
//! merge order is fixed and total over every record field, so there is no
//! ambiguity between missing, empty, and defaulted values. The wall clock is
//! injected through [`TurnContext`], which keeps the fold deterministic:
//! identical inputs always produce an identical record.

use crate::memory::{CurrentScene, GameMemory, HISTORY_CAP};
use chrono::{DateTime, Utc};
use council::{LoreEntry, SceneResponse, UserInteraction};

/// Per-turn inputs that are not part of the scene itself.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Session the record belongs to.
    pub session_id: &'a str,
    /// World name requested for a brand-new game, used only when no prior
    /// record exists and the scene does not name a world.
    pub world_hint: Option<&'a str>,
    /// Injected wall-clock time for this fold.
    pub now: DateTime<Utc>,
    /// Whole minutes elapsed since the previous accepted turn.
    pub elapsed_minutes: u32,
    /// The interaction that produced this scene, recorded into the
    /// player-choice history when present.
    pub choice: Option<&'a UserInteraction>,
}

impl<'a> TurnContext<'a> {
    pub fn new(session_id: &'a str, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            world_hint: None,
            now,
            elapsed_minutes: 0,
            choice: None,
        }
    }

    pub fn with_world_hint(mut self, world: &'a str) -> Self {
        self.world_hint = Some(world);
        self
    }

    pub fn with_elapsed_minutes(mut self, minutes: u32) -> Self {
        self.elapsed_minutes = minutes;
        self
    }

    pub fn with_choice(mut self, choice: &'a UserInteraction) -> Self {
        self.choice = Some(choice);
        self
    }
}

/// Fold one accepted scene into the memory record.
///
/// When `prev` is absent a default record is synthesized first, seeded with
/// the session id and the requested world name. The scene is never mutated;
/// the previous record is never mutated; the returned record is complete and
/// self-consistent.
pub fn reduce(
    prev: Option<&GameMemory>,
    scene: &SceneResponse,
    ctx: &TurnContext<'_>,
) -> GameMemory {
    let mut memory = match prev {
        Some(record) => record.clone(),
        None => {
            let world = ctx
                .world_hint
                .filter(|w| !w.trim().is_empty())
                .unwrap_or(if scene.world.is_empty() {
                    "default"
                } else {
                    scene.world.as_str()
                });
            GameMemory::new_session(ctx.session_id, world, ctx.now)
        }
    };

    memory.session_id = ctx.session_id.to_string();
    memory.last_updated = ctx.now;

    // 1. Pointer fields follow the new scene wholesale.
    memory.scene_tag = scene.scene_tag.clone();
    memory.location = scene.location.clone();
    memory.world = scene.world.clone();
    memory.inventory = scene.current_inventory.clone();
    memory.game_state = scene.game_state.clone();
    memory.current_scene = CurrentScene::from_scene(scene, &memory.world_info);

    // 2. History log: append if the scene produced a sentence, drop the
    //    oldest entries beyond the cap.
    if !scene.history_entry.is_empty() {
        memory.history.push(scene.history_entry.clone());
    }
    if memory.history.len() > HISTORY_CAP {
        let excess = memory.history.len() - HISTORY_CAP;
        memory.history.drain(..excess);
    }

    // 3. Counters.
    memory.scenes_completed += 1;
    memory.play_time_minutes += ctx.elapsed_minutes;

    // 4. Discovery sets, identity by name or id.
    if !scene.location.is_empty() {
        union_str(&mut memory.discovered_locations, &scene.location);
    }
    for character in &scene.characters {
        if !character.id.is_empty() {
            union_str(&mut memory.met_characters, &character.id);
        }
    }

    // 5. Lore, identity by full content.
    union_lore(&mut memory.lore_collection, &scene.discovered_lore);

    // 6. World metadata: last non-empty wins, never cleared by omission.
    if let Some(info) = &scene.world_info {
        if !info.name.trim().is_empty() {
            memory.world_info = info.clone();
        }
    }

    // Accumulate the choice that produced this scene.
    if let Some(choice) = ctx.choice {
        if let Ok(value) = serde_json::to_value(choice) {
            memory.player_choices_history.push(value);
        }
    }

    // Fold pacing knowledge the engine threads through dynamic flags.
    if let Some(serde_json::Value::Object(map)) = scene.game_state.story_flags.get("world_knowledge")
    {
        for (key, value) in map {
            memory.world_knowledge.insert(key.clone(), value.clone());
        }
    }
    if let Some(serde_json::Value::Object(map)) =
        scene.game_state.story_flags.get("player_preferences")
    {
        for (key, value) in map {
            memory.player_preferences.insert(key.clone(), value.clone());
        }
    }
    for (faction, standing) in &scene.game_state.reputation {
        memory
            .faction_standings
            .insert(faction.clone(), standing.clone());
    }

    memory
}

/// Append `candidate` unless an equal entry already exists. Order-preserving.
fn union_str(into: &mut Vec<String>, candidate: &str) {
    if !into.iter().any(|existing| existing == candidate) {
        into.push(candidate.to_string());
    }
}

/// Append lore entries that are not already present, comparing full content.
fn union_lore(into: &mut Vec<LoreEntry>, entries: &[LoreEntry]) {
    for entry in entries {
        if !into.iter().any(|existing| existing == entry) {
            into.push(entry.clone());
        }
    }
}
