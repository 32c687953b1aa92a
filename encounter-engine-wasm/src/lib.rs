//! WASM bindings for encounter-engine — powers the browser host.
//!
//! The host keeps rendering and input (the canvas framework, the DOM) and
//! the network fetch of the spreadsheets; this crate holds the engine
//! state and speaks JSON across the boundary: parsed sheet rows come in,
//! stage-command buffers go out.

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use encounter_engine::core::playback::{AdvanceOutcome, PlaybackState};
use encounter_engine::core::registry::{marker_layout, TriggerRegistry};
use encounter_engine::core::select::select;
use encounter_engine::core::stage::{CommandStage, StageCommand};
use encounter_engine::schema::location::{Location, LocationRegistry};
use encounter_engine::schema::record::{ConversationRecord, ConvoId, SelectionTarget};
use encounter_engine::schema::row::{filter_short_rows, parse_convo_rows, DialogueRow, FieldValue};

// ---------------------------------------------------------------------------
// Embedded sample town — compiled into the WASM binary for the demo page
// ---------------------------------------------------------------------------
mod data {
    pub const LOCATIONS: &str = include_str!("../../sample_data/locations.ron");
    pub const CONVO_LIST: &str = include_str!("../../sample_data/convo_list.ron");
    pub const DIALOGUE: &str = include_str!("../../sample_data/dialogue.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct MarkerInfo {
    x: i32,
    flipped: bool,
    foreground: bool,
}

#[derive(serde::Serialize)]
struct TriggerInfo {
    encounter_id: String,
    location: u32,
    x: i32,
    y: i32,
    tags: Vec<u32>,
    markers: Vec<MarkerInfo>,
}

/// One engine response: everything the renderer should do, plus where the
/// session now stands.
#[derive(serde::Serialize)]
struct StepOutput {
    commands: Vec<StageCommand>,
    state: String,
    close_requested: bool,
}

fn state_label(state: Option<PlaybackState>) -> String {
    match state {
        Some(PlaybackState::Idle) => "idle",
        Some(PlaybackState::Typing) => "typing",
        Some(PlaybackState::AwaitingAdvance) => "awaiting_advance",
        Some(PlaybackState::Ended) => "ended",
        None => "no_session",
    }
    .to_string()
}

/// A dynamically-typed JSON cell into the engine's field type. CSV parsers
/// with dynamic typing hand numbers through as numbers and everything else
/// as strings.
fn field_from_json(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::String(s) if s.is_empty() => FieldValue::Empty,
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        serde_json::Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                FieldValue::Int(int)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        _ => FieldValue::Empty,
    }
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ---------------------------------------------------------------------------
// The director — one of these per player context
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct EncounterDirector {
    pool: Vec<ConversationRecord>,
    dialogue: Vec<DialogueRow>,
    registry: TriggerRegistry,
    stage: CommandStage,
    rng: StdRng,
}

#[wasm_bindgen]
impl EncounterDirector {
    #[wasm_bindgen(constructor)]
    pub fn new() -> EncounterDirector {
        EncounterDirector {
            pool: Vec::new(),
            dialogue: Vec::new(),
            registry: TriggerRegistry::new(LocationRegistry::new()),
            stage: CommandStage::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic runs for the demo page's "same day again" button.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Load the sample town compiled into the binary.
    pub fn load_sample_town(&mut self) -> Result<(), JsValue> {
        let locations = LocationRegistry::parse_ron(data::LOCATIONS).map_err(js_err)?;
        let raw = parse_convo_rows(data::CONVO_LIST).map_err(js_err)?;
        self.pool = ConversationRecord::parse_pool(&filter_short_rows(raw));
        self.dialogue = DialogueRow::parse_ron(data::DIALOGUE).map_err(js_err)?;
        self.registry = TriggerRegistry::new(locations);
        Ok(())
    }

    /// Conversation-list sheet as JSON rows of mixed-typed cells
    /// (`[[1, "1,2", 1], ...]`).
    pub fn load_conversation_sheet(&mut self, json: &str) -> Result<(), JsValue> {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(json).map_err(js_err)?;
        let rows: Vec<Vec<FieldValue>> = rows
            .iter()
            .map(|row| row.iter().map(field_from_json).collect())
            .collect();
        self.pool = ConversationRecord::parse_pool(&filter_short_rows(rows));
        Ok(())
    }

    /// Dialogue sheet as a JSON array of named-column rows.
    pub fn load_dialogue_sheet(&mut self, json: &str) -> Result<(), JsValue> {
        self.dialogue = serde_json::from_str(json).map_err(js_err)?;
        Ok(())
    }

    /// Location list as a JSON array.
    pub fn load_locations(&mut self, json: &str) -> Result<(), JsValue> {
        let entries: Vec<Location> = serde_json::from_str(json).map_err(js_err)?;
        let mut locations = LocationRegistry::new();
        for location in entries {
            locations.register(location);
        }
        self.registry = TriggerRegistry::new(locations);
        Ok(())
    }

    /// Run a selection pass and place triggers. Returns the selected
    /// encounter ids as JSON; errs with the no-feasible-selection message
    /// when the search exhausts (the host shows its retry view).
    pub fn select_and_place(
        &mut self,
        tags: &str,
        max_per_location: u32,
    ) -> Result<String, JsValue> {
        let required: Vec<u32> = tags
            .split(',')
            .filter_map(|piece| piece.trim().parse().ok())
            .collect();
        let target = SelectionTarget::new(required, max_per_location);

        let Some(ids) = select(&self.pool, &target, &mut self.rng) else {
            return Err(js_err(
                encounter_engine::core::registry::EncounterError::NoFeasibleSelection,
            ));
        };
        self.registry.populate(&self.pool, &ids);

        let names: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        serde_json::to_string(&names).map_err(js_err)
    }

    /// The placed triggers with their marker clusters, as JSON.
    pub fn triggers(&self) -> Result<String, JsValue> {
        let infos: Vec<TriggerInfo> = self
            .registry
            .triggers()
            .iter()
            .map(|trigger| TriggerInfo {
                encounter_id: trigger.encounter_id.to_string(),
                location: trigger.location.0,
                x: trigger.position.0,
                y: trigger.position.1,
                tags: trigger.tags.clone(),
                markers: marker_layout(trigger.position.0, trigger.tags.len().max(1))
                    .into_iter()
                    .map(|slot| MarkerInfo {
                        x: slot.x,
                        flipped: slot.flipped,
                        foreground: slot.foreground,
                    })
                    .collect(),
            })
            .collect();
        serde_json::to_string(&infos).map_err(js_err)
    }

    /// Activate a trigger. Errs on a second concurrent session or on an id
    /// with no dialogue rows.
    pub fn start_encounter(&mut self, id: &str, now_ms: f64) -> Result<String, JsValue> {
        self.registry
            .start_encounter(&ConvoId::from(id), &self.dialogue, &mut self.stage, now_ms as u64)
            .map_err(js_err)?;
        Ok(self.output(false))
    }

    /// Player tap.
    pub fn advance(&mut self, now_ms: f64) -> String {
        let close_requested = match self.registry.active_session_mut() {
            Some(session) => matches!(
                session.playback_mut().advance(&mut self.stage, now_ms as u64),
                AdvanceOutcome::CloseRequested
            ),
            None => false,
        };
        self.output(close_requested)
    }

    /// Frame clock.
    pub fn tick(&mut self, now_ms: f64) -> String {
        if let Some(session) = self.registry.active_session_mut() {
            session.playback_mut().tick(&mut self.stage, now_ms as u64);
        }
        self.output(false)
    }

    /// End the session (player escape, fatal host error, or after a
    /// close-requested advance). The commands destroy every owned visual.
    pub fn close(&mut self) -> String {
        self.registry.close_active(&mut self.stage);
        self.output(false)
    }

    pub fn session_state(&self) -> String {
        state_label(
            self.registry
                .active_session()
                .map(|session| session.playback().state()),
        )
    }

    fn output(&mut self, close_requested: bool) -> String {
        let state = self.session_state();
        let output = StepOutput {
            commands: self.stage.drain(),
            state,
            close_requested,
        };
        serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for EncounterDirector {
    fn default() -> Self {
        Self::new()
    }
}
