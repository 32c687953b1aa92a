//! Dialogue script normalization — sheet rows into an ordered step
//! sequence for one encounter.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::row::DialogueRow;
use crate::schema::step::{DialogueStep, SpriteKey};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("no dialogue rows match encounter {0:?}")]
    EmptyScript(String),
}

/// An ordered dialogue script for a single encounter. Immutable for the
/// duration of one playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueScript {
    encounter_id: String,
    steps: Vec<DialogueStep>,
    sprite_sources: FxHashMap<SpriteKey, String>,
}

impl DialogueScript {
    /// Normalize the rows whose encounter-id field equals `encounter_id`
    /// (compared as strings) into an ordered script, preserving row order.
    ///
    /// Zero matching rows is an error, not an empty script: a trigger
    /// pointing at absent data must fail session start, loudly.
    pub fn normalize(
        rows: &[DialogueRow],
        encounter_id: &str,
    ) -> Result<DialogueScript, ScriptError> {
        let mut steps = Vec::new();
        let mut sprite_sources = FxHashMap::default();

        for row in rows.iter().filter(|row| row.encounter_id == encounter_id) {
            let step = DialogueStep::from_row(row);
            sprite_sources
                .entry(step.sprite.clone())
                .or_insert_with(|| row.talksprite_id.clone());
            steps.push(step);
        }

        if steps.is_empty() {
            return Err(ScriptError::EmptyScript(encounter_id.to_string()));
        }

        log::debug!(
            "normalized {} step(s), {} distinct sprite(s) for encounter {}",
            steps.len(),
            sprite_sources.len(),
            encounter_id
        );

        Ok(DialogueScript {
            encounter_id: encounter_id.to_string(),
            steps,
            sprite_sources,
        })
    }

    pub fn encounter_id(&self) -> &str {
        &self.encounter_id
    }

    pub fn steps(&self) -> &[DialogueStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct sprite sources for the host's asset preload, keyed the way
    /// playback will reference them.
    pub fn sprite_sources(&self) -> &FxHashMap<SpriteKey, String> {
        &self.sprite_sources
    }
}
