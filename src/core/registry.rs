//! Encounter triggers — spawn placement, marker layout, activation, and
//! the one-session-at-a-time guard.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::playback::{Playback, PlaybackState};
use crate::core::script::{DialogueScript, ScriptError};
use crate::core::stage::Stage;
use crate::schema::location::LocationRegistry;
use crate::schema::record::{ConvoId, ConversationRecord, GroupId};
use crate::schema::row::DialogueRow;

#[derive(Debug, Error)]
pub enum EncounterError {
    /// The tabular source could not be reached or read. Fatal to the
    /// requesting session; hosts surface a blocking retry view.
    #[error("encounter data unavailable: {0}")]
    DataUnavailable(String),
    /// The selection search exhausted every branch.
    #[error("no feasible conversation subset for the requested coverage")]
    NoFeasibleSelection,
    /// A trigger resolved to zero dialogue rows.
    #[error("no dialogue rows match encounter {0}")]
    NoMatchingData(String),
    /// One session at a time; a second activation is refused.
    #[error("an encounter session is already active")]
    AlreadyActive,
}

impl From<ScriptError> for EncounterError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::EmptyScript(id) => EncounterError::NoMatchingData(id),
        }
    }
}

/// A placed encounter trigger: what it starts and where it stands.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub encounter_id: ConvoId,
    /// Sorted, for a stable marker cluster.
    pub tags: Vec<u32>,
    pub location: GroupId,
    pub position: (i32, i32),
}

/// Horizontal spacing between the markers of one trigger cluster.
pub const MARKER_SPACING: i32 = 125;

/// One marker sprite slot within a trigger cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSlot {
    pub x: i32,
    /// Mirrored so the marker faces the cluster center.
    pub flipped: bool,
    /// Drawn above its siblings; the first marker leads the cluster.
    pub foreground: bool,
}

/// Lay out `count` markers centered on `center_x`.
///
/// With three or four markers the first two mirror; with two only the
/// first does; a lone marker faces forward.
pub fn marker_layout(center_x: i32, count: usize) -> Vec<MarkerSlot> {
    let start_x = center_x - ((count as i32 - 1) * MARKER_SPACING) / 2;
    (0..count)
        .map(|i| MarkerSlot {
            x: start_x + i as i32 * MARKER_SPACING,
            flipped: match count {
                3 | 4 => i < 2,
                2 => i == 0,
                _ => false,
            },
            foreground: i == 0,
        })
        .collect()
}

/// An active dialogue session, owned by the registry while it runs.
pub struct Session {
    encounter_id: ConvoId,
    playback: Playback,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("encounter_id", &self.encounter_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn encounter_id(&self) -> &ConvoId {
        &self.encounter_id
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }
}

/// How a session ended, so the host knows how to restore the map view it
/// suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The player advanced through the whole script.
    Completed,
    /// The host closed the session early (escape control, fatal error).
    Dismissed,
}

/// Places selected conversations as activatable triggers and guards the
/// one-session-at-a-time rule.
#[derive(Default)]
pub struct TriggerRegistry {
    locations: LocationRegistry,
    triggers: Vec<Trigger>,
    active: Option<Session>,
}

impl TriggerRegistry {
    pub fn new(locations: LocationRegistry) -> TriggerRegistry {
        TriggerRegistry {
            locations,
            triggers: Vec::new(),
            active: None,
        }
    }

    pub fn locations(&self) -> &LocationRegistry {
        &self.locations
    }

    /// Rebuild triggers from a selection result. Each location's spawn
    /// slots are handed out in order and cycled when its records outnumber
    /// them.
    pub fn populate(&mut self, pool: &[ConversationRecord], selected: &[ConvoId]) {
        self.triggers.clear();
        let mut next_slot: FxHashMap<GroupId, usize> = FxHashMap::default();

        for record in pool.iter().filter(|record| selected.contains(&record.id)) {
            let position = match self.locations.get(record.group) {
                Some(location) if !location.trigger_spawns.is_empty() => {
                    let slot = next_slot.entry(record.group).or_insert(0);
                    let position = location.trigger_spawns[*slot % location.trigger_spawns.len()];
                    *slot += 1;
                    position
                }
                _ => {
                    log::warn!(
                        "no spawn slots for location {:?}; trigger {} placed at origin",
                        record.group,
                        record.id
                    );
                    (0, 0)
                }
            };
            let mut tags: Vec<u32> = record.tags.iter().copied().collect();
            tags.sort_unstable();
            self.triggers.push(Trigger {
                encounter_id: record.id.clone(),
                tags,
                location: record.group,
                position,
            });
        }
        log::debug!("placed {} trigger(s)", self.triggers.len());
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Triggers standing in one location, for populating the active map.
    pub fn triggers_at(&self, location: GroupId) -> impl Iterator<Item = &Trigger> {
        self.triggers
            .iter()
            .filter(move |trigger| trigger.location == location)
    }

    pub fn trigger(&self, id: &ConvoId) -> Option<&Trigger> {
        self.triggers
            .iter()
            .find(|trigger| trigger.encounter_id == *id)
    }

    pub fn is_session_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        self.active.as_mut()
    }

    /// Activate a trigger: resolve its dialogue rows, normalize them, and
    /// start playback. Refused while any session runs — double taps on the
    /// same trigger and taps on a second trigger both land here.
    pub fn start_encounter<S: Stage>(
        &mut self,
        id: &ConvoId,
        rows: &[DialogueRow],
        stage: &mut S,
        now_ms: u64,
    ) -> Result<&mut Session, EncounterError> {
        if self.active.is_some() {
            log::debug!("refusing encounter {}: a session is already active", id);
            return Err(EncounterError::AlreadyActive);
        }

        let script = DialogueScript::normalize(rows, &id.0)?;
        let mut playback = Playback::new(script);
        playback.start(stage, now_ms);

        log::debug!("encounter {} started", id);
        Ok(self.active.insert(Session {
            encounter_id: id.clone(),
            playback,
        }))
    }

    /// Close the active session: cancel its pending work, release its
    /// sprites, and free the guard. Returns how it ended, or `None` when
    /// nothing was active.
    pub fn close_active<S: Stage>(&mut self, stage: &mut S) -> Option<SessionOutcome> {
        let mut session = self.active.take()?;
        let outcome = if session.playback.state() == PlaybackState::Ended {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Dismissed
        };
        session.playback.close(stage);
        log::debug!("encounter {} closed: {:?}", session.encounter_id, outcome);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stage::CommandStage;
    use crate::schema::location::Location;

    fn locations() -> LocationRegistry {
        let mut registry = LocationRegistry::new();
        registry.register(Location {
            id: GroupId(1),
            name: "Old Market".to_string(),
            spawn_point: (500, 500),
            trigger_spawns: vec![(100, 600), (200, 600)],
        });
        registry
    }

    fn record(id: &str, tags: &[u32], group: u32) -> ConversationRecord {
        ConversationRecord {
            id: ConvoId::from(id),
            tags: tags.iter().copied().collect(),
            group: GroupId(group),
        }
    }

    fn dialogue_rows(id: &str) -> Vec<DialogueRow> {
        vec![DialogueRow {
            encounter_id: id.to_string(),
            talksprite_id: "mira.png".to_string(),
            speaker: "Mira".to_string(),
            dialogue: "Hey.".to_string(),
            ..DialogueRow::default()
        }]
    }

    #[test]
    fn spawn_slots_cycle() {
        let pool = vec![
            record("a", &[1], 1),
            record("b", &[2], 1),
            record("c", &[3], 1),
        ];
        let selected: Vec<ConvoId> =
            ["a", "b", "c"].into_iter().map(ConvoId::from).collect();
        let mut registry = TriggerRegistry::new(locations());
        registry.populate(&pool, &selected);

        let positions: Vec<_> = registry.triggers().iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![(100, 600), (200, 600), (100, 600)]);
    }

    #[test]
    fn populate_keeps_only_selected() {
        let pool = vec![record("a", &[1], 1), record("b", &[2], 1)];
        let mut registry = TriggerRegistry::new(locations());
        registry.populate(&pool, &[ConvoId::from("b")]);
        assert_eq!(registry.triggers().len(), 1);
        assert_eq!(registry.triggers()[0].encounter_id, ConvoId::from("b"));
    }

    #[test]
    fn second_activation_is_refused() {
        let mut registry = TriggerRegistry::new(locations());
        let rows = dialogue_rows("a");
        let mut stage = CommandStage::new();

        registry
            .start_encounter(&ConvoId::from("a"), &rows, &mut stage, 0)
            .unwrap();
        let err = registry
            .start_encounter(&ConvoId::from("a"), &rows, &mut stage, 0)
            .unwrap_err();
        assert!(matches!(err, EncounterError::AlreadyActive));

        registry.close_active(&mut stage);
        assert!(registry
            .start_encounter(&ConvoId::from("a"), &rows, &mut stage, 0)
            .is_ok());
    }

    #[test]
    fn missing_dialogue_is_no_matching_data() {
        let mut registry = TriggerRegistry::new(locations());
        let mut stage = CommandStage::new();
        let err = registry
            .start_encounter(&ConvoId::from("ghost"), &dialogue_rows("a"), &mut stage, 0)
            .unwrap_err();
        assert!(matches!(err, EncounterError::NoMatchingData(id) if id == "ghost"));
        assert!(!registry.is_session_active());
    }

    #[test]
    fn marker_layout_centers_and_flips() {
        let slots = marker_layout(500, 3);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].x, 375);
        assert_eq!(slots[1].x, 500);
        assert_eq!(slots[2].x, 625);
        assert!(slots[0].flipped && slots[1].flipped && !slots[2].flipped);
        assert!(slots[0].foreground && !slots[1].foreground);

        let pair = marker_layout(500, 2);
        assert!(pair[0].flipped && !pair[1].flipped);

        let solo = marker_layout(500, 1);
        assert_eq!(solo[0].x, 500);
        assert!(!solo[0].flipped);
    }
}
