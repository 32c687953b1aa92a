//! Dialogue steps — one sheet row normalized into a line/beat with its
//! staging directives.

use serde::{Deserialize, Serialize};

use super::row::DialogueRow;

/// Horizontal screen edge a sprite enters from or exits toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Parse a sheet cell. Empty means "no directive"; anything that is
    /// neither edge name is treated the same, with a diagnostic.
    pub fn parse(cell: &str) -> Option<Direction> {
        match cell.trim().to_uppercase().as_str() {
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            "" => None,
            other => {
                log::warn!("unknown direction {:?}; ignoring directive", other);
                None
            }
        }
    }
}

/// In-place sprite animation named by the sheet's animation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    Shake,
    Scale,
    Fade,
    NudgeLeft,
    NudgeRight,
    ResetNow,
    /// Small attention bob played when a speaking sprite neither moves nor
    /// carries a directive. Never produced by parsing.
    Bounce,
    /// The cell named an animation nobody implements. Plays as a no-op so a
    /// typo in the sheet never stops the scene.
    Unknown,
}

impl Animation {
    /// Parse a sheet cell. Empty means "no animation".
    pub fn parse(cell: &str) -> Option<Animation> {
        match cell.trim().to_uppercase().as_str() {
            "SHAKE" => Some(Animation::Shake),
            "SCALE" => Some(Animation::Scale),
            "FADE" => Some(Animation::Fade),
            "NUDGE_LEFT" => Some(Animation::NudgeLeft),
            "NUDGE_RIGHT" => Some(Animation::NudgeRight),
            "RESET_NOW" => Some(Animation::ResetNow),
            "" => None,
            other => {
                log::warn!("unknown animation {:?}; it will play as a no-op", other);
                Some(Animation::Unknown)
            }
        }
    }

    /// Stable name for logs and hosts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shake => "shake",
            Self::Scale => "scale",
            Self::Fade => "fade",
            Self::NudgeLeft => "nudge_left",
            Self::NudgeRight => "nudge_right",
            Self::ResetNow => "reset_now",
            Self::Bounce => "bounce",
            Self::Unknown => "unknown",
        }
    }
}

/// Key a sprite source resolves to. Identical sources share a key, so the
/// host loads each asset once however many rows reference it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteKey(pub String);

impl SpriteKey {
    pub fn from_source(source: &str) -> SpriteKey {
        SpriteKey(format!("sprite_{}", source))
    }
}

/// Named-slot x anchors. The sheet names slots from the characters' side of
/// the scene, so LEFT sits at the larger x.
pub const SLOT_LEFT_X: i32 = 666;
pub const SLOT_RIGHT_X: i32 = 333;
pub const SLOT_MIDDLE_X: i32 = 500;
/// Baseline y when the sheet gives none.
pub const BASELINE_Y: i32 = 400;

/// One line/beat of dialogue with its staging directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueStep {
    pub speaker: Option<String>,
    pub text: String,
    pub sprite: SpriteKey,
    /// Resolved x, or `None` to keep the sprite where it stands.
    pub x: Option<i32>,
    pub y: i32,
    pub quick_enter: Option<Direction>,
    pub quick_exit: Option<Direction>,
    pub animation: Option<Animation>,
}

impl DialogueStep {
    /// Normalize one sheet row. Never fails: malformed cells degrade to
    /// the documented defaults.
    ///
    /// Position resolution: a numeric `x_position` wins; otherwise the
    /// named slot maps LEFT→666, RIGHT→333, MIDDLE→500; otherwise x stays
    /// unresolved. y falls back to the 400 baseline.
    pub fn from_row(row: &DialogueRow) -> DialogueStep {
        let x = match row.x_position.trim().parse::<i32>() {
            Ok(value) => Some(value),
            Err(_) => match row.default_position.trim().to_uppercase().as_str() {
                "LEFT" => Some(SLOT_LEFT_X),
                "RIGHT" => Some(SLOT_RIGHT_X),
                "MIDDLE" => Some(SLOT_MIDDLE_X),
                "" => None,
                other => {
                    log::warn!(
                        "unknown default_position {:?} in encounter {}; keeping sprite position",
                        other,
                        row.encounter_id
                    );
                    None
                }
            },
        };
        let y = row.y_position.trim().parse::<i32>().unwrap_or(BASELINE_Y);

        let speaker = match row.speaker.trim() {
            "" => None,
            name => Some(name.to_string()),
        };

        DialogueStep {
            speaker,
            text: row.dialogue.clone(),
            sprite: SpriteKey::from_source(&row.talksprite_id),
            x,
            y,
            quick_enter: Direction::parse(&row.quick_enter),
            quick_exit: Direction::parse(&row.quick_escape),
            animation: Animation::parse(&row.animation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_row() -> DialogueRow {
        DialogueRow {
            encounter_id: "1".to_string(),
            talksprite_id: "mira.png".to_string(),
            speaker: "Mira".to_string(),
            dialogue: "Morning!".to_string(),
            ..DialogueRow::default()
        }
    }

    #[test]
    fn numeric_position_wins_over_slot() {
        let mut row = base_row();
        row.x_position = "120".to_string();
        row.default_position = "LEFT".to_string();
        let step = DialogueStep::from_row(&row);
        assert_eq!(step.x, Some(120));
    }

    #[test]
    fn slot_fallback_when_not_numeric() {
        let mut row = base_row();
        row.default_position = "LEFT".to_string();
        assert_eq!(DialogueStep::from_row(&row).x, Some(SLOT_LEFT_X));
        row.default_position = "right".to_string();
        assert_eq!(DialogueStep::from_row(&row).x, Some(SLOT_RIGHT_X));
        row.default_position = "MIDDLE".to_string();
        assert_eq!(DialogueStep::from_row(&row).x, Some(SLOT_MIDDLE_X));
    }

    #[test]
    fn absent_position_stays_unresolved() {
        let step = DialogueStep::from_row(&base_row());
        assert_eq!(step.x, None);
        assert_eq!(step.y, BASELINE_Y);
    }

    #[test]
    fn unknown_slot_stays_unresolved() {
        let mut row = base_row();
        row.default_position = "CENTER_STAGE".to_string();
        assert_eq!(DialogueStep::from_row(&row).x, None);
    }

    #[test]
    fn y_parses_or_defaults() {
        let mut row = base_row();
        row.y_position = "250".to_string();
        assert_eq!(DialogueStep::from_row(&row).y, 250);
        row.y_position = "tall".to_string();
        assert_eq!(DialogueStep::from_row(&row).y, BASELINE_Y);
    }

    #[test]
    fn directions_and_animations_parse_case_insensitively() {
        let mut row = base_row();
        row.quick_enter = "left".to_string();
        row.quick_escape = "RIGHT".to_string();
        row.animation = "shake".to_string();
        let step = DialogueStep::from_row(&row);
        assert_eq!(step.quick_enter, Some(Direction::Left));
        assert_eq!(step.quick_exit, Some(Direction::Right));
        assert_eq!(step.animation, Some(Animation::Shake));
    }

    #[test]
    fn unknown_animation_becomes_unknown_not_none() {
        let mut row = base_row();
        row.animation = "BACKFLIP".to_string();
        assert_eq!(DialogueStep::from_row(&row).animation, Some(Animation::Unknown));
        row.animation = String::new();
        assert_eq!(DialogueStep::from_row(&row).animation, None);
    }

    #[test]
    fn blank_speaker_is_none() {
        let mut row = base_row();
        row.speaker = "  ".to_string();
        assert_eq!(DialogueStep::from_row(&row).speaker, None);
    }

    #[test]
    fn same_source_same_key() {
        let a = SpriteKey::from_source("mira.png");
        let b = SpriteKey::from_source("mira.png");
        assert_eq!(a, b);
    }
}
