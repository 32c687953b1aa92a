//! Renderer seam — the abstract operations playback drives. A host
//! implements [`Stage`] over whatever actually draws; the engine never
//! draws anything itself.

use serde::{Deserialize, Serialize};

use crate::schema::step::{Animation, SpriteKey};

/// How a visual travels to a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStyle {
    /// Appear at the target with no transition.
    Instant,
    /// Short eased glide between on-stage positions.
    Glide,
    /// Longer travel used for entrances and exits.
    Slide,
}

/// Options accompanying a placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveOpts {
    pub style: MoveStyle,
    /// Alpha the visual should reach by the end of the move, when the move
    /// also fades.
    pub fade_to: Option<f32>,
}

impl MoveOpts {
    pub fn instant() -> MoveOpts {
        MoveOpts {
            style: MoveStyle::Instant,
            fade_to: None,
        }
    }

    pub fn glide() -> MoveOpts {
        MoveOpts {
            style: MoveStyle::Glide,
            fade_to: None,
        }
    }

    pub fn slide_fading_to(alpha: f32) -> MoveOpts {
        MoveOpts {
            style: MoveStyle::Slide,
            fade_to: Some(alpha),
        }
    }
}

/// What playback asks of a renderer.
pub trait Stage {
    /// Put the visual for `key` at (`x`, `y`), creating it on first
    /// reference.
    fn place_or_move(&mut self, key: &SpriteKey, x: i32, y: i32, opts: MoveOpts);
    /// Play a named in-place animation on the visual.
    fn play_directive(&mut self, key: &SpriteKey, animation: Animation);
    /// Remove the visual entirely.
    fn destroy_visual(&mut self, key: &SpriteKey);
    /// Present the dialogue text revealed so far, with its speaker label.
    fn reveal_text(&mut self, speaker: Option<&str>, text: &str);
}

/// One recorded renderer call, for hosts that consume a command list
/// instead of implementing [`Stage`] directly (tests, the WASM boundary,
/// the terminal preview).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageCommand {
    PlaceOrMove {
        key: SpriteKey,
        x: i32,
        y: i32,
        opts: MoveOpts,
    },
    PlayDirective {
        key: SpriteKey,
        animation: Animation,
    },
    DestroyVisual {
        key: SpriteKey,
    },
    RevealText {
        speaker: Option<String>,
        text: String,
    },
}

/// A [`Stage`] that buffers every call as a [`StageCommand`].
#[derive(Debug, Default)]
pub struct CommandStage {
    commands: Vec<StageCommand>,
}

impl CommandStage {
    pub fn new() -> CommandStage {
        CommandStage::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn commands(&self) -> &[StageCommand] {
        &self.commands
    }

    /// Hand the buffer to the host and start a fresh one.
    pub fn drain(&mut self) -> Vec<StageCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Stage for CommandStage {
    fn place_or_move(&mut self, key: &SpriteKey, x: i32, y: i32, opts: MoveOpts) {
        self.commands.push(StageCommand::PlaceOrMove {
            key: key.clone(),
            x,
            y,
            opts,
        });
    }

    fn play_directive(&mut self, key: &SpriteKey, animation: Animation) {
        self.commands.push(StageCommand::PlayDirective {
            key: key.clone(),
            animation,
        });
    }

    fn destroy_visual(&mut self, key: &SpriteKey) {
        self.commands.push(StageCommand::DestroyVisual { key: key.clone() });
    }

    fn reveal_text(&mut self, speaker: Option<&str>, text: &str) {
        self.commands.push(StageCommand::RevealText {
            speaker: speaker.map(|s| s.to_string()),
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_stage_records_and_drains() {
        let key = SpriteKey::from_source("mira.png");
        let mut stage = CommandStage::new();
        stage.place_or_move(&key, 500, 400, MoveOpts::instant());
        stage.play_directive(&key, Animation::Shake);
        stage.reveal_text(Some("Mira"), "Hi");
        stage.destroy_visual(&key);

        assert_eq!(stage.commands().len(), 4);
        let drained = stage.drain();
        assert_eq!(drained.len(), 4);
        assert!(stage.commands().is_empty());
        assert!(matches!(
            &drained[2],
            StageCommand::RevealText { speaker: Some(s), text } if s == "Mira" && text == "Hi"
        ));
    }
}
