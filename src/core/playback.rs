//! Dialogue playback — step sequencing, typewriter reveal, and character
//! staging for one encounter session.
//!
//! The host owns the clock and the input device: player taps come in
//! through [`Playback::advance`], frame time through [`Playback::tick`],
//! and cancellation through [`Playback::close`]. Nothing here blocks,
//! sleeps, or spawns; deferred work is plain data fired by a later tick.

use rustc_hash::FxHashMap;

use crate::core::script::DialogueScript;
use crate::core::stage::{MoveOpts, MoveStyle, Stage};
use crate::schema::step::{Animation, DialogueStep, Direction, SpriteKey, SLOT_MIDDLE_X};

/// Milliseconds per typewriter character.
pub const TYPE_INTERVAL_MS: u64 = 30;
/// Delay between entering a step and its quick-exit firing.
pub const QUICK_EXIT_DELAY_MS: u64 = 300;
/// Logical stage width. The scene renders in a fixed 1000-unit space.
pub const STAGE_WIDTH: i32 = 1000;
/// Sprites are fitted into a 300-unit box; offset by this much to put one
/// fully off-screen.
pub const OFF_STAGE_MARGIN: i32 = 300;

/// Where a playback session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Between steps. Entering a step happens from here.
    Idle,
    /// Text is being revealed one character per tick interval.
    Typing,
    /// Full text shown; waiting for the player.
    AwaitingAdvance,
    /// Terminal: the script is exhausted or the session was closed.
    Ended,
}

/// What an `advance` input meant to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AdvanceOutcome {
    /// The dialogue consumed the input (revealed text or moved a step).
    Consumed,
    /// The script had already ended; the host should close the session.
    CloseRequested,
}

/// Screen state of one character sprite, owned by the session. Created on
/// first reference, mutated in place afterwards, released on quick-exit or
/// session close.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSpriteState {
    pub key: SpriteKey,
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    pub alpha: f32,
    pub angle: f32,
}

/// A scheduled sprite departure. Sitting in the queue is what "scheduled"
/// means; removal is cancellation.
#[derive(Debug, Clone, PartialEq)]
struct PendingExit {
    due_at_ms: u64,
    key: SpriteKey,
    direction: Direction,
}

/// Plays one [`DialogueScript`] to its end.
pub struct Playback {
    script: DialogueScript,
    cursor: usize,
    state: PlaybackState,
    sprites: FxHashMap<SpriteKey, CharacterSpriteState>,
    pending_exits: Vec<PendingExit>,
    text_chars: Vec<char>,
    revealed_chars: usize,
    typing_started_ms: u64,
    current_speaker: Option<String>,
}

impl Playback {
    /// A fresh session over a normalized script. Call [`Playback::start`]
    /// to present the first step.
    pub fn new(script: DialogueScript) -> Playback {
        Playback {
            script,
            cursor: 0,
            state: PlaybackState::Idle,
            sprites: FxHashMap::default(),
            pending_exits: Vec::new(),
            text_chars: Vec::new(),
            revealed_chars: 0,
            typing_started_ms: 0,
            current_speaker: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn script(&self) -> &DialogueScript {
        &self.script
    }

    /// Index of the step currently presented (or about to be).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The sprite state the session owns for `key`, if any.
    pub fn sprite(&self, key: &SpriteKey) -> Option<&CharacterSpriteState> {
        self.sprites.get(key)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Present the first step. Does nothing once the session has begun.
    pub fn start<S: Stage>(&mut self, stage: &mut S, now_ms: u64) {
        if self.state == PlaybackState::Idle && self.cursor == 0 {
            self.enter_step(stage, now_ms);
        }
    }

    /// Player input.
    ///
    /// Mid-`Typing` this force-completes the reveal — the one externally
    /// triggered transition besides normal advancement. In
    /// `AwaitingAdvance` it moves to the next step. After the end it asks
    /// the host to close the session instead.
    pub fn advance<S: Stage>(&mut self, stage: &mut S, now_ms: u64) -> AdvanceOutcome {
        match self.state {
            PlaybackState::Typing => {
                self.finish_typing(stage);
                AdvanceOutcome::Consumed
            }
            PlaybackState::AwaitingAdvance => {
                self.cursor += 1;
                self.enter_step(stage, now_ms);
                AdvanceOutcome::Consumed
            }
            PlaybackState::Idle => {
                // Not started yet; treat the tap as the opening advance.
                self.enter_step(stage, now_ms);
                AdvanceOutcome::Consumed
            }
            PlaybackState::Ended => AdvanceOutcome::CloseRequested,
        }
    }

    /// Clock input. Fires due quick-exits and typewriter reveals; a tick
    /// with nothing due is free.
    pub fn tick<S: Stage>(&mut self, stage: &mut S, now_ms: u64) {
        self.fire_due_exits(stage, now_ms);

        if self.state != PlaybackState::Typing {
            return;
        }
        let elapsed = now_ms.saturating_sub(self.typing_started_ms);
        let target = ((elapsed / TYPE_INTERVAL_MS) as usize).min(self.text_chars.len());
        if target > self.revealed_chars {
            self.revealed_chars = target;
            let text: String = self.text_chars[..target].iter().collect();
            stage.reveal_text(self.current_speaker.as_deref(), &text);
            if target == self.text_chars.len() {
                self.state = PlaybackState::AwaitingAdvance;
            }
        }
    }

    /// External cancellation: drop all pending timers, then release every
    /// owned sprite. Terminal — the session cannot restart.
    pub fn close<S: Stage>(&mut self, stage: &mut S) {
        self.pending_exits.clear();
        for key in self.sprites.keys() {
            stage.destroy_visual(key);
        }
        self.sprites.clear();
        self.text_chars.clear();
        self.revealed_chars = 0;
        self.state = PlaybackState::Ended;
        log::debug!("playback for encounter {} closed", self.script.encounter_id());
    }

    /// Enter the step under the cursor, auto-advancing through silent
    /// staging beats until a speaking step (or the end) is reached.
    fn enter_step<S: Stage>(&mut self, stage: &mut S, now_ms: u64) {
        loop {
            let Some(step) = self.script.steps().get(self.cursor).cloned() else {
                log::debug!("script {} exhausted", self.script.encounter_id());
                self.state = PlaybackState::Ended;
                return;
            };

            self.present_sprite(stage, &step);

            if let Some(direction) = step.quick_enter {
                self.slide_in(stage, &step.sprite, direction);
            }

            if step.text.trim().is_empty() {
                // Silent beat: apply any exit now and move straight on.
                // Typing never starts.
                if let Some(direction) = step.quick_exit {
                    self.run_exit(stage, &step.sprite, direction);
                }
                self.cursor += 1;
                continue;
            }

            if let Some(direction) = step.quick_exit {
                // Deferred so the character is seen before leaving,
                // independent of typing progress.
                self.pending_exits.push(PendingExit {
                    due_at_ms: now_ms + QUICK_EXIT_DELAY_MS,
                    key: step.sprite.clone(),
                    direction,
                });
            }

            self.current_speaker = step.speaker.clone();
            self.text_chars = step.text.chars().collect();
            self.revealed_chars = 0;
            self.typing_started_ms = now_ms;
            self.state = PlaybackState::Typing;
            stage.reveal_text(self.current_speaker.as_deref(), "");
            return;
        }
    }

    /// Create the step's sprite on first reference, or re-stage the
    /// existing one: glide on a position change, play the named animation
    /// in place, or bob for attention when neither applies.
    fn present_sprite<S: Stage>(&mut self, stage: &mut S, step: &DialogueStep) {
        let key = &step.sprite;

        if !self.sprites.contains_key(key) {
            let x = step.x.unwrap_or_else(|| {
                log::warn!("no position for new sprite {:?}; centering it", key);
                SLOT_MIDDLE_X
            });
            // A stale departure must not take the replacement with it.
            self.pending_exits.retain(|exit| exit.key != *key);
            stage.place_or_move(key, x, step.y, MoveOpts::instant());
            self.sprites.insert(
                key.clone(),
                CharacterSpriteState {
                    key: key.clone(),
                    x,
                    y: step.y,
                    visible: true,
                    alpha: 1.0,
                    angle: 0.0,
                },
            );
            return;
        }

        let Some(sprite) = self.sprites.get_mut(key) else {
            return;
        };
        // Leftover directive state from earlier steps is wiped before new
        // staging applies.
        sprite.angle = 0.0;
        sprite.alpha = 1.0;
        sprite.visible = true;

        let new_x = step.x.unwrap_or(sprite.x);
        let new_y = step.y;
        let moved = new_x != sprite.x || new_y != sprite.y;
        if moved {
            sprite.x = new_x;
            sprite.y = new_y;
            stage.place_or_move(key, new_x, new_y, MoveOpts::glide());
        }

        match step.animation {
            Some(Animation::Unknown) => {
                log::debug!("skipping unrecognized animation on {:?}", key);
            }
            Some(animation) => stage.play_directive(key, animation),
            None if !moved => stage.play_directive(key, Animation::Bounce),
            None => {}
        }
    }

    /// Entrance: snap off the named edge, then travel to the resolved
    /// position while fading up.
    fn slide_in<S: Stage>(&mut self, stage: &mut S, key: &SpriteKey, direction: Direction) {
        let Some(sprite) = self.sprites.get_mut(key) else {
            return;
        };
        let start_x = off_stage_x(direction);
        sprite.visible = true;
        sprite.alpha = 1.0;
        stage.place_or_move(
            key,
            start_x,
            sprite.y,
            MoveOpts {
                style: MoveStyle::Instant,
                fade_to: Some(0.0),
            },
        );
        stage.place_or_move(key, sprite.x, sprite.y, MoveOpts::slide_fading_to(1.0));
    }

    /// Departure: travel off the named edge fading out, then release the
    /// owned state entirely. The next reference to the key starts fresh.
    fn run_exit<S: Stage>(&mut self, stage: &mut S, key: &SpriteKey, direction: Direction) {
        let Some(sprite) = self.sprites.remove(key) else {
            return;
        };
        stage.place_or_move(key, off_stage_x(direction), sprite.y, MoveOpts::slide_fading_to(0.0));
        stage.destroy_visual(key);
        log::debug!("sprite {:?} departed {:?}", key, direction);
    }

    fn fire_due_exits<S: Stage>(&mut self, stage: &mut S, now_ms: u64) {
        let mut i = 0;
        while i < self.pending_exits.len() {
            if self.pending_exits[i].due_at_ms <= now_ms {
                let exit = self.pending_exits.remove(i);
                self.run_exit(stage, &exit.key, exit.direction);
            } else {
                i += 1;
            }
        }
    }

    fn finish_typing<S: Stage>(&mut self, stage: &mut S) {
        self.revealed_chars = self.text_chars.len();
        let text: String = self.text_chars.iter().collect();
        stage.reveal_text(self.current_speaker.as_deref(), &text);
        self.state = PlaybackState::AwaitingAdvance;
    }
}

fn off_stage_x(direction: Direction) -> i32 {
    match direction {
        Direction::Left => -OFF_STAGE_MARGIN,
        Direction::Right => STAGE_WIDTH + OFF_STAGE_MARGIN,
    }
}
