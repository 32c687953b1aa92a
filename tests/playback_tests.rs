//! Playback integration tests — the walkthroughs a host would drive.

use encounter_engine::core::playback::{
    AdvanceOutcome, Playback, PlaybackState, QUICK_EXIT_DELAY_MS, TYPE_INTERVAL_MS,
};
use encounter_engine::core::registry::{EncounterError, SessionOutcome, TriggerRegistry};
use encounter_engine::core::script::DialogueScript;
use encounter_engine::core::stage::{CommandStage, MoveStyle, StageCommand};
use encounter_engine::schema::location::LocationRegistry;
use encounter_engine::schema::record::ConvoId;
use encounter_engine::schema::row::DialogueRow;
use encounter_engine::schema::step::{SpriteKey, SLOT_LEFT_X, SLOT_RIGHT_X};

fn fixture_rows() -> Vec<DialogueRow> {
    DialogueRow::load_from_ron(std::path::Path::new("tests/fixtures/dialogue_rows.ron")).unwrap()
}

fn reveals(stage: &CommandStage) -> Vec<String> {
    stage
        .commands()
        .iter()
        .filter_map(|command| match command {
            StageCommand::RevealText { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn silent_beat_auto_advances_without_typing() {
    let script = DialogueScript::normalize(&fixture_rows(), "7").unwrap();
    let mut playback = Playback::new(script);
    let mut stage = CommandStage::new();

    playback.start(&mut stage, 0);
    // Step 1 types.
    assert_eq!(playback.state(), PlaybackState::Typing);
    assert_eq!(playback.cursor(), 0);
    let _ = playback.advance(&mut stage, 100);
    assert_eq!(playback.state(), PlaybackState::AwaitingAdvance);

    // Advancing lands on step 3 (index 2): the silent second beat staged
    // Osric and moved straight on, with no player input and no Typing
    // state in between.
    let _ = playback.advance(&mut stage, 200);
    assert_eq!(playback.cursor(), 2);
    assert_eq!(playback.state(), PlaybackState::Typing);

    // The silent beat still placed its sprite.
    assert!(playback.sprite(&SpriteKey::from_source("osric.png")).is_some());
    let osric = playback.sprite(&SpriteKey::from_source("osric.png")).unwrap();
    assert_eq!(osric.x, SLOT_RIGHT_X);
}

#[test]
fn typewriter_paces_by_interval_and_force_completes() {
    let script = DialogueScript::normalize(&fixture_rows(), "7").unwrap();
    let mut playback = Playback::new(script);
    let mut stage = CommandStage::new();

    playback.start(&mut stage, 0);
    playback.tick(&mut stage, TYPE_INTERVAL_MS * 3);
    let partial = reveals(&stage);
    assert_eq!(partial.last().map(String::as_str), Some("You"));

    // Mid-typing advance reveals everything at once...
    assert_eq!(playback.advance(&mut stage, 100), AdvanceOutcome::Consumed);
    assert_eq!(
        reveals(&stage).last().map(String::as_str),
        Some("You actually came.")
    );
    assert_eq!(playback.state(), PlaybackState::AwaitingAdvance);

    // ...and the next advance moves on rather than re-typing.
    assert_eq!(playback.advance(&mut stage, 200), AdvanceOutcome::Consumed);
    assert_eq!(playback.cursor(), 2);
}

#[test]
fn end_of_script_routes_advance_to_close() {
    let script = DialogueScript::normalize(&fixture_rows(), "7").unwrap();
    let mut playback = Playback::new(script);
    let mut stage = CommandStage::new();
    let mut now = 0;

    playback.start(&mut stage, now);
    while playback.state() != PlaybackState::Ended {
        now += 10_000;
        let outcome = playback.advance(&mut stage, now);
        assert_eq!(outcome, AdvanceOutcome::Consumed);
    }

    assert_eq!(
        playback.advance(&mut stage, now + 1),
        AdvanceOutcome::CloseRequested
    );
    // Still terminal; input is not dialogue advancement anymore.
    assert_eq!(playback.state(), PlaybackState::Ended);
}

#[test]
fn quick_exit_fires_after_its_delay_and_releases_the_sprite() {
    let script = DialogueScript::normalize(&fixture_rows(), "7").unwrap();
    let mut playback = Playback::new(script);
    let mut stage = CommandStage::new();
    let mira = SpriteKey::from_source("mira.png");

    // Walk to the last step (Mira's line with quick_escape: LEFT).
    playback.start(&mut stage, 0);
    let _ = playback.advance(&mut stage, 10);
    let _ = playback.advance(&mut stage, 20);
    let _ = playback.advance(&mut stage, 30);
    let _ = playback.advance(&mut stage, 40);
    assert_eq!(playback.cursor(), 3);
    assert!(playback.sprite(&mira).is_some());

    stage.drain();
    // Before the delay elapses nothing happens.
    playback.tick(&mut stage, 40 + QUICK_EXIT_DELAY_MS - 1);
    assert!(playback.sprite(&mira).is_some());

    playback.tick(&mut stage, 40 + QUICK_EXIT_DELAY_MS);
    assert!(playback.sprite(&mira).is_none(), "state released on exit");
    let commands = stage.drain();
    assert!(commands.iter().any(|command| matches!(
        command,
        StageCommand::PlaceOrMove { key, x, opts, .. }
            if *key == mira && *x < 0 && opts.style == MoveStyle::Slide
    )));
    assert!(commands
        .iter()
        .any(|command| matches!(command, StageCommand::DestroyVisual { key } if *key == mira)));
}

#[test]
fn quick_enter_starts_off_stage_and_slides_to_slot() {
    let script = DialogueScript::normalize(&fixture_rows(), "7").unwrap();
    let mut playback = Playback::new(script);
    let mut stage = CommandStage::new();

    playback.start(&mut stage, 0);
    let mira = SpriteKey::from_source("mira.png");
    let moves: Vec<_> = stage
        .commands()
        .iter()
        .filter_map(|command| match command {
            StageCommand::PlaceOrMove { key, x, opts, .. } if *key == mira => Some((*x, *opts)),
            _ => None,
        })
        .collect();

    // Placement at the slot, snap off-stage transparent, slide back in.
    assert_eq!(moves.len(), 3);
    assert_eq!(moves[0].0, SLOT_LEFT_X);
    assert!(moves[1].0 < 0);
    assert_eq!(moves[1].1.fade_to, Some(0.0));
    assert_eq!(moves[2].0, SLOT_LEFT_X);
    assert_eq!(moves[2].1.style, MoveStyle::Slide);
    assert_eq!(moves[2].1.fade_to, Some(1.0));
}

#[test]
fn registry_guards_and_closes_a_full_session() {
    let rows = fixture_rows();
    let mut registry = TriggerRegistry::new(LocationRegistry::new());
    let mut stage = CommandStage::new();
    let id = ConvoId::from("7");

    let session = registry
        .start_encounter(&id, &rows, &mut stage, 0)
        .unwrap();
    assert_eq!(session.playback().state(), PlaybackState::Typing);

    // Re-entry refused while active.
    assert!(matches!(
        registry.start_encounter(&ConvoId::from("12"), &rows, &mut stage, 0),
        Err(EncounterError::AlreadyActive)
    ));

    // Play it out.
    let mut now = 0;
    loop {
        now += 10_000;
        let session = registry.active_session_mut().unwrap();
        match session.playback_mut().advance(&mut stage, now) {
            AdvanceOutcome::Consumed => {}
            AdvanceOutcome::CloseRequested => break,
        }
    }
    assert_eq!(
        registry.close_active(&mut stage),
        Some(SessionOutcome::Completed)
    );
    assert!(!registry.is_session_active());

    // Guard released: the other encounter can start now.
    assert!(registry
        .start_encounter(&ConvoId::from("12"), &rows, &mut stage, now)
        .is_ok());
    assert_eq!(
        registry.close_active(&mut stage),
        Some(SessionOutcome::Dismissed)
    );
}
