/// Market Day demo — the whole pipeline, start to finish.
///
/// Loads the sample town, selects a day's worth of conversations, places
/// triggers, then auto-plays the first encounter in the Old Market.
///
/// Run with: cargo run --example market_day

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use encounter_engine::core::playback::AdvanceOutcome;
use encounter_engine::core::registry::TriggerRegistry;
use encounter_engine::core::select::select;
use encounter_engine::core::stage::{CommandStage, StageCommand};
use encounter_engine::schema::location::LocationRegistry;
use encounter_engine::schema::record::{ConversationRecord, GroupId, SelectionTarget};
use encounter_engine::schema::row::{filter_short_rows, load_convo_rows, DialogueRow};

fn main() {
    env_logger::init();

    // --- Load the sample town ---
    let locations = LocationRegistry::load_from_ron(Path::new("sample_data/locations.ron"))
        .expect("Failed to load locations");
    let raw = load_convo_rows(Path::new("sample_data/convo_list.ron"))
        .expect("Failed to load conversation list");
    let pool = ConversationRecord::parse_pool(&filter_short_rows(raw));
    let dialogue = DialogueRow::load_from_ron(Path::new("sample_data/dialogue.ron"))
        .expect("Failed to load dialogue sheet");

    println!(
        "The town wakes up: {} locations, {} conversations in the pool.\n",
        locations.len(),
        pool.len()
    );

    // --- Pick the day's conversations ---
    // Twelve coverage tags, at most two conversations per location. The
    // result varies run to run only through the seed.
    let target = SelectionTarget::new(1..=12, 2);
    let mut rng = StdRng::seed_from_u64(2026);
    let selected = select(&pool, &target, &mut rng).expect("The sample pool is always feasible");

    let mut registry = TriggerRegistry::new(locations);
    registry.populate(&pool, &selected);

    for location_id in registry.locations().ids() {
        let name = registry
            .locations()
            .get(location_id)
            .map(|location| location.name.clone())
            .unwrap_or_default();
        let here: Vec<String> = registry
            .triggers_at(location_id)
            .map(|trigger| trigger.encounter_id.to_string())
            .collect();
        if !here.is_empty() {
            println!("{}: encounter(s) {}", name, here.join(", "));
        }
    }

    // --- Walk up to the first trigger in the Old Market and tap it ---
    let Some(first) = registry
        .triggers_at(GroupId(1))
        .next()
        .or_else(|| registry.triggers().first())
        .cloned()
    else {
        println!("\nNobody is out today.");
        return;
    };
    println!("\nApproaching encounter {} at {:?}...\n", first.encounter_id, first.position);

    let mut stage = CommandStage::new();
    let mut now: u64 = 0;
    registry
        .start_encounter(&first.encounter_id, &dialogue, &mut stage, now)
        .expect("Selected conversations always have dialogue");

    // Auto-advance: jump the clock past typing and exits, then tap.
    loop {
        now += 10_000;
        let Some(session) = registry.active_session_mut() else {
            break;
        };
        session.playback_mut().tick(&mut stage, now);
        print_transcript(stage.drain());

        match session.playback_mut().advance(&mut stage, now) {
            AdvanceOutcome::Consumed => {}
            AdvanceOutcome::CloseRequested => break,
        }
    }

    let outcome = registry.close_active(&mut stage);
    print_transcript(stage.drain());
    println!("\nBack to the map ({:?}).", outcome.expect("a session was active"));
}

fn print_transcript(commands: Vec<StageCommand>) {
    for command in commands {
        match command {
            StageCommand::RevealText { speaker, text } if !text.is_empty() => match speaker {
                Some(name) => println!("  {}: {}", name, text),
                None => println!("  {}", text),
            },
            StageCommand::DestroyVisual { key } => println!("  ({} leaves)", key.0),
            _ => {}
        }
    }
}
