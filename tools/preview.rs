/// Preview — interactive terminal shell for a day in the sample town.
///
/// Usage: preview [--data-dir <dir>] [--seed <n>] [--max-per-location <n>] [--tags <t1,t2,...>]
///
/// Commands:
///   list                — show placed triggers per location
///   play <encounter-id> — run one encounter (Enter advances, 'x' dismisses)
///   reroll              — run selection again over the same pool
///   seed <n>            — reset the RNG seed
///   help                — list commands
///   quit                — exit

use std::io::{self, BufRead, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use encounter_engine::core::playback::AdvanceOutcome;
use encounter_engine::core::registry::{marker_layout, EncounterError, TriggerRegistry};
use encounter_engine::core::select::select;
use encounter_engine::core::stage::{CommandStage, MoveStyle, StageCommand};
use encounter_engine::schema::location::LocationRegistry;
use encounter_engine::schema::record::{ConversationRecord, ConvoId, SelectionTarget};
use encounter_engine::schema::row::{filter_short_rows, load_convo_rows, DialogueRow};

/// Preview collapses real-time pacing: every interaction jumps the virtual
/// clock far enough to finish any typing and fire any pending exits.
const CLOCK_JUMP_MS: u64 = 10_000;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut data_dir = "sample_data".to_string();
    let mut seed: u64 = 42;
    let mut max_per_location: u32 = 2;
    let mut tags: Vec<u32> = (1..=12).collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data-dir" if i + 1 < args.len() => {
                i += 1;
                data_dir = args[i].clone();
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--max-per-location" if i + 1 < args.len() => {
                i += 1;
                max_per_location = args[i].parse().unwrap_or(2);
            }
            "--tags" if i + 1 < args.len() => {
                i += 1;
                tags = args[i]
                    .split(',')
                    .filter_map(|piece| piece.trim().parse().ok())
                    .collect();
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let locations =
        match LocationRegistry::load_from_ron(&Path::new(&data_dir).join("locations.ron")) {
            Ok(locations) => locations,
            Err(e) => fail_unavailable(e),
        };
    let pool = match load_convo_rows(&Path::new(&data_dir).join("convo_list.ron")) {
        Ok(raw) => ConversationRecord::parse_pool(&filter_short_rows(raw)),
        Err(e) => fail_unavailable(e),
    };
    let dialogue = match DialogueRow::load_from_ron(&Path::new(&data_dir).join("dialogue.ron")) {
        Ok(rows) => rows,
        Err(e) => fail_unavailable(e),
    };

    println!(
        "Loaded {} location(s), {} conversation(s), {} dialogue row(s)",
        locations.len(),
        pool.len(),
        dialogue.len()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let target = SelectionTarget::new(tags, max_per_location);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut registry = TriggerRegistry::new(locations);
    run_selection(&pool, &target, &mut rng, &mut registry);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0].to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "list" => list_triggers(&registry),
            "reroll" => run_selection(&pool, &target, &mut rng, &mut registry),
            "seed" => {
                if let Some(value) = parts.get(1).and_then(|s| s.parse().ok()) {
                    rng = StdRng::seed_from_u64(value);
                    println!("Seed set to {}", value);
                } else {
                    println!("Usage: seed <n>");
                }
            }
            "play" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: play <encounter-id>");
                    continue;
                };
                play_encounter(&mut registry, &dialogue, &ConvoId::from(*id), &stdin);
            }
            other => println!("Unknown command: {} (try 'help')", other),
        }
    }
}

fn run_selection(
    pool: &[ConversationRecord],
    target: &SelectionTarget,
    rng: &mut StdRng,
    registry: &mut TriggerRegistry,
) {
    match select(pool, target, rng) {
        Some(ids) => {
            registry.populate(pool, &ids);
            println!("Selected {} conversation(s) for the day.", ids.len());
            list_triggers(registry);
        }
        None => {
            // The retry path: the pool stays loaded, the shell stays up.
            println!("{}", EncounterError::NoFeasibleSelection);
            println!("Try 'reroll', or restart with fewer --tags or a higher --max-per-location.");
        }
    }
}

fn list_triggers(registry: &TriggerRegistry) {
    for location_id in registry.locations().ids() {
        let name = registry
            .locations()
            .get(location_id)
            .map(|location| location.name.as_str())
            .unwrap_or("?");
        let triggers: Vec<_> = registry.triggers_at(location_id).collect();
        if triggers.is_empty() {
            continue;
        }
        println!("{} —", name);
        for trigger in triggers {
            let markers = marker_layout(trigger.position.0, trigger.tags.len().max(1));
            println!(
                "  encounter {} at {:?}, tags {:?}, {} marker(s)",
                trigger.encounter_id,
                trigger.position,
                trigger.tags,
                markers.len()
            );
        }
    }
}

fn play_encounter(
    registry: &mut TriggerRegistry,
    dialogue: &[DialogueRow],
    id: &ConvoId,
    stdin: &io::Stdin,
) {
    let mut stage = CommandStage::new();
    let mut now: u64 = 0;

    if let Err(e) = registry.start_encounter(id, dialogue, &mut stage, now) {
        println!("Cannot start encounter: {}", e);
        return;
    }
    println!("--- encounter {} (Enter advances, 'x' dismisses) ---", id);

    loop {
        now += CLOCK_JUMP_MS;
        if let Some(session) = registry.active_session_mut() {
            session.playback_mut().tick(&mut stage, now);
        }
        print_commands(stage.drain());

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        if line.trim().eq_ignore_ascii_case("x") {
            break;
        }

        let Some(session) = registry.active_session_mut() else {
            break;
        };
        match session.playback_mut().advance(&mut stage, now) {
            AdvanceOutcome::Consumed => {}
            AdvanceOutcome::CloseRequested => break,
        }
    }

    if let Some(outcome) = registry.close_active(&mut stage) {
        print_commands(stage.drain());
        println!("--- session over: {:?} ---", outcome);
    }
}

fn print_commands(commands: Vec<StageCommand>) {
    for command in commands {
        match command {
            StageCommand::PlaceOrMove { key, x, y, opts } => {
                let verb = match opts.style {
                    MoveStyle::Instant => "appears at",
                    MoveStyle::Glide => "glides to",
                    MoveStyle::Slide => "slides to",
                };
                let fade = match opts.fade_to {
                    Some(alpha) if alpha == 0.0 => ", fading out",
                    Some(_) => ", fading in",
                    None => "",
                };
                println!("  [{} {} ({}, {}){}]", key.0, verb, x, y, fade);
            }
            StageCommand::PlayDirective { key, animation } => {
                println!("  [{} plays {}]", key.0, animation.name());
            }
            StageCommand::DestroyVisual { key } => {
                println!("  [{} leaves the stage]", key.0);
            }
            StageCommand::RevealText { speaker, text } => {
                if text.is_empty() {
                    continue;
                }
                match speaker {
                    Some(name) => println!("{}: {}", name, text),
                    None => println!("{}", text),
                }
            }
        }
    }
}

fn fail_unavailable<T>(err: impl std::fmt::Display) -> T {
    eprintln!("ERROR: {}", EncounterError::DataUnavailable(err.to_string()));
    std::process::exit(1);
}

fn print_usage() {
    println!("Usage: preview [--data-dir <dir>] [--seed <n>] [--max-per-location <n>] [--tags <t1,t2,...>]");
}

fn print_help() {
    println!("  list                — show placed triggers per location");
    println!("  play <encounter-id> — run one encounter (Enter advances, 'x' dismisses)");
    println!("  reroll              — run selection again over the same pool");
    println!("  seed <n>            — reset the RNG seed");
    println!("  quit                — exit");
}
