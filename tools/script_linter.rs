/// Script Linter — validates a dialogue sheet export against the
/// conversation list.
///
/// Usage: script_linter <dialogue.ron> [--convo-list <convo_list.ron>]

use encounter_engine::schema::record::ConversationRecord;
use encounter_engine::schema::row::{filter_short_rows, load_convo_rows, DialogueRow};
use encounter_engine::schema::step::{Animation, DialogueStep};
use std::collections::HashSet;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <dialogue.ron> [--convo-list <convo_list.ron>]");
        process::exit(0);
    }

    let dialogue_path = &args[1];
    let mut convo_list_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--convo-list" && i + 1 < args.len() {
            i += 1;
            convo_list_path = Some(args[i].clone());
        }
        i += 1;
    }

    let rows = match DialogueRow::load_from_ron(Path::new(dialogue_path)) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("ERROR: Failed to load dialogue sheet: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} dialogue row(s)", rows.len());

    let pool = match convo_list_path {
        Some(ref path) => match load_convo_rows(Path::new(path)) {
            Ok(raw) => ConversationRecord::parse_pool(&filter_short_rows(raw)),
            Err(e) => {
                eprintln!("ERROR: Failed to load conversation list: {}", e);
                process::exit(1);
            }
        },
        None => Vec::new(),
    };
    if !pool.is_empty() {
        println!("Loaded {} conversation record(s)", pool.len());
    }

    let (errors, warnings) = lint_rows(&rows, &pool);

    println!("\n=== Script Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    let sources: HashSet<&str> = rows.iter().map(|row| row.talksprite_id.as_str()).collect();
    println!(
        "\nSummary: {} errors, {} warnings, {} distinct sprite source(s)",
        errors.len(),
        warnings.len(),
        sources.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_rows(rows: &[DialogueRow], pool: &[ConversationRecord]) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let line = index + 1;

        if row.encounter_id.trim().is_empty() {
            errors.push(format!("row {}: empty encounter id", line));
        }

        if row.talksprite_id.trim().is_empty() {
            warnings.push(format!("row {}: no sprite source", line));
        }

        // A non-numeric x with no usable slot means the step inherits
        // whatever position the sprite last had — legal, but usually a typo.
        let numeric_x = row.x_position.trim().parse::<i32>().is_ok();
        let slot = row.default_position.trim().to_uppercase();
        if !numeric_x && !row.x_position.trim().is_empty() {
            warnings.push(format!(
                "row {}: x_position {:?} is not numeric",
                line, row.x_position
            ));
        }
        if !numeric_x && !slot.is_empty() && !matches!(slot.as_str(), "LEFT" | "RIGHT" | "MIDDLE") {
            warnings.push(format!(
                "row {}: unknown default_position {:?}; position will be inherited",
                line, row.default_position
            ));
        }

        if DialogueStep::from_row(row).animation == Some(Animation::Unknown) {
            warnings.push(format!(
                "row {}: animation {:?} is not recognized and will play as a no-op",
                line, row.animation
            ));
        }

        for (label, cell) in [("quick_enter", &row.quick_enter), ("quick_escape", &row.quick_escape)] {
            let value = cell.trim().to_uppercase();
            if !value.is_empty() && value != "LEFT" && value != "RIGHT" {
                warnings.push(format!(
                    "row {}: {} {:?} is neither LEFT nor RIGHT and will be ignored",
                    line, label, cell
                ));
            }
        }

        if row.dialogue.trim().is_empty()
            && row.quick_escape.trim().is_empty()
            && row.quick_enter.trim().is_empty()
            && row.animation.trim().is_empty()
        {
            warnings.push(format!(
                "row {}: silent beat with no staging directive (plays as an invisible skip)",
                line
            ));
        }
    }

    // Every conversation the selector could pick must resolve to a script.
    let with_dialogue: HashSet<&str> = rows
        .iter()
        .map(|row| row.encounter_id.as_str())
        .collect();
    for record in pool {
        if !with_dialogue.contains(record.id.0.as_str()) {
            errors.push(format!(
                "conversation {} has no dialogue rows (activation would fail)",
                record.id
            ));
        }
    }

    (errors, warnings)
}
