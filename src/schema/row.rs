//! Tabular boundary — typed rows as a host's spreadsheet loader hands them
//! over. Nothing rawer than these types crosses into the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One cell as a dynamically-typing tabular parser produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl FieldValue {
    /// The cell's text content, if it carries any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The cell as an integer. Floats with no fractional part count.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Minimum column count for a conversation-list row. Shorter rows are
/// loader noise (blank lines, trailing separators) and never reach parsing.
pub const MIN_CONVO_COLUMNS: usize = 3;

/// Drop rows too short to carry `[id, tags, group]`.
pub fn filter_short_rows(rows: Vec<Vec<FieldValue>>) -> Vec<Vec<FieldValue>> {
    let before = rows.len();
    let kept: Vec<_> = rows
        .into_iter()
        .filter(|row| row.len() >= MIN_CONVO_COLUMNS)
        .collect();
    if kept.len() < before {
        log::warn!(
            "dropped {} conversation-list row(s) under {} columns",
            before - kept.len(),
            MIN_CONVO_COLUMNS
        );
    }
    kept
}

/// Load a conversation-list sheet from a RON export.
pub fn load_convo_rows(path: &Path) -> Result<Vec<Vec<FieldValue>>, RowError> {
    let contents = std::fs::read_to_string(path)?;
    parse_convo_rows(&contents)
}

/// Parse a conversation-list sheet from a RON string.
pub fn parse_convo_rows(input: &str) -> Result<Vec<Vec<FieldValue>>, RowError> {
    Ok(ron::from_str(input)?)
}

/// One named-column row of the dialogue sheet.
///
/// Field names mirror the sheet header. Everything but the encounter id is
/// optional; normalization maps missing or malformed cells to documented
/// defaults instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueRow {
    pub encounter_id: String,
    #[serde(default)]
    pub talksprite_id: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub dialogue: String,
    #[serde(default)]
    pub default_position: String,
    #[serde(default)]
    pub x_position: String,
    #[serde(default)]
    pub y_position: String,
    #[serde(default)]
    pub quick_escape: String,
    #[serde(default)]
    pub quick_enter: String,
    #[serde(default)]
    pub animation: String,
}

impl DialogueRow {
    /// Load a dialogue sheet from a RON export.
    pub fn load_from_ron(path: &Path) -> Result<Vec<DialogueRow>, RowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a dialogue sheet from a RON string.
    pub fn parse_ron(input: &str) -> Result<Vec<DialogueRow>, RowError> {
        Ok(ron::from_str(input)?)
    }
}
