//! Conversation records and selection targets — the selectable pool.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::row::FieldValue;

/// Newtype wrapper for conversation/encounter ids.
///
/// Ids are compared as strings end to end: the conversation list and the
/// dialogue sheet are maintained by hand, and a loader may type the same id
/// as `7` in one sheet and `"7"` in the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConvoId(pub String);

impl fmt::Display for ConvoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ConvoId {
    fn from(s: &str) -> Self {
        ConvoId(s.to_string())
    }
}

/// Newtype wrapper for location/group ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

/// One conversation in the selectable pool: the coverage tags it
/// contributes and the location group it is capped by.
///
/// Immutable once parsed; a new selection pass reparses the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConvoId,
    pub tags: FxHashSet<u32>,
    pub group: GroupId,
}

impl ConversationRecord {
    /// Parse one `[id, tags, group]` row.
    ///
    /// Returns `None` with a logged diagnostic when the id or group cell is
    /// unusable; a malformed tag cell degrades to an empty tag set instead
    /// (the record then never contributes to a selection, but stays
    /// visible to diagnostics).
    pub fn from_row(row: &[FieldValue]) -> Option<ConversationRecord> {
        let id = match row.first()? {
            FieldValue::Int(n) => ConvoId(n.to_string()),
            FieldValue::Text(s) if !s.trim().is_empty() => ConvoId(s.trim().to_string()),
            other => {
                log::warn!("unusable conversation id cell {:?}; skipping row", other);
                return None;
            }
        };
        let tags = parse_tag_cell(row.get(1)?, &id);
        let group = match row.get(2)?.as_int() {
            Some(n) if n >= 0 => GroupId(n as u32),
            _ => {
                log::warn!("unusable group cell for conversation {}; skipping row", id);
                return None;
            }
        };
        Some(ConversationRecord { id, tags, group })
    }

    /// Parse a whole sheet, dropping unusable rows.
    pub fn parse_pool(rows: &[Vec<FieldValue>]) -> Vec<ConversationRecord> {
        rows.iter()
            .filter_map(|row| ConversationRecord::from_row(row))
            .collect()
    }
}

/// The tag cell comes in three shapes: a comma-joined list, a single
/// number, or nothing. Anything else is an empty set.
fn parse_tag_cell(cell: &FieldValue, id: &ConvoId) -> FxHashSet<u32> {
    match cell {
        FieldValue::Int(n) if *n >= 0 => std::iter::once(*n as u32).collect(),
        FieldValue::Text(s) => {
            let mut tags = FxHashSet::default();
            for piece in s.split(',') {
                match piece.trim().parse::<u32>() {
                    Ok(tag) => {
                        tags.insert(tag);
                    }
                    Err(_) => {
                        log::warn!(
                            "unparsable tag {:?} in conversation {}; ignoring it",
                            piece,
                            id
                        );
                    }
                }
            }
            tags
        }
        FieldValue::Empty => FxHashSet::default(),
        other => {
            log::warn!("unusable tag cell {:?} in conversation {}", other, id);
            FxHashSet::default()
        }
    }
}

/// Configuration for one selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionTarget {
    /// Tags the selected subset must cover — exactly, not as a superset.
    pub required_tags: FxHashSet<u32>,
    /// Cap on how many selected records may share a group.
    pub max_per_group: u32,
}

impl SelectionTarget {
    pub fn new(required_tags: impl IntoIterator<Item = u32>, max_per_group: u32) -> Self {
        SelectionTarget {
            required_tags: required_tags.into_iter().collect(),
            max_per_group,
        }
    }
}
