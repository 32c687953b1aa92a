//! Data types crossing the engine's boundaries: tabular rows, conversation
//! records, dialogue steps, and overworld locations.

pub mod location;
pub mod record;
pub mod row;
pub mod step;
