//! Encounter Engine — data-driven dialogue encounters for games.
//!
//! Selects a conflict-free set of conversations from a tabular pool, places
//! the selected ones as activatable map triggers, and plays each one back as
//! a typewriter-paced dialogue scene with character staging. Rendering,
//! input polling, and data fetching belong to the host: the engine drives an
//! abstract stage and is fed player taps and clock time.

pub mod core;
pub mod schema;
