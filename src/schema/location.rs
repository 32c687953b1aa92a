//! Overworld locations — where players spawn and triggers stand.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::record::GroupId;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A map area: player spawn point plus the spawn slots triggers cycle
/// through when records outnumber them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: GroupId,
    pub name: String,
    pub spawn_point: (i32, i32),
    #[serde(default = "default_trigger_spawns")]
    pub trigger_spawns: Vec<(i32, i32)>,
}

/// The shared column most locations leave their trigger slots on.
fn default_trigger_spawns() -> Vec<(i32, i32)> {
    vec![(500, 600), (500, 750), (500, 750), (500, 800)]
}

/// Registry of all loaded locations.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    locations: HashMap<GroupId, Location>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self {
            locations: HashMap::new(),
        }
    }

    pub fn register(&mut self, location: Location) {
        self.locations.insert(location.id, location);
    }

    pub fn get(&self, id: GroupId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Location ids in ascending order, for stable listings.
    pub fn ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.locations.keys().copied().collect();
        ids.sort_unstable_by_key(|id| id.0);
        ids
    }

    /// Load a location list from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<LocationRegistry, LocationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a location list from a RON string.
    pub fn parse_ron(input: &str) -> Result<LocationRegistry, LocationError> {
        let entries: Vec<Location> = ron::from_str(input)?;
        let mut registry = LocationRegistry::new();
        for location in entries {
            registry.register(location);
        }
        Ok(registry)
    }
}
