use serde::{Deserialize, Serialize};

use super::EntityId;

/// Film genre reference row. Ordered by id so a film's genre set keeps a
/// stable order across reads and engines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Genre {
    pub id: EntityId,
    pub name: String,
}

impl Genre {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// MPA age rating reference row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub id: EntityId,
    pub name: String,
}

impl Rating {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
