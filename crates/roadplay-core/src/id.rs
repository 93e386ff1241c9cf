//! Identity types for roadplay
//!
//! Entities are named by the event source ("A", "B", ...), lanes are small
//! integers and pair categories are short tags such as `ntg` or `ttc`.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tracked entity identity - the name the event source uses for a vehicle
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId(id)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lane identity
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub i32);

impl LaneId {
    #[inline]
    pub fn new(id: i32) -> Self {
        LaneId(id)
    }
}

impl fmt::Debug for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lane({})", self.0)
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pair measurement category (e.g. `ntg` net time gap, `ttc` time to collision)
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl Category {
    /// Net time gap between two entities
    pub const NTG: &'static str = "ntg";
    /// Time to collision between two entities
    pub const TTC: &'static str = "ttc";

    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Category(name.to_string())
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category({})", self.0)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering() {
        let mut ids = vec![EntityId::new("C"), EntityId::new("A"), EntityId::new("B")];
        ids.sort();
        assert_eq!(ids, vec![EntityId::from("A"), EntityId::from("B"), EntityId::from("C")]);
    }

    #[test]
    fn test_entity_id_serde_is_transparent() {
        let id: EntityId = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(id.as_str(), "A");
        assert_eq!(serde_json::to_string(&LaneId::new(3)).unwrap(), "3");
    }
}
