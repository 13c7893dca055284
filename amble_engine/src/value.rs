//! `StateValue` -- the tagged union every piece of mutable game state is
//! expressed in.
//!
//! Kept deliberately flat (no nested nesting beyond `Set`/`Opaque`) so that
//! [`crate::change::StateChange`] application can compare an `old_value`
//! byte-for-byte without a custom equality relation per variant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::combat::CombatState;
use crate::health::{CharacterSheet, CombatCondition, ConsciousnessLevel, GeneralCondition};
use crate::id::{ItemId, LocationId};
use crate::vocab::EntityReference;
use crate::world::{Exit, Parent};

/// A value that can live in an item/location attribute bag, a global slot,
/// or be carried by a `StateChange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    String(String),
    ItemId(ItemId),
    LocationId(LocationId),
    ItemSet(HashSet<ItemId>),
    LocationSet(HashSet<LocationId>),
    StringSet(HashSet<String>),
    EntitySet(HashSet<EntityReference>),
    Parent(Parent),
    ExitSet(HashSet<Exit>),
    CharacterSheet(CharacterSheet),
    Combat(Option<CombatState>),
    Consciousness(ConsciousnessLevel),
    CombatCondition(CombatCondition),
    GeneralCondition(GeneralCondition),
    Alignment(Alignment),
    /// Escape hatch for game-specific values the core doesn't model.
    /// `type_name` lets a caller reject a decode attempt against the wrong
    /// type instead of silently misinterpreting bytes.
    Opaque { type_name: String, bytes: Vec<u8> },
}

/// A coarse moral/behavioral alignment tag, used by NPC AI and goal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Friendly,
    Neutral,
    Hostile,
}

impl StateValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_item_id(&self) -> Option<ItemId> {
        match self {
            Self::ItemId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_item_set(&self) -> Option<&HashSet<ItemId>> {
        match self {
            Self::ItemSet(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_string_set(&self) -> Option<&HashSet<String>> {
        match self {
            Self::StringSet(set) => Some(set),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for StateValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<String>> for StateValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringSet(v.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_coercions_round_trip() {
        assert_eq!(StateValue::from(true).as_bool(), Some(true));
        assert_eq!(StateValue::from(7i64).as_int(), Some(7));
        assert_eq!(StateValue::from("x").as_str(), Some("x"));
        let set = StateValue::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(set.as_string_set().unwrap().len(), 2);
    }

    #[test]
    fn wrong_variant_access_returns_none() {
        let v = StateValue::from(true);
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn serde_round_trip_for_opaque() {
        let v = StateValue::Opaque {
            type_name: "QuestFlags".into(),
            bytes: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&v).unwrap();
        let back: StateValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
