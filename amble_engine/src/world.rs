//! The core entities -- `Item`, `Location`, `Player` -- and `GameState`, the
//! value aggregate that owns all of them.
//!
//! Grounded in the teacher's `AmbleWorld`/`Location`/`WorldObject` (world.rs)
//! and `Item` (item.rs): the containment model (`Parent`, here renamed from
//! the teacher's own `Location` sum type to avoid colliding with the spec's
//! `Location` entity) and the attribute-bag pattern both carry over
//! directly. Known boolean/typed flags are kept as explicit struct fields,
//! matching the teacher's `Item`, with a generic `attributes` bag alongside
//! for game-specific extensions `StateChange::SetItemAttribute` can target.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::health::CharacterSheet;
use crate::id::{AttributeId, DaemonId, FuseId, GlobalId, ItemId, LocationId};
use crate::value::StateValue;
use crate::vocab::{Direction, EntityReference};

/// Where an item currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, variantly::Variantly)]
pub enum Parent {
    Player,
    Location(LocationId),
    Item(ItemId),
    Nowhere,
}

/// One exit out of a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exit {
    pub direction: Direction,
    pub destination: Option<LocationId>,
    pub door_id: Option<ItemId>,
    pub blocked_message: Option<String>,
    pub required_key: Option<ItemId>,
}

impl Exit {
    pub fn is_blocked(&self) -> bool {
        self.destination.is_none()
    }
}

/// A thing in the world: held, worn, contained, or resting somewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub adjectives: HashSet<String>,
    pub synonyms: HashSet<String>,
    pub parent: Parent,
    pub size: i64,
    /// -1 means unbounded.
    pub capacity: i64,
    pub value: i64,

    pub is_container: bool,
    pub is_surface: bool,
    pub is_openable: bool,
    pub is_open: bool,
    pub is_lockable: bool,
    pub is_locked: bool,
    pub is_light_source: bool,
    pub is_on: bool,
    pub is_readable: bool,
    pub is_device: bool,
    pub is_takable: bool,
    pub is_wearable: bool,
    pub is_worn: bool,
    pub is_touched: bool,
    pub is_fixed: bool,
    pub is_scenery: bool,
    pub is_transparent: bool,
    pub is_door: bool,
    pub is_character: bool,
    pub is_person: bool,
    pub is_fighting: bool,
    pub is_weapon: bool,

    pub lock_key: Option<ItemId>,
    pub read_text: Option<String>,
    pub character_sheet: Option<CharacterSheet>,

    pub attributes: HashMap<AttributeId, StateValue>,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, parent: Parent) -> Self {
        Self {
            id,
            name: name.into(),
            adjectives: HashSet::new(),
            synonyms: HashSet::new(),
            parent,
            size: 1,
            capacity: -1,
            value: 0,
            is_container: false,
            is_surface: false,
            is_openable: false,
            is_open: false,
            is_lockable: false,
            is_locked: false,
            is_light_source: false,
            is_on: false,
            is_readable: false,
            is_device: false,
            is_takable: false,
            is_wearable: false,
            is_worn: false,
            is_touched: false,
            is_fixed: false,
            is_scenery: false,
            is_transparent: false,
            is_door: false,
            is_character: false,
            is_person: false,
            is_fighting: false,
            is_weapon: false,
            lock_key: None,
            read_text: None,
            character_sheet: None,
            attributes: HashMap::new(),
        }
    }

    pub fn matches_noun(&self, noun: &str) -> bool {
        self.name.eq_ignore_ascii_case(noun) || self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(noun))
    }

    pub fn has_adjective(&self, adjective: &str) -> bool {
        self.adjectives.iter().any(|a| a.eq_ignore_ascii_case(adjective))
    }

    /// `capacity < 0` is unbounded; otherwise compares against the summed
    /// `size` of the items currently parented to this one.
    pub fn fits(&self, occupied_size: i64, incoming_size: i64) -> bool {
        self.capacity < 0 || occupied_size + incoming_size <= self.capacity
    }
}

/// A room or other place the player and items can occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    pub exits: Vec<Exit>,
    pub is_lit: bool,
    pub is_outside: bool,
    pub is_visited: bool,
    pub attributes: HashMap<AttributeId, StateValue>,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            exits: Vec::new(),
            is_lit: true,
            is_outside: false,
            is_visited: false,
            attributes: HashMap::new(),
        }
    }

    pub fn exit_toward(&self, direction: Direction) -> Option<&Exit> {
        self.exits.iter().find(|e| e.direction == direction)
    }
}

/// The player's own mutable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub current_location_id: LocationId,
    pub score: i64,
    pub moves: u64,
    pub inventory_capacity: i64,
    pub character_sheet: CharacterSheet,
}

/// A fuse's live bookkeeping: how many turns remain and what its payload
/// does when it reaches zero. The payload itself is looked up by `FuseId`
/// in a content-provided registry owned by the engine, not stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuseState {
    pub turns_remaining: u32,
}

/// The full, serializable snapshot of one game's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub items: HashMap<ItemId, Item>,
    pub locations: HashMap<LocationId, Location>,
    pub player: Player,
    pub global_flags: HashSet<GlobalId>,
    pub global_values: HashMap<GlobalId, StateValue>,
    pub pronouns: HashMap<String, HashSet<EntityReference>>,
    pub active_fuses: HashMap<FuseId, FuseState>,
    pub active_daemons: HashSet<DaemonId>,
    pub combat_state: Option<crate::combat::CombatState>,
    pub change_history: Vec<crate::change::AppliedChange>,
}

impl GameState {
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    /// Items directly parented to `parent` (no transitive descent).
    pub fn items_in(&self, parent: Parent) -> Vec<&Item> {
        self.items.values().filter(|i| i.parent == parent).collect()
    }

    pub fn player_location(&self) -> Option<&Location> {
        self.locations.get(&self.player.current_location_id)
    }

    /// Walks an item's parent chain; `None` means the chain terminated at
    /// `Location`/`Player`/`Nowhere` without revisiting `from`, `Some(id)`
    /// means `from` would become its own ancestor.
    pub fn would_cycle(&self, from: ItemId, proposed_parent: Parent) -> bool {
        let mut current = proposed_parent;
        let mut guard = 0usize;
        loop {
            guard += 1;
            if guard > self.items.len() + 1 {
                return true;
            }
            match current {
                Parent::Item(id) if id == from => return true,
                Parent::Item(id) => match self.items.get(&id) {
                    Some(item) => current = item.parent,
                    None => return false,
                },
                _ => return false,
            }
        }
    }

    /// The summed `size` of items currently parented to `parent`.
    pub fn occupied_size(&self, parent: Parent) -> i64 {
        self.items_in(parent).iter().map(|i| i.size).sum()
    }
}

/// Minimal fixtures shared across other modules' unit tests, so each one
/// doesn't have to hand-roll a full `GameState`/`CharacterSheet` just to
/// exercise unrelated logic.
#[cfg(test)]
pub mod tests_support {
    use super::*;
    use crate::health::{CharacterSheet, CombatCondition, ConsciousnessLevel, GeneralCondition};

    pub fn empty_state() -> GameState {
        let loc = LocationId::new();
        GameState {
            items: HashMap::new(),
            locations: HashMap::from([(loc, Location::new(loc, "Room", "A room."))]),
            player: Player {
                current_location_id: loc,
                score: 0,
                moves: 0,
                inventory_capacity: -1,
                character_sheet: CharacterSheet {
                    strength: 10,
                    constitution: 10,
                    intelligence: 10,
                    wisdom: 10,
                    charisma: 10,
                    armor_class: 10,
                    attack_bonus: 0,
                    max_health: 10,
                    health: 10,
                    consciousness: ConsciousnessLevel::Awake,
                    general_condition: GeneralCondition::Fine,
                    combat_condition: CombatCondition::None,
                    morale: 0.5,
                    bravery: 0.5,
                    flee_threshold: 0.25,
                    can_be_pacified: false,
                    pacify_dc: 15,
                },
            },
            global_flags: HashSet::new(),
            global_values: HashMap::new(),
            pronouns: HashMap::new(),
            active_fuses: HashMap::new(),
            active_daemons: HashSet::new(),
            combat_state: None,
            change_history: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state(loc: LocationId) -> GameState {
        GameState {
            items: HashMap::new(),
            locations: HashMap::from([(loc, Location::new(loc, "Room", "A room."))]),
            player: Player {
                current_location_id: loc,
                score: 0,
                moves: 0,
                inventory_capacity: -1,
                character_sheet: crate::health::CharacterSheet {
                    strength: 10,
                    constitution: 10,
                    intelligence: 10,
                    wisdom: 10,
                    charisma: 10,
                    armor_class: 10,
                    attack_bonus: 0,
                    max_health: 10,
                    health: 10,
                    consciousness: crate::health::ConsciousnessLevel::Awake,
                    general_condition: crate::health::GeneralCondition::Fine,
                    combat_condition: crate::health::CombatCondition::None,
                    morale: 0.5,
                    bravery: 0.5,
                    flee_threshold: 0.25,
                    can_be_pacified: false,
                    pacify_dc: 15,
                },
            },
            global_flags: HashSet::new(),
            global_values: HashMap::new(),
            pronouns: HashMap::new(),
            active_fuses: HashMap::new(),
            active_daemons: HashSet::new(),
            combat_state: None,
            change_history: Vec::new(),
        }
    }

    #[test]
    fn items_in_filters_by_parent() {
        let loc = LocationId::new();
        let mut state = empty_state(loc);
        let a = ItemId::new();
        let b = ItemId::new();
        state.items.insert(a, Item::new(a, "rock", Parent::Location(loc)));
        state.items.insert(b, Item::new(b, "key", Parent::Player));
        assert_eq!(state.items_in(Parent::Location(loc)).len(), 1);
        assert_eq!(state.items_in(Parent::Player).len(), 1);
    }

    #[test]
    fn would_cycle_detects_self_parent() {
        let loc = LocationId::new();
        let mut state = empty_state(loc);
        let a = ItemId::new();
        let b = ItemId::new();
        state.items.insert(a, Item::new(a, "box", Parent::Location(loc)));
        state.items.insert(b, Item::new(b, "pouch", Parent::Item(a)));
        assert!(state.would_cycle(a, Parent::Item(b)));
        assert!(!state.would_cycle(a, Parent::Location(loc)));
    }

    #[test]
    fn fits_respects_unbounded_capacity() {
        let item = Item::new(ItemId::new(), "bag", Parent::Player);
        assert!(item.fits(1000, 1));
    }
}
