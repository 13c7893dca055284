//! `StateChange`: the only way game state is ever mutated, and
//! `GameState::apply`, its validated application semantics (§4.2).
//!
//! Grounded in the teacher's `TriggerAction`/`dispatch_action`
//! (trigger/action.rs) for the shape of "one enum variant per permitted
//! mutation, dispatched through a single apply function" -- generalized
//! here from a trigger-only payload into the full handler/effect pipeline's
//! mutation surface, with the optimistic-concurrency `old_value` check the
//! teacher's dispatcher doesn't need (it has no snapshot/apply split).

use serde::{Deserialize, Serialize};

use crate::health::CharacterSheet;
use crate::id::{AttributeId, DaemonId, FuseId, GlobalId, ItemId, LocationId};
use crate::value::StateValue;
use crate::world::{Exit, FuseState, GameState, Parent};

/// One of `Item`'s named boolean fields, addressed by a `StateChange`
/// variant distinct from the generic `attributes` bag -- stock handlers
/// (open/close/lock/unlock/wear/turn on) toggle these, not
/// `SetItemAttribute`, since they're struct fields rather than bag entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemFlag {
    Open,
    Locked,
    On,
    Worn,
    Touched,
    Fighting,
    Weapon,
}

/// A single permitted mutation. Representative, not exhaustive -- content
/// and handlers may need more `SetItemAttribute`/`SetGlobalState` keys than
/// any fixed enum could name, which is exactly what those two variants (and
/// their location-scoped twins) are for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateChange {
    /// `expected_old_parent`, when set, is checked byte-for-byte against the
    /// item's current parent before the move is applied (§4.2 step 3).
    MoveItem { id: ItemId, to_parent: Parent, expected_old_parent: Option<Parent> },
    SetItemFlag { id: ItemId, flag: ItemFlag, value: bool },
    SetItemAttribute { id: ItemId, key: AttributeId, value: StateValue, expected_old: Option<StateValue> },
    SetItemName { id: ItemId, name: String },
    SetLocationExits { id: LocationId, exits: Vec<Exit> },
    SetLocationAttribute { id: LocationId, key: AttributeId, value: StateValue, expected_old: Option<StateValue> },
    MovePlayer { location_id: LocationId },
    SetPlayerScore { score: i64 },
    IncrementPlayerMoves,
    /// The only path that touches a `CharacterSheet` -- combat and health
    /// effects never poke `Player`/`Item` fields directly, so every vitals
    /// change still lands in `change_history` like any other mutation.
    SetPlayerCharacterSheet(Box<CharacterSheet>),
    SetItemCharacterSheet { id: ItemId, sheet: Box<CharacterSheet> },
    SetFlag { id: GlobalId },
    ClearFlag { id: GlobalId },
    /// Supplemental: a step-indexed progress counter, folded into
    /// `global_values` per the corpus's flag/sequence-flag texture.
    AdvanceFlag { id: GlobalId },
    ResetFlag { id: GlobalId },
    SetGlobalState { id: GlobalId, value: StateValue, expected_old: Option<StateValue> },
    ClearGlobalState { id: GlobalId },
    SetCombatState(Option<crate::combat::CombatState>),
    AddActiveDaemon { id: DaemonId },
    RemoveActiveDaemon { id: DaemonId },
    AddActiveFuse { id: FuseId, state: FuseState },
    RemoveActiveFuse { id: FuseId },
    UpdateFuseTurns { id: FuseId, turns_remaining: u32 },
    SetPronounReference { pronoun: String, entities: Option<std::collections::HashSet<crate::vocab::EntityReference>> },
}

/// A `StateChange` together with the turn counter it was applied during,
/// appended to `GameState.change_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub change: StateChange,
    pub turn: u64,
}

/// Everything that can go wrong applying a `StateChange`; see `ActionResponse`
/// for the player-facing companion taxonomy in `crate::error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("no such item")]
    UnknownItem(ItemId),
    #[error("no such location")]
    UnknownLocation(LocationId),
    #[error("moving this item would create a containment cycle")]
    WouldCreateCycle(ItemId),
    /// A caller's optimistic `expected_old`/`expected_old_parent` didn't
    /// match the live value; `actual` is what was actually found.
    #[error("stale read: expected old value did not match current state")]
    StateValidationFailed { change: Box<StateChange>, actual: Box<StateValue> },
}

impl GameState {
    /// Applies a single `StateChange`, appending it to history on success.
    /// `turn` is the monotonic counter at the time of application (the
    /// player's move count), used for the `AppliedChange` timestamp rather
    /// than wall-clock, since real-time input is a non-goal.
    pub fn apply(&mut self, change: StateChange, turn: u64) -> Result<(), ApplyError> {
        self.apply_inner(&change)?;
        self.change_history.push(AppliedChange { change, turn });
        Ok(())
    }

    /// Applies a batch in order; stops at the first failure, leaving
    /// already-applied changes in place (§4.2: "on failure, the remaining
    /// changes are not applied").
    pub fn apply_all(&mut self, changes: Vec<StateChange>, turn: u64) -> Result<(), ApplyError> {
        for change in changes {
            self.apply(change, turn)?;
        }
        Ok(())
    }

    fn apply_inner(&mut self, change: &StateChange) -> Result<(), ApplyError> {
        match change {
            StateChange::MoveItem { id, to_parent, expected_old_parent } => {
                let current_parent = self.items.get(id).ok_or(ApplyError::UnknownItem(*id))?.parent;
                if let Some(expected) = expected_old_parent {
                    if *expected != current_parent {
                        return Err(ApplyError::StateValidationFailed {
                            change: Box::new(change.clone()),
                            actual: Box::new(StateValue::Parent(current_parent)),
                        });
                    }
                }
                if self.would_cycle(*id, *to_parent) {
                    return Err(ApplyError::WouldCreateCycle(*id));
                }
                self.items.get_mut(id).unwrap().parent = *to_parent;
            }
            StateChange::SetItemFlag { id, flag, value } => {
                let item = self.items.get_mut(id).ok_or(ApplyError::UnknownItem(*id))?;
                let field = match flag {
                    ItemFlag::Open => &mut item.is_open,
                    ItemFlag::Locked => &mut item.is_locked,
                    ItemFlag::On => &mut item.is_on,
                    ItemFlag::Worn => &mut item.is_worn,
                    ItemFlag::Touched => &mut item.is_touched,
                    ItemFlag::Fighting => &mut item.is_fighting,
                    ItemFlag::Weapon => &mut item.is_weapon,
                };
                *field = *value;
            }
            StateChange::SetItemAttribute { id, key, value, expected_old } => {
                let item = self.items.get_mut(id).ok_or(ApplyError::UnknownItem(*id))?;
                if let Some(expected) = expected_old {
                    let current = item.attributes.get(key).cloned().unwrap_or(StateValue::Bool(false));
                    if *expected != current {
                        return Err(ApplyError::StateValidationFailed {
                            change: Box::new(change.clone()),
                            actual: Box::new(current),
                        });
                    }
                }
                item.attributes.insert(*key, value.clone());
            }
            StateChange::SetItemName { id, name } => {
                let item = self.items.get_mut(id).ok_or(ApplyError::UnknownItem(*id))?;
                item.name = name.clone();
            }
            StateChange::SetLocationExits { id, exits } => {
                let loc = self.locations.get_mut(id).ok_or(ApplyError::UnknownLocation(*id))?;
                loc.exits = exits.clone();
            }
            StateChange::SetLocationAttribute { id, key, value, expected_old } => {
                let loc = self.locations.get_mut(id).ok_or(ApplyError::UnknownLocation(*id))?;
                if let Some(expected) = expected_old {
                    let current = loc.attributes.get(key).cloned().unwrap_or(StateValue::Bool(false));
                    if *expected != current {
                        return Err(ApplyError::StateValidationFailed {
                            change: Box::new(change.clone()),
                            actual: Box::new(current),
                        });
                    }
                }
                loc.attributes.insert(*key, value.clone());
            }
            StateChange::MovePlayer { location_id } => {
                self.player.current_location_id = *location_id;
            }
            StateChange::SetPlayerScore { score } => {
                self.player.score = *score;
            }
            StateChange::IncrementPlayerMoves => {
                self.player.moves += 1;
            }
            StateChange::SetPlayerCharacterSheet(sheet) => {
                self.player.character_sheet = (**sheet).clone();
            }
            StateChange::SetItemCharacterSheet { id, sheet } => {
                let item = self.items.get_mut(id).ok_or(ApplyError::UnknownItem(*id))?;
                item.character_sheet = Some((**sheet).clone());
            }
            StateChange::SetFlag { id } => {
                self.global_flags.insert(*id);
            }
            StateChange::ClearFlag { id } => {
                self.global_flags.remove(id);
            }
            StateChange::AdvanceFlag { id } => {
                let current = self.global_values.get(id).and_then(StateValue::as_int).unwrap_or(0);
                self.global_values.insert(*id, StateValue::Int(current + 1));
            }
            StateChange::ResetFlag { id } => {
                self.global_values.insert(*id, StateValue::Int(0));
            }
            StateChange::SetGlobalState { id, value, expected_old } => {
                if let Some(expected) = expected_old {
                    let current = self.global_values.get(id).cloned().unwrap_or(StateValue::Bool(false));
                    if *expected != current {
                        return Err(ApplyError::StateValidationFailed {
                            change: Box::new(change.clone()),
                            actual: Box::new(current),
                        });
                    }
                }
                self.global_values.insert(*id, value.clone());
            }
            StateChange::ClearGlobalState { id } => {
                self.global_values.remove(id);
            }
            StateChange::SetCombatState(state) => {
                self.combat_state = state.clone();
            }
            StateChange::AddActiveDaemon { id } => {
                self.active_daemons.insert(*id);
            }
            StateChange::RemoveActiveDaemon { id } => {
                self.active_daemons.remove(id);
            }
            StateChange::AddActiveFuse { id, state } => {
                self.active_fuses.insert(*id, state.clone());
            }
            StateChange::RemoveActiveFuse { id } => {
                self.active_fuses.remove(id);
            }
            StateChange::UpdateFuseTurns { id, turns_remaining } => {
                if let Some(fuse) = self.active_fuses.get_mut(id) {
                    fuse.turns_remaining = *turns_remaining;
                }
            }
            StateChange::SetPronounReference { pronoun, entities } => match entities {
                Some(set) => {
                    self.pronouns.insert(pronoun.clone(), set.clone());
                }
                None => {
                    self.pronouns.remove(pronoun);
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ItemId, LocationId};
    use crate::world::Item;
    use std::collections::{HashMap, HashSet};

    fn state() -> GameState {
        let loc = LocationId::new();
        GameState {
            items: HashMap::new(),
            locations: HashMap::from([(loc, crate::world::Location::new(loc, "Room", "A room."))]),
            player: crate::world::Player {
                current_location_id: loc,
                score: 0,
                moves: 0,
                inventory_capacity: -1,
                character_sheet: crate::health::CharacterSheet {
                    strength: 10, constitution: 10, intelligence: 10, wisdom: 10, charisma: 10,
                    armor_class: 10, attack_bonus: 0, max_health: 10, health: 10,
                    consciousness: crate::health::ConsciousnessLevel::Awake,
                    general_condition: crate::health::GeneralCondition::Fine,
                    combat_condition: crate::health::CombatCondition::None,
                    morale: 0.5, bravery: 0.5, flee_threshold: 0.25, can_be_pacified: false, pacify_dc: 15,
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
    fn move_item_rejects_cycles() {
        let mut s = state();
        let loc = s.player.current_location_id;
        let a = ItemId::new();
        let b = ItemId::new();
        s.items.insert(a, Item::new(a, "box", Parent::Location(loc)));
        s.items.insert(b, Item::new(b, "pouch", Parent::Item(a)));
        let err = s.apply(
            StateChange::MoveItem { id: a, to_parent: Parent::Item(b), expected_old_parent: None },
            1,
        );
        assert!(matches!(err, Err(ApplyError::WouldCreateCycle(_))));
    }

    #[test]
    fn apply_appends_to_history() {
        let mut s = state();
        s.apply(StateChange::IncrementPlayerMoves, 1).unwrap();
        assert_eq!(s.player.moves, 1);
        assert_eq!(s.change_history.len(), 1);
        assert_eq!(s.change_history[0].turn, 1);
    }

    #[test]
    fn apply_all_stops_on_first_failure() {
        let mut s = state();
        let missing = ItemId::new();
        let result = s.apply_all(
            vec![
                StateChange::IncrementPlayerMoves,
                StateChange::MoveItem { id: missing, to_parent: Parent::Nowhere, expected_old_parent: None },
                StateChange::IncrementPlayerMoves,
            ],
            1,
        );
        assert!(result.is_err());
        assert_eq!(s.player.moves, 1);
    }

    #[test]
    fn stale_expected_old_is_rejected() {
        let mut s = state();
        let loc = s.player.current_location_id;
        let a = ItemId::new();
        s.items.insert(a, Item::new(a, "rock", Parent::Location(loc)));
        let err = s.apply(
            StateChange::MoveItem {
                id: a,
                to_parent: Parent::Player,
                expected_old_parent: Some(Parent::Player),
            },
            1,
        );
        assert!(matches!(err, Err(ApplyError::StateValidationFailed { .. })));
        assert_eq!(s.items[&a].parent, Parent::Location(loc));
    }

    #[test]
    fn set_item_flag_toggles_the_named_field() {
        let mut s = state();
        let loc = s.player.current_location_id;
        let a = ItemId::new();
        s.items.insert(a, Item::new(a, "box", Parent::Location(loc)));
        s.apply(StateChange::SetItemFlag { id: a, flag: ItemFlag::Open, value: true }, 1).unwrap();
        assert!(s.items[&a].is_open);
    }

    #[test]
    fn set_player_character_sheet_replaces_the_whole_sheet() {
        let mut s = state();
        let mut sheet = s.player.character_sheet.clone();
        sheet.health = 3;
        s.apply(StateChange::SetPlayerCharacterSheet(Box::new(sheet)), 1).unwrap();
        assert_eq!(s.player.character_sheet.health, 3);
    }

    #[test]
    fn set_flag_then_clear_flag_round_trips() {
        let mut s = state();
        let g = crate::id::GlobalId::new();
        s.apply(StateChange::SetFlag { id: g }, 1).unwrap();
        assert!(s.global_flags.contains(&g));
        s.apply(StateChange::ClearFlag { id: g }, 2).unwrap();
        assert!(!s.global_flags.contains(&g));
    }
}
