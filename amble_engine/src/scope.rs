//! The scope resolver (§4.3): which items the player can see and reach,
//! given lighting, containment, and transparency.
//!
//! Grounded in the teacher's `nearby_reachable_items`/`nearby_visible_items`
//! (world.rs), generalized to the darkness/light-source rule this spec adds
//! -- the teacher's world has no darkness model, so `is_lit` and its
//! simulated-change twin are new code, written in the same free-function-
//! over-`&GameState`-returning-`HashSet` style the teacher uses there.

use std::collections::HashSet;

use crate::id::{AttributeId, ItemId, LocationId};
use crate::value::StateValue;
use crate::world::{GameState, Item, Parent};

/// Whether `location` currently has light, per §3.2's rule: naturally lit,
/// or transitively containing (through open/transparent containers) a held
/// or co-located light source that is switched on.
pub fn is_lit(state: &GameState, location: LocationId) -> bool {
    let Some(loc) = state.location(location) else { return false };
    if loc.is_lit {
        return true;
    }
    active_light_sources(state, location).next().is_some()
}

/// Pure over a hypothetical alternative state of one item's attributes --
/// used to answer "would this location go dark if we turned the lamp off?"
/// without mutating `state`.
pub fn is_lit_after_simulated_change(
    state: &GameState,
    location: LocationId,
    changed_item: ItemId,
    new_is_on: Option<bool>,
    new_is_light_source: Option<bool>,
) -> bool {
    let Some(loc) = state.location(location) else { return false };
    if loc.is_lit {
        return true;
    }
    state.items.values().any(|item| {
        if !item_is_at_or_held_in(state, item, location) {
            return false;
        }
        let (is_on, is_light_source) = if item.id == changed_item {
            (new_is_on.unwrap_or(item.is_on), new_is_light_source.unwrap_or(item.is_light_source))
        } else {
            (item.is_on, item.is_light_source)
        };
        is_on && is_light_source
    })
}

fn active_light_sources(state: &GameState, location: LocationId) -> impl Iterator<Item = ItemId> + '_ {
    state
        .items
        .values()
        .filter(|item| item.is_light_source && item.is_on)
        .filter(move |item| item_is_at_or_held_in(state, item, location))
        .map(|item| item.id)
}

/// Light source items at or held in `location`, on or off -- the
/// light-in-darkness exception (§4.3) that keeps an unlit lantern a dark
/// room is standing in reachable enough to turn on.
fn light_sources_in_darkness(state: &GameState, location: LocationId) -> impl Iterator<Item = ItemId> + '_ {
    state
        .items
        .values()
        .filter(|item| item.is_light_source)
        .filter(move |item| item_is_at_or_held_in(state, item, location))
        .map(|item| item.id)
}

fn item_is_at_or_held_in(state: &GameState, item: &Item, location: LocationId) -> bool {
    match item.parent {
        Parent::Location(l) => l == location,
        Parent::Player => state.player.current_location_id == location,
        _ => false,
    }
}

/// Every item visible in `location`: reachable transitively through open or
/// transparent containers, provided the location is lit. In the dark, only
/// items that are themselves an active light source held by the player or
/// sitting directly in the location are visible.
pub fn visible_items_in(state: &GameState, location: LocationId) -> HashSet<ItemId> {
    if !is_lit(state, location) {
        return light_sources_in_darkness(state, location).collect();
    }

    let mut visible = HashSet::new();
    let mut frontier: Vec<ItemId> = state
        .items
        .values()
        .filter(|i| matches!(i.parent, Parent::Location(l) if l == location))
        .map(|i| i.id)
        .collect();
    frontier.extend(state.items_in(Parent::Player).iter().map(|i| i.id));

    while let Some(id) = frontier.pop() {
        if !visible.insert(id) {
            continue;
        }
        let Some(item) = state.item(id) else { continue };
        if item.is_container && (item.is_open || !item.is_openable) || item.is_surface || item.is_transparent {
            for child in state.items_in(Parent::Item(id)) {
                frontier.push(child.id);
            }
        }
    }
    visible
}

/// Everything visible that is either in the player's inventory, or on a
/// surface/open container directly in `location` or held by the player.
pub fn reachable_items_by_player(state: &GameState, location: LocationId) -> HashSet<ItemId> {
    let visible = visible_items_in(state, location);
    visible
        .into_iter()
        .filter(|&id| {
            let Some(item) = state.item(id) else { return false };
            match item.parent {
                Parent::Player => true,
                Parent::Location(l) => l == location,
                Parent::Item(parent_id) => state
                    .item(parent_id)
                    .map(|p| {
                        let directly_reachable = matches!(p.parent, Parent::Location(l) if l == location)
                            || matches!(p.parent, Parent::Player);
                        let accessible = !p.is_container || p.is_open || !p.is_openable;
                        directly_reachable && accessible
                    })
                    .unwrap_or(false),
                Parent::Nowhere => false,
            }
        })
        .collect()
}

/// Reads a boolean item attribute out of the generic bag, defaulting to
/// `false` for an absent key (attempted access as the wrong variant returns
/// the empty option rather than throwing, per §4.1).
pub fn item_flag(state: &GameState, item: ItemId, key: AttributeId) -> bool {
    state
        .item(item)
        .and_then(|i| i.attributes.get(&key))
        .and_then(StateValue::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{GameState, Item, Location, Parent, Player};
    use std::collections::HashMap;

    fn base_state() -> (GameState, LocationId) {
        let loc = LocationId::new();
        let state = GameState {
            items: HashMap::new(),
            locations: HashMap::from([(loc, Location::new(loc, "Cellar", "A dark cellar."))]),
            player: Player {
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
            global_flags: Default::default(),
            global_values: HashMap::new(),
            pronouns: HashMap::new(),
            active_fuses: HashMap::new(),
            active_daemons: Default::default(),
            combat_state: None,
            change_history: Vec::new(),
        };
        (state, loc)
    }

    #[test]
    fn dark_room_with_no_light_source_is_not_lit() {
        let (mut state, loc) = base_state();
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        assert!(!is_lit(&state, loc));
    }

    #[test]
    fn lantern_held_by_player_lights_a_dark_room() {
        let (mut state, loc) = base_state();
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        let lantern_id = ItemId::new();
        let mut lantern = Item::new(lantern_id, "lantern", Parent::Player);
        lantern.is_light_source = true;
        lantern.is_on = true;
        state.items.insert(lantern_id, lantern);
        assert!(is_lit(&state, loc));
    }

    #[test]
    fn simulated_turn_on_lights_a_room_for_a_currently_off_lantern() {
        let (mut state, loc) = base_state();
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        let lantern_id = ItemId::new();
        let mut lantern = Item::new(lantern_id, "lantern", Parent::Player);
        lantern.is_light_source = true;
        lantern.is_on = false;
        state.items.insert(lantern_id, lantern);

        assert!(!is_lit(&state, loc));
        assert!(is_lit_after_simulated_change(&state, loc, lantern_id, Some(true), None));
    }

    #[test]
    fn an_unlit_lantern_in_a_dark_room_is_still_visible() {
        let (mut state, loc) = base_state();
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        let lantern_id = ItemId::new();
        let mut lantern = Item::new(lantern_id, "lantern", Parent::Location(loc));
        lantern.is_light_source = true;
        lantern.is_on = false;
        state.items.insert(lantern_id, lantern);

        assert!(!is_lit(&state, loc));
        assert!(visible_items_in(&state, loc).contains(&lantern_id));
        assert!(reachable_items_by_player(&state, loc).contains(&lantern_id));
    }

    #[test]
    fn a_plain_item_in_a_dark_room_is_not_visible() {
        let (mut state, loc) = base_state();
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        let rock_id = ItemId::new();
        state.items.insert(rock_id, Item::new(rock_id, "rock", Parent::Location(loc)));

        assert!(!visible_items_in(&state, loc).contains(&rock_id));
    }

    #[test]
    fn visible_items_descend_into_open_containers() {
        let (mut state, loc) = base_state();
        let box_id = ItemId::new();
        let mut box_item = Item::new(box_id, "box", Parent::Location(loc));
        box_item.is_container = true;
        box_item.is_openable = true;
        box_item.is_open = true;
        state.items.insert(box_id, box_item);
        let gem_id = ItemId::new();
        state.items.insert(gem_id, Item::new(gem_id, "gem", Parent::Item(box_id)));

        let visible = visible_items_in(&state, loc);
        assert!(visible.contains(&gem_id));
    }

    #[test]
    fn closed_container_hides_its_contents_from_reachable_set() {
        let (mut state, loc) = base_state();
        let box_id = ItemId::new();
        let mut box_item = Item::new(box_id, "box", Parent::Location(loc));
        box_item.is_container = true;
        box_item.is_openable = true;
        box_item.is_open = false;
        state.items.insert(box_id, box_item);
        let gem_id = ItemId::new();
        state.items.insert(gem_id, Item::new(gem_id, "gem", Parent::Item(box_id)));

        let visible = visible_items_in(&state, loc);
        assert!(!visible.contains(&gem_id));
    }
}
