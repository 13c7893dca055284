//! Converts a loaded `amble_data::WorldDef` into a runnable `GameState`.
//!
//! Grounded in the teacher's own world-loading pass (it builds `AmbleWorld`
//! from the same `WorldDef`, resolving string `Id`s to `Uuid`s as it goes).
//! This loader keeps that two-step shape -- parse the authoring format,
//! then resolve symbols into stable ids -- but resolves into this engine's
//! newtype ids via `from_token` instead of the teacher's own id generator,
//! so the same room/item symbol always yields the same id across loads
//! (needed for save-file compatibility across a reload of the same world).

use std::collections::{HashMap, HashSet};

use amble_data::{
    ContainerState, ExitDef, ItemAbility, ItemDef, LocationRef, Movability, NpcDef, RoomDef, WorldDef,
};
use uuid::Uuid;

use crate::health::{CharacterSheet, CombatCondition, ConsciousnessLevel, GeneralCondition};
use crate::id::{ItemId, LocationId};
use crate::vocab::Direction;
use crate::world::{Exit, GameState, Item, Location, Parent, Player};

/// Fixed namespace every symbol-to-id derivation in this loader is rooted
/// at, so the same world-definition symbol always yields the same id.
const WORLD_NAMESPACE: Uuid = Uuid::from_bytes([
    0xa3, 0x6d, 0x00, 0xb1, 0x0c, 0x1e, 0x4f, 0x9a, 0x9b, 0x2f, 0x7e, 0x61, 0x5d, 0x8a, 0x44, 0x02,
]);

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("room \"{0}\" references unknown exit destination \"{1}\"")]
    UnknownRoom(String, String),
    #[error("item \"{0}\" is parented to unknown item \"{1}\"")]
    UnknownItemParent(String, String),
    #[error("player start room \"{0}\" does not exist")]
    UnknownStartRoom(String),
    #[error("unrecognized direction \"{0}\" on room \"{1}\"")]
    UnknownDirection(String, String),
}

fn location_id(symbol: &str) -> LocationId {
    LocationId::from_token(&WORLD_NAMESPACE, symbol)
}

fn item_id(symbol: &str) -> ItemId {
    ItemId::from_token(&WORLD_NAMESPACE, symbol)
}

fn parse_direction(word: &str) -> Option<Direction> {
    use Direction::*;
    Some(match word.to_ascii_lowercase().as_str() {
        "north" | "n" => North,
        "south" | "s" => South,
        "east" | "e" => East,
        "west" | "w" => West,
        "northeast" | "ne" => NorthEast,
        "northwest" | "nw" => NorthWest,
        "southeast" | "se" => SouthEast,
        "southwest" | "sw" => SouthWest,
        "up" | "u" => Up,
        "down" | "d" => Down,
        "in" => In,
        "out" => Out,
        _ => return None,
    })
}

fn convert_exit(room_symbol: &str, def: &ExitDef, known_rooms: &HashSet<String>) -> Result<Exit, LoadError> {
    let direction = parse_direction(&def.direction)
        .ok_or_else(|| LoadError::UnknownDirection(def.direction.clone(), room_symbol.to_string()))?;
    if !known_rooms.contains(&def.to) {
        return Err(LoadError::UnknownRoom(room_symbol.to_string(), def.to.clone()));
    }
    Ok(Exit {
        direction,
        destination: Some(location_id(&def.to)),
        door_id: None,
        blocked_message: def.barred_message.clone(),
        required_key: def.required_items.first().map(|i| item_id(i)),
    })
}

fn convert_room(def: &RoomDef, known_rooms: &HashSet<String>) -> Result<Location, LoadError> {
    let mut location = Location::new(location_id(&def.id), def.name.clone(), def.desc.clone());
    location.is_visited = def.visited;
    for exit in &def.exits {
        location.exits.push(convert_exit(&def.id, exit, known_rooms)?);
    }
    Ok(location)
}

fn resolve_parent(symbol: &str, location: &LocationRef, known_item_parents: &HashSet<String>) -> Result<Parent, LoadError> {
    Ok(match location {
        LocationRef::Inventory => Parent::Player,
        LocationRef::Nowhere => Parent::Nowhere,
        LocationRef::Room(id) => Parent::Location(location_id(id)),
        LocationRef::Item(id) | LocationRef::Npc(id) => {
            if !known_item_parents.contains(id) {
                return Err(LoadError::UnknownItemParent(symbol.to_string(), id.clone()));
            }
            Parent::Item(item_id(id))
        }
    })
}

fn convert_item(def: &ItemDef, known_item_parents: &HashSet<String>) -> Result<Item, LoadError> {
    let mut item = Item::new(item_id(&def.id), def.name.clone(), resolve_parent(&def.id, &def.location, known_item_parents)?);

    match &def.movability {
        Movability::Free => item.is_takable = true,
        Movability::Restricted { .. } => item.is_takable = true,
        Movability::Fixed { .. } => {
            item.is_takable = false;
            item.is_fixed = true;
            item.is_scenery = true;
        }
    }

    if let Some(state) = &def.container_state {
        item.is_container = true;
        item.is_openable = true;
        item.is_open = matches!(state, ContainerState::Open | ContainerState::TransparentOpen);
        item.is_lockable = matches!(
            state,
            ContainerState::Locked | ContainerState::TransparentLocked
        );
        item.is_locked = matches!(
            state,
            ContainerState::Locked | ContainerState::TransparentLocked
        );
        item.is_transparent = matches!(
            state,
            ContainerState::TransparentOpen | ContainerState::TransparentClosed | ContainerState::TransparentLocked
        );
    }

    for ability in &def.abilities {
        match ability {
            ItemAbility::Read => item.is_readable = true,
            ItemAbility::Ignite => item.is_device = true,
            _ => {}
        }
    }

    item.read_text = def.text.clone();
    Ok(item)
}

fn convert_npc(def: &NpcDef, known_item_parents: &HashSet<String>) -> Result<Item, LoadError> {
    let mut item = Item::new(item_id(&def.id), def.name.clone(), resolve_parent(&def.id, &def.location, known_item_parents)?);
    item.is_character = true;
    item.is_person = true;
    item.is_takable = false;
    item.read_text = Some(def.desc.clone());
    item.character_sheet = Some(CharacterSheet {
        strength: 10,
        constitution: 10,
        intelligence: 10,
        wisdom: 10,
        charisma: 10,
        armor_class: 10,
        attack_bonus: 0,
        max_health: def.max_hp as i32,
        health: def.max_hp as i32,
        consciousness: ConsciousnessLevel::Awake,
        general_condition: GeneralCondition::Fine,
        combat_condition: CombatCondition::None,
        morale: 0.5,
        bravery: 0.5,
        flee_threshold: 0.25,
        can_be_pacified: false,
        pacify_dc: 15,
    });
    Ok(item)
}

/// Builds a fresh `GameState` from a parsed `WorldDef`. NPC movement
/// schedules, spinners, triggers, and goals are content-author concerns the
/// engine wires up separately (via `TimerRegistry`/`HookRegistry`), not part
/// of the static state snapshot this function produces.
pub fn load_world(world: &WorldDef) -> Result<GameState, LoadError> {
    let known_rooms: HashSet<String> = world.rooms.iter().map(|r| r.id.clone()).collect();
    let known_item_parents: HashSet<String> = world
        .items
        .iter()
        .map(|i| i.id.clone())
        .chain(world.npcs.iter().map(|n| n.id.clone()))
        .collect();

    let mut locations = HashMap::new();
    for room in &world.rooms {
        let location = convert_room(room, &known_rooms)?;
        locations.insert(location.id, location);
    }

    let mut items = HashMap::new();
    for item_def in &world.items {
        let item = convert_item(item_def, &known_item_parents)?;
        items.insert(item.id, item);
    }
    for npc_def in &world.npcs {
        let npc = convert_npc(npc_def, &known_item_parents)?;
        items.insert(npc.id, npc);
    }

    let start_room = location_id(&world.game.player.start_room);
    if !locations.contains_key(&start_room) {
        return Err(LoadError::UnknownStartRoom(world.game.player.start_room.clone()));
    }

    let player = Player {
        current_location_id: start_room,
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
            max_health: world.game.player.max_hp as i32,
            health: world.game.player.max_hp as i32,
            consciousness: ConsciousnessLevel::Awake,
            general_condition: GeneralCondition::Fine,
            combat_condition: CombatCondition::None,
            morale: 0.5,
            bravery: 0.5,
            flee_threshold: 0.25,
            can_be_pacified: false,
            pacify_dc: 15,
        },
    };

    Ok(GameState {
        items,
        locations,
        player,
        global_flags: HashSet::new(),
        global_values: HashMap::new(),
        pronouns: HashMap::new(),
        active_fuses: HashMap::new(),
        active_daemons: HashSet::new(),
        combat_state: None,
        change_history: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amble_data::{GameDef, PlayerDef};

    fn minimal_world() -> WorldDef {
        WorldDef {
            game: GameDef {
                title: "Test".into(),
                slug: String::new(),
                author: String::new(),
                version: String::new(),
                blurb: String::new(),
                intro: "An empty hall.".into(),
                player: PlayerDef { name: "Ada".into(), description: String::new(), start_room: "hall".into(), max_hp: 10 },
                scoring: Default::default(),
            },
            rooms: vec![RoomDef { id: "hall".into(), name: "Hall".into(), desc: "A bare hall.".into(), visited: false, exits: vec![], overlays: vec![] }],
            items: vec![],
            npcs: vec![],
            spinners: vec![],
            triggers: vec![],
            goals: vec![],
        }
    }

    #[test]
    fn loads_player_into_the_start_room() {
        let state = load_world(&minimal_world()).unwrap();
        assert_eq!(state.player.current_location_id, location_id("hall"));
        assert_eq!(state.locations.len(), 1);
    }

    #[test]
    fn same_symbol_always_resolves_to_the_same_id() {
        assert_eq!(location_id("hall"), location_id("hall"));
        assert_ne!(location_id("hall"), location_id("cellar"));
    }

    #[test]
    fn missing_start_room_is_reported() {
        let mut world = minimal_world();
        world.game.player.start_room = "nowhere".into();
        assert!(matches!(load_world(&world), Err(LoadError::UnknownStartRoom(_))));
    }

    #[test]
    fn item_parented_to_an_unknown_item_is_reported() {
        let mut world = minimal_world();
        world.items.push(ItemDef {
            id: "coin".into(),
            name: "coin".into(),
            desc: "A coin.".into(),
            movability: Movability::Free,
            container_state: None,
            location: LocationRef::Item("nonexistent_pouch".into()),
            abilities: vec![],
            interaction_requires: Default::default(),
            text: None,
            consumable: None,
        });
        assert!(matches!(load_world(&world), Err(LoadError::UnknownItemParent(_, _))));
    }

    #[test]
    fn exit_to_unknown_room_is_reported() {
        let mut world = minimal_world();
        world.rooms[0].exits.push(ExitDef {
            direction: "north".into(),
            to: "nonexistent".into(),
            hidden: false,
            locked: false,
            required_flags: vec![],
            required_items: vec![],
            barred_message: None,
        });
        assert!(matches!(load_world(&world), Err(LoadError::UnknownRoom(_, _))));
    }
}
