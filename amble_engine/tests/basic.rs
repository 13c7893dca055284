use std::collections::HashMap;

use amble_engine::action::ActionResult;
use amble_engine::engine::Engine;
use amble_engine::event::HookRegistry;
use amble_engine::handlers::stock_handlers;
use amble_engine::health::{CharacterSheet, CombatCondition, ConsciousnessLevel, GeneralCondition};
use amble_engine::id::{FuseId, ItemId, LocationId};
use amble_engine::io::ScriptedIo;
use amble_engine::rng::ScriptedRngStream;
use amble_engine::turn::TimerRegistry;
use amble_engine::vocab::stock_vocabulary;
use amble_engine::world::{FuseState, GameState, Item, Location, Parent, Player};

fn sheet() -> CharacterSheet {
    CharacterSheet {
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
    }
}

fn new_state(loc: LocationId) -> GameState {
    GameState {
        items: HashMap::new(),
        locations: HashMap::from([(loc, Location::new(loc, "Study", "A small, book-lined study."))]),
        player: Player { current_location_id: loc, score: 0, moves: 0, inventory_capacity: -1, character_sheet: sheet() },
        global_flags: Default::default(),
        global_values: HashMap::new(),
        pronouns: HashMap::new(),
        active_fuses: HashMap::new(),
        active_daemons: Default::default(),
        combat_state: None,
        change_history: Vec::new(),
    }
}

fn engine_with(state: GameState) -> Engine {
    Engine::new(
        state,
        stock_vocabulary(),
        stock_handlers(),
        HookRegistry::default(),
        TimerRegistry::default(),
        Box::new(ScriptedRngStream::new(vec![], vec![])),
    )
}

fn last_message(io: &ScriptedIo) -> &str {
    &io.output.last().expect("expected at least one message").0
}

#[test]
fn taking_from_a_closed_box_is_rejected() {
    let loc = LocationId::new();
    let mut state = new_state(loc);
    let box_id = ItemId::new();
    let mut box_item = Item::new(box_id, "box", Parent::Location(loc));
    box_item.is_container = true;
    box_item.is_openable = true;
    box_item.is_open = false;
    state.items.insert(box_id, box_item);
    let coin_id = ItemId::new();
    let mut coin = Item::new(coin_id, "coin", Parent::Item(box_id));
    coin.is_takable = true;
    state.items.insert(coin_id, coin);

    let mut engine = engine_with(state);
    let mut io = ScriptedIo::default();
    engine.process_input("take coin", &mut io);

    assert_eq!(last_message(&io), "That's closed.");
    assert_eq!(engine.state.item(coin_id).unwrap().parent, Parent::Item(box_id));
    assert_eq!(engine.state.player.moves, 0, "a rejected take should not consume a turn");
}

#[test]
fn unlocking_with_the_wrong_key_fails_and_stays_locked() {
    let loc = LocationId::new();
    let mut state = new_state(loc);
    let door_id = ItemId::new();
    let real_key_id = ItemId::new();
    let wrong_key_id = ItemId::new();

    let mut door = Item::new(door_id, "door", Parent::Location(loc));
    door.is_lockable = true;
    door.is_locked = true;
    door.lock_key = Some(real_key_id);
    state.items.insert(door_id, door);

    let mut wrong_key = Item::new(wrong_key_id, "key", Parent::Player);
    wrong_key.adjectives.insert("brass".into());
    wrong_key.is_takable = true;
    state.items.insert(wrong_key_id, wrong_key);

    let mut real_key = Item::new(real_key_id, "key", Parent::Location(loc));
    real_key.adjectives.insert("iron".into());
    real_key.is_takable = true;
    state.items.insert(real_key_id, real_key);

    let mut engine = engine_with(state);
    let mut io = ScriptedIo::default();
    engine.process_input("unlock door with brass key", &mut io);

    assert_eq!(last_message(&io), "That key doesn't fit.");
    assert!(engine.state.item(door_id).unwrap().is_locked);
    assert_eq!(engine.state.player.moves, 0);
}

#[test]
fn turning_on_a_held_lantern_lights_a_dark_room() {
    let loc = LocationId::new();
    let mut state = new_state(loc);
    state.locations.get_mut(&loc).unwrap().is_lit = false;
    let lantern_id = ItemId::new();
    let mut lantern = Item::new(lantern_id, "lantern", Parent::Player);
    lantern.is_light_source = true;
    lantern.is_on = false;
    lantern.is_takable = true;
    state.items.insert(lantern_id, lantern);

    let mut engine = engine_with(state);
    let mut io = ScriptedIo::default();
    engine.process_input("turn on lantern", &mut io);

    assert_eq!(last_message(&io), "The lantern is now on.");
    assert!(engine.state.item(lantern_id).unwrap().is_on);
}

#[test]
fn taking_all_in_an_empty_room_reports_nothing_to_take() {
    let loc = LocationId::new();
    let state = new_state(loc);
    let mut engine = engine_with(state);
    let mut io = ScriptedIo::default();
    engine.process_input("take all", &mut io);

    assert_eq!(last_message(&io), "There's nothing here to take.");
    assert_eq!(engine.state.player.moves, 0);
}

#[test]
fn a_two_turn_fuse_fires_after_its_second_tick() {
    let loc = LocationId::new();
    let state = new_state(loc);
    let mut engine = engine_with(state);
    let fuse_id = FuseId::new();
    engine.state.active_fuses.insert(fuse_id, FuseState { turns_remaining: 2 });
    engine.timers.register_fuse(fuse_id, Box::new(|_state| ActionResult::with_message("The charge detonates!")));

    let mut io = ScriptedIo::default();
    engine.process_input("wait", &mut io);
    assert!(engine.state.active_fuses.contains_key(&fuse_id));
    assert!(!io.output.iter().any(|(text, _)| text.contains("detonates")));

    let mut io2 = ScriptedIo::default();
    engine.process_input("wait", &mut io2);
    assert!(!engine.state.active_fuses.contains_key(&fuse_id));
    assert!(io2.output.iter().any(|(text, _)| text.contains("detonates")));
}

#[test]
fn attacking_a_character_starts_a_combat_round() {
    let loc = LocationId::new();
    let mut state = new_state(loc);
    let goblin_id = ItemId::new();
    let mut goblin = Item::new(goblin_id, "goblin", Parent::Location(loc));
    goblin.is_character = true;
    goblin.character_sheet = Some(sheet());
    state.items.insert(goblin_id, goblin);

    let rng = ScriptedRngStream::new(vec![18, 4, 18, 4, 18, 4, 18, 4], vec![false, false, false, false]);
    let mut engine = Engine::new(
        state,
        stock_vocabulary(),
        stock_handlers(),
        HookRegistry::default(),
        TimerRegistry::default(),
        Box::new(rng),
    );

    let mut io = ScriptedIo::default();
    engine.process_input("attack goblin", &mut io);
    assert!(engine.state.combat_state.is_some(), "attacking a character should start a fight");
    assert_eq!(engine.state.combat_state.as_ref().unwrap().enemy_id, goblin_id);

    let mut io2 = ScriptedIo::default();
    engine.process_input("attack goblin", &mut io2);
    assert!(!io2.output.is_empty(), "the combat round should have narrated something");
}
