//! The stock verb library (§6.4): one `ActionHandler` per built-in verb.
//! All are optional to wire up -- the core only specifies semantics, not
//! text -- but a deployment normally registers the whole set.
//!
//! Grounded in the teacher's `repl.rs` verb dispatch for *which* behaviors
//! exist and their player-facing contract, restructured from a flat
//! `match` into one `ActionHandler` impl per verb (§9 "dynamic dispatch
//! over verbs") so each can be validated/overridden independently.

use crate::action::{ActionContext, ActionHandler, ActionResult, ExecutionFlowOrDefault};
use crate::change::{ItemFlag, StateChange};
use crate::combat::CombatState;
use crate::command::ResolvedObject;
use crate::error::ActionResponse;
use crate::scope::{is_lit, is_lit_after_simulated_change};
use crate::vocab::{ObjectCondition, SyntaxRule, TokenType, Verb};
use crate::world::Parent;

fn single_direct_object(ctx: &ActionContext) -> Result<crate::id::ItemId, ActionResponse> {
    match ctx.command.direct_object.as_ref().and_then(ResolvedObject::single) {
        Some(id) => Ok(id),
        None => Err(ActionResponse::UnknownEntity("that".into())),
    }
}

pub struct LookHandler;
impl ActionHandler for LookHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn consumes_turn(&self) -> bool {
        false
    }
    fn validate(&self, _ctx: &ActionContext) -> Result<(), ActionResponse> {
        Ok(())
    }
    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let loc = ctx.state.player_location().ok_or(ActionResponse::InternalEngineError("no current location".into()))?;
        if !is_lit(ctx.state, loc.id) {
            return Err(ActionResponse::RoomIsDark);
        }
        Ok(ActionResult::with_message(format!("{}\n\n{}", loc.name, loc.description)))
    }
}

pub struct TakeHandler;
impl ActionHandler for TakeHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if let Parent::Item(container_id) = item.parent {
            if let Some(container) = ctx.state.item(container_id) {
                if container.is_container && container.is_openable && !container.is_open {
                    return Err(ActionResponse::ContainerIsClosed(container_id));
                }
            }
        }
        if !item.is_takable {
            return Err(ActionResponse::ItemNotTakable(id));
        }
        let occupied = ctx.state.occupied_size(Parent::Player);
        if ctx.state.player.inventory_capacity >= 0 && occupied + item.size > ctx.state.player.inventory_capacity {
            return Err(ActionResponse::PlayerCannotCarryMore);
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        Ok(ActionResult {
            message: Some(format!("You take the {}.", item.name)),
            changes: vec![StateChange::MoveItem { id, to_parent: Parent::Player, expected_old_parent: None }],
            effects: vec![],
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct DropHandler;
impl ActionHandler for DropHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if item.parent != Parent::Player {
            return Err(ActionResponse::ItemNotHeld(id));
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        let location = ctx.state.player.current_location_id;
        Ok(ActionResult {
            message: Some(format!("You drop the {}.", item.name)),
            changes: vec![StateChange::MoveItem { id, to_parent: Parent::Location(location), expected_old_parent: None }],
            effects: vec![],
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct OpenHandler;
impl ActionHandler for OpenHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if !item.is_openable {
            return Err(ActionResponse::ItemNotOpenable(id));
        }
        if item.is_open {
            return Err(ActionResponse::ItemAlreadyOpen(id));
        }
        if item.is_locked {
            return Err(ActionResponse::ItemIsLocked(id));
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        Ok(ActionResult {
            message: Some(format!("You open the {}.", item.name)),
            changes: vec![StateChange::SetItemFlag { id, flag: ItemFlag::Open, value: true }],
            effects: vec![],
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct UnlockHandler;
impl ActionHandler for UnlockHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if !item.is_lockable {
            return Err(ActionResponse::ItemNotUnlockable(id));
        }
        if !item.is_locked {
            return Err(ActionResponse::ItemIsUnlocked(id));
        }
        let key_id = ctx.command.indirect_object.as_ref().and_then(ResolvedObject::single);
        let key_id = key_id.ok_or(ActionResponse::ToolMissing("key".into()))?;
        let key_item = ctx.state.item(key_id).ok_or(ActionResponse::UnknownEntity(key_id.to_string()))?;
        if key_item.parent != Parent::Player {
            return Err(ActionResponse::ItemNotHeld(key_id));
        }
        if item.lock_key != Some(key_id) {
            return Err(ActionResponse::WrongKey(key_id, id));
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        Ok(ActionResult {
            message: Some(format!("You unlock the {}.", item.name)),
            changes: vec![StateChange::SetItemFlag { id, flag: ItemFlag::Locked, value: false }],
            effects: vec![],
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct TurnOnHandler;
impl ActionHandler for TurnOnHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    /// A dark room's own light source must be reachable to turn on in the
    /// first place -- scope.rs's light-in-darkness exception covers that --
    /// so this handler doesn't need the default light gate turned against it.
    fn requires_light(&self) -> bool {
        false
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if !item.is_device && !item.is_light_source {
            return Err(ActionResponse::PrerequisiteNotMet("That has no switch.".into()));
        }
        if item.is_on {
            return Err(ActionResponse::Custom("That's already on.".into()));
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let id = single_direct_object(ctx)?;
        let item = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        let location = ctx.state.player.current_location_id;
        let was_dark = !is_lit(ctx.state, location);
        let mut effects = vec![];
        if was_dark && item.is_light_source && is_lit_after_simulated_change(ctx.state, location, id, Some(true), None) {
            effects.push(crate::action::SideEffect::EmitNarrative("Light floods the room.".into()));
        }
        Ok(ActionResult {
            message: Some(format!("The {} is now on.", item.name)),
            changes: vec![StateChange::SetItemFlag { id, flag: ItemFlag::On, value: true }],
            effects,
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct InventoryHandler;
impl ActionHandler for InventoryHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn consumes_turn(&self) -> bool {
        false
    }
    fn validate(&self, _ctx: &ActionContext) -> Result<(), ActionResponse> {
        Ok(())
    }
    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        let held: Vec<&str> = ctx.state.items_in(Parent::Player).iter().map(|i| i.name.as_str()).collect();
        let message = if held.is_empty() {
            "You aren't carrying anything.".to_string()
        } else {
            format!("You are carrying: {}.", held.join(", "))
        };
        Ok(ActionResult::with_message(message))
    }
}

pub struct WaitHandler;
impl ActionHandler for WaitHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, _ctx: &ActionContext) -> Result<(), ActionResponse> {
        Ok(())
    }
    fn process(&self, _ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message("Time passes."))
    }
}

pub struct ScoreHandler;
impl ActionHandler for ScoreHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn consumes_turn(&self) -> bool {
        false
    }
    fn validate(&self, _ctx: &ActionContext) -> Result<(), ActionResponse> {
        Ok(())
    }
    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message(format!(
            "Score: {} in {} moves.",
            ctx.state.player.score, ctx.state.player.moves
        )))
    }
}

pub struct QuitHandler;
impl ActionHandler for QuitHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn consumes_turn(&self) -> bool {
        false
    }
    fn ends_game(&self) -> bool {
        true
    }
    fn validate(&self, _ctx: &ActionContext) -> Result<(), ActionResponse> {
        Ok(())
    }
    fn process(&self, _ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message("Goodbye."))
    }
}

/// Either engages a new opponent (starting `CombatState`) or, mid-fight,
/// just presses the attack -- the actual roll happens in
/// `Engine::run_combat_round` once the turn advances, per §4.9's "combat
/// is expressed entirely through handlers and changes" design note.
pub struct AttackHandler;
impl ActionHandler for AttackHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        if ctx.state.combat_state.is_some() {
            return Ok(());
        }
        let id = single_direct_object(ctx)?;
        let target = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        if !target.is_character {
            return Err(ActionResponse::PrerequisiteNotMet("You can't fight that.".into()));
        }
        Ok(())
    }

    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        if ctx.state.combat_state.is_some() {
            return Ok(ActionResult::with_message("You press the attack!"));
        }
        let id = single_direct_object(ctx)?;
        let target = ctx.state.item(id).ok_or(ActionResponse::UnknownEntity(id.to_string()))?;
        Ok(ActionResult {
            message: Some(format!("You square off against {}, ready to fight.", target.name)),
            changes: vec![StateChange::SetCombatState(Some(CombatState::start(ctx.state, id)))],
            effects: vec![],
            execution_flow: ExecutionFlowOrDefault(crate::action::ExecutionFlow::Append),
        })
    }
}

pub struct DefendHandler;
impl ActionHandler for DefendHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        if ctx.state.combat_state.is_none() {
            return Err(ActionResponse::PrerequisiteNotMet("There's nothing to defend against.".into()));
        }
        Ok(())
    }
    fn process(&self, _ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message("You raise your guard."))
    }
}

pub struct FleeHandler;
impl ActionHandler for FleeHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        if ctx.state.combat_state.is_none() {
            return Err(ActionResponse::PrerequisiteNotMet("There's nothing to flee from.".into()));
        }
        Ok(())
    }
    fn process(&self, _ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message("You look for a way out."))
    }
}

pub struct TalkHandler;
impl ActionHandler for TalkHandler {
    fn synonyms(&self) -> &[Verb] {
        const V: [Verb; 0] = [];
        &V
    }
    fn syntax(&self) -> &[SyntaxRule] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse> {
        if ctx.state.combat_state.is_none() {
            return Err(ActionResponse::PrerequisiteNotMet("There's no one to talk to.".into()));
        }
        Ok(())
    }
    fn process(&self, _ctx: &ActionContext) -> Result<ActionResult, ActionResponse> {
        Ok(ActionResult::with_message("You try to talk your way out of this."))
    }
}

/// The pattern `[Verb, Particle("all")]` / bare `[Verb]` helper content
/// authors reuse across the stock verbs above.
pub fn bare_verb_rule() -> SyntaxRule {
    SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None)
}

/// The default [`crate::engine::HandlerRegistry`], wired up with one
/// built-in verb per stock handler and the same synonyms
/// [`crate::vocab::stock_vocabulary`] registers them under.
pub fn stock_handlers() -> crate::engine::HandlerRegistry {
    let mut registry = crate::engine::HandlerRegistry::default();
    registry.register(Verb::new("look"), &["l"], Box::new(LookHandler));
    registry.register(Verb::new("inventory"), &["i", "inv"], Box::new(InventoryHandler));
    registry.register(Verb::new("wait"), &["z"], Box::new(WaitHandler));
    registry.register(Verb::new("score"), &[], Box::new(ScoreHandler));
    registry.register(Verb::new("quit"), &["q"], Box::new(QuitHandler));
    registry.register(Verb::new("take"), &["get", "grab"], Box::new(TakeHandler));
    registry.register(Verb::new("drop"), &[], Box::new(DropHandler));
    registry.register(Verb::new("open"), &[], Box::new(OpenHandler));
    registry.register(Verb::new("unlock"), &[], Box::new(UnlockHandler));
    registry.register(Verb::new("turn"), &[], Box::new(TurnOnHandler));
    registry.register(Verb::new("attack"), &["hit", "fight"], Box::new(AttackHandler));
    registry.register(Verb::new("defend"), &["block"], Box::new(DefendHandler));
    registry.register(Verb::new("flee"), &["run"], Box::new(FleeHandler));
    registry.register(Verb::new("talk"), &["yield", "surrender"], Box::new(TalkHandler));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::world::{tests_support::empty_state, Item};

    #[test]
    fn take_from_closed_box_is_rejected() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        let box_id = crate::id::ItemId::new();
        let mut box_item = Item::new(box_id, "box", Parent::Location(loc));
        box_item.is_container = true;
        box_item.is_openable = true;
        box_item.is_open = false;
        state.items.insert(box_id, box_item);
        let gem_id = crate::id::ItemId::new();
        let mut gem = Item::new(gem_id, "gem", Parent::Item(box_id));
        gem.is_takable = true;
        state.items.insert(gem_id, gem);

        let mut command = Command::new(Verb::new("take"));
        command.direct_object = Some(ResolvedObject::Single(gem_id));
        let ctx = ActionContext::new(&command, &state);

        let result = TakeHandler.validate(&ctx);
        assert_eq!(result, Err(ActionResponse::ContainerIsClosed(box_id)));
    }

    #[test]
    fn unlock_with_wrong_key_is_rejected() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        let door_id = crate::id::ItemId::new();
        let key_id = crate::id::ItemId::new();
        let wrong_key_id = crate::id::ItemId::new();
        let mut door = Item::new(door_id, "door", Parent::Location(loc));
        door.is_lockable = true;
        door.is_locked = true;
        door.lock_key = Some(key_id);
        state.items.insert(door_id, door);
        state.items.insert(wrong_key_id, Item::new(wrong_key_id, "brass key", Parent::Player));

        let mut command = Command::new(Verb::new("unlock"));
        command.direct_object = Some(ResolvedObject::Single(door_id));
        command.indirect_object = Some(ResolvedObject::Single(wrong_key_id));
        let ctx = ActionContext::new(&command, &state);

        let result = UnlockHandler.validate(&ctx);
        assert_eq!(result, Err(ActionResponse::WrongKey(wrong_key_id, door_id)));
    }

    #[test]
    fn turning_on_a_held_lantern_lights_a_dark_room() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        state.locations.get_mut(&loc).unwrap().is_lit = false;
        let lantern_id = crate::id::ItemId::new();
        let mut lantern = Item::new(lantern_id, "lantern", Parent::Player);
        lantern.is_light_source = true;
        lantern.is_device = true;
        lantern.is_on = false;
        state.items.insert(lantern_id, lantern);

        let mut command = Command::new(Verb::new("turn on"));
        command.direct_object = Some(ResolvedObject::Single(lantern_id));
        let ctx = ActionContext::new(&command, &state);

        TurnOnHandler.validate(&ctx).unwrap();
        let result = TurnOnHandler.process(&ctx).unwrap();
        assert_eq!(result.message.unwrap(), "The lantern is now on.");
        assert!(result
            .effects
            .iter()
            .any(|e| matches!(e, crate::action::SideEffect::EmitNarrative(_))));
    }

    #[test]
    fn dropping_an_unheld_item_is_rejected() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        let rock_id = crate::id::ItemId::new();
        state.items.insert(rock_id, Item::new(rock_id, "rock", Parent::Location(loc)));
        let mut command = Command::new(Verb::new("drop"));
        command.direct_object = Some(ResolvedObject::Single(rock_id));
        let ctx = ActionContext::new(&command, &state);
        assert_eq!(DropHandler.validate(&ctx), Err(ActionResponse::ItemNotHeld(rock_id)));
    }

    #[test]
    fn attacking_a_character_starts_combat() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        let goblin_id = crate::id::ItemId::new();
        let mut goblin = Item::new(goblin_id, "goblin", Parent::Location(loc));
        goblin.is_character = true;
        state.items.insert(goblin_id, goblin);

        let mut command = Command::new(Verb::new("attack"));
        command.direct_object = Some(ResolvedObject::Single(goblin_id));
        let ctx = ActionContext::new(&command, &state);

        AttackHandler.validate(&ctx).unwrap();
        let result = AttackHandler.process(&ctx).unwrap();
        assert_eq!(
            result.changes,
            vec![StateChange::SetCombatState(Some(crate::combat::CombatState::new(goblin_id)))]
        );
    }

    #[test]
    fn attacking_non_character_scenery_is_rejected() {
        let mut state = empty_state();
        let loc = state.player.current_location_id;
        let statue_id = crate::id::ItemId::new();
        state.items.insert(statue_id, Item::new(statue_id, "statue", Parent::Location(loc)));
        let mut command = Command::new(Verb::new("attack"));
        command.direct_object = Some(ResolvedObject::Single(statue_id));
        let ctx = ActionContext::new(&command, &state);
        assert!(AttackHandler.validate(&ctx).is_err());
    }

    #[test]
    fn fleeing_outside_combat_is_rejected() {
        let state = empty_state();
        let command = Command::new(Verb::new("flee"));
        let ctx = ActionContext::new(&command, &state);
        assert!(FleeHandler.validate(&ctx).is_err());
    }

    #[test]
    fn defending_mid_combat_is_accepted() {
        let mut state = empty_state();
        state.combat_state = Some(crate::combat::CombatState::new(crate::id::ItemId::new()));
        let command = Command::new(Verb::new("defend"));
        let ctx = ActionContext::new(&command, &state);
        assert!(DefendHandler.validate(&ctx).is_ok());
    }
}
