//! The single-threaded cooperative engine actor (§5/§9): owns `GameState`,
//! the vocabulary, the verb/hook/timer registries, and the one `RngStream`,
//! and drives one turn's data flow end to end.
//!
//! Grounded in the teacher's `run_repl` (repl.rs) for the turn's shape --
//! read input, parse, dispatch, advance world time, print -- generalized
//! from the teacher's own flat `match`-per-verb dispatch (`dispatch_command`)
//! into the registry-driven `ActionHandler` lookup this spec's §9 "dynamic
//! dispatch over verbs" design note calls for.

use std::collections::HashMap;

use log::{info, warn};

use crate::action::{ActionContext, ActionHandler, SideEffect};
use crate::change::StateChange;
use crate::error::{ActionResponse, ParseError};
use crate::event::{HookRegistry, ItemEvent, LocationEvent};
use crate::id::LocationId;
use crate::io::{IoCollaborator, Style};
use crate::parser::parse_command;
use crate::rng::RngStream;
use crate::scope::{is_lit, reachable_items_by_player};
use crate::turn::{start_fuse_change, TimerRegistry};
use crate::vocab::{Verb, Vocabulary};
use crate::world::GameState;

/// Control-flow signal a handler's dispatch can produce, mirroring the
/// teacher's own `ReplControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineControl {
    Continue,
    Quit,
}

/// Verb word -> handler lookup, built once from every handler's declared
/// synonyms (§9 "dynamic dispatch over verbs").
#[derive(Default)]
pub struct HandlerRegistry {
    by_word: HashMap<String, usize>,
    handlers: Vec<Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn register(&mut self, verb: Verb, synonyms: &[&str], handler: Box<dyn ActionHandler>) {
        let idx = self.handlers.len();
        self.by_word.insert(verb.0.clone(), idx);
        for syn in synonyms {
            self.by_word.insert(syn.to_string(), idx);
        }
        self.handlers.push(handler);
    }

    pub fn get(&self, verb: &Verb) -> Option<&dyn ActionHandler> {
        self.by_word.get(&verb.0).map(|&idx| self.handlers[idx].as_ref())
    }
}

/// Owns every piece of mutable state and every content-provided registry a
/// running game needs. One `Engine` is one game in progress.
pub struct Engine {
    pub state: GameState,
    pub vocab: Vocabulary,
    pub handlers: HandlerRegistry,
    pub hooks: HookRegistry,
    pub timers: TimerRegistry,
    pub rng: Box<dyn RngStream>,
}

impl Engine {
    pub fn new(state: GameState, vocab: Vocabulary, handlers: HandlerRegistry, hooks: HookRegistry, timers: TimerRegistry, rng: Box<dyn RngStream>) -> Self {
        Self { state, vocab, handlers, hooks, timers, rng }
    }

    /// Runs one full turn: parse, dispatch, apply, and (if the handler
    /// consumed a turn) advance timers and run combat. Returns whether the
    /// REPL should keep going.
    pub fn process_input(&mut self, input: &str, io: &mut dyn IoCollaborator) -> EngineControl {
        let command = match parse_command(input, &self.vocab, &self.state) {
            Ok(command) => command,
            Err(err) => {
                io.write(&describe_parse_error(&err), Style::Normal);
                return EngineControl::Continue;
            }
        };

        let location = self.state.player.current_location_id;
        let lit_before = is_lit(&self.state, location);
        let items_in_scope: Vec<_> = reachable_items_by_player(&self.state, location).into_iter().collect();

        if let Some(result) = self.hooks.dispatch_location(location, LocationEvent::BeforeTurn, Some(&command), &self.state) {
            if let Some(message) = &result.message {
                io.write(message, Style::Normal);
            }
            if let Err(err) = self.state.apply_all(result.changes, self.state.player.moves) {
                warn!("before-turn location hook produced an invalid change: {err}");
            }
        }
        if let Some(result) = self.hooks.dispatch_items(items_in_scope.clone(), ItemEvent::BeforeTurn, Some(&command), &self.state) {
            if let Some(message) = &result.message {
                io.write(message, Style::Normal);
            }
            if let Err(err) = self.state.apply_all(result.changes, self.state.player.moves) {
                warn!("before-turn item hook produced an invalid change: {err}");
            }
        }

        let Some(handler) = self.handlers.get(&command.verb) else {
            io.write(&ActionResponse::UnknownVerb(command.verb.0.clone()).to_string(), Style::Normal);
            return EngineControl::Continue;
        };

        if handler.requires_light() && !is_lit(&self.state, location) {
            io.write(&ActionResponse::RoomIsDark.to_string(), Style::Normal);
            return EngineControl::Continue;
        }

        let ctx = ActionContext::new(&command, &self.state);
        if let Err(err) = handler.validate(&ctx) {
            io.write(&err.to_string(), Style::Normal);
            return EngineControl::Continue;
        }

        let result = match handler.process(&ctx) {
            Ok(result) => result,
            Err(err) => {
                io.write(&err.to_string(), Style::Normal);
                return EngineControl::Continue;
            }
        };
        drop(ctx);

        if let Some(message) = &result.message {
            io.write(message, Style::Normal);
        }
        if let Err(err) = self.state.apply_all(result.changes.clone(), self.state.player.moves) {
            warn!("handler for \"{}\" produced an invalid change: {err}", command.verb.0);
        }

        for effect in &result.effects {
            self.apply_side_effect(effect, io);
        }

        let ctx = ActionContext::new(&command, &self.state);
        handler.post_process(&ctx, &result);
        drop(ctx);

        if handler.ends_game() {
            return EngineControl::Quit;
        }

        if handler.consumes_turn() {
            self.advance_turn(&command, io, location, lit_before);
        }

        EngineControl::Continue
    }

    fn apply_side_effect(&mut self, effect: &SideEffect, io: &mut dyn IoCollaborator) {
        match effect {
            SideEffect::StartFuse { id, turns } => {
                let change = start_fuse_change(*id, *turns);
                if let Err(err) = self.state.apply(change, self.state.player.moves) {
                    warn!("failed to start fuse: {err}");
                }
            }
            SideEffect::CancelFuse { id } => {
                if let Err(err) = self.state.apply(StateChange::RemoveActiveFuse { id: *id }, self.state.player.moves) {
                    warn!("failed to cancel fuse: {err}");
                }
            }
            SideEffect::StartDaemon { id } => {
                if let Err(err) = self.state.apply(StateChange::AddActiveDaemon { id: *id }, self.state.player.moves) {
                    warn!("failed to start daemon: {err}");
                }
            }
            SideEffect::CancelDaemon { id } => {
                if let Err(err) = self.state.apply(StateChange::RemoveActiveDaemon { id: *id }, self.state.player.moves) {
                    warn!("failed to cancel daemon: {err}");
                }
            }
            SideEffect::ScheduleEnemyReturn { enemy, turns } => {
                info!("enemy {enemy} scheduled to return in {turns} turns");
            }
            SideEffect::EmitNarrative(text) => io.write(text, Style::Normal),
        }
    }

    /// Increments the move counter, advances fuses/daemons (§4.8), runs the
    /// current combat round if one is active (§4.9), then fires item
    /// `afterTurn`, location `afterTurn`, and -- if the player moved this
    /// turn -- the new location's `onEnter`, in that order (§4.7 step 5-6).
    /// Finally redescribes the current location if the player moved or the
    /// location just became lit (§4.8 step 6).
    fn advance_turn(&mut self, command: &crate::command::Command, io: &mut dyn IoCollaborator, location_before: LocationId, lit_before: bool) {
        let turn = self.state.player.moves;
        if let Err(err) = self.state.apply(StateChange::IncrementPlayerMoves, turn) {
            warn!("failed to increment move counter: {err}");
        }

        let outcome = crate::turn::advance_timers(&self.state, self.state.player.moves, &self.timers);
        if let Err(err) = self.state.apply_all(outcome.changes, self.state.player.moves) {
            warn!("failed to apply timer changes: {err}");
        }
        for result in &outcome.results {
            if let Some(message) = &result.message {
                io.write(message, Style::Normal);
            }
            if let Err(err) = self.state.apply_all(result.changes.clone(), self.state.player.moves) {
                warn!("failed to apply timer-fired change: {err}");
            }
        }

        if self.state.combat_state.is_some() {
            self.run_combat_round(command, io);
        }

        let location = self.state.player.current_location_id;
        let items_in_scope: Vec<_> = reachable_items_by_player(&self.state, location).into_iter().collect();
        if let Some(result) = self.hooks.dispatch_items(items_in_scope, ItemEvent::AfterTurn, None, &self.state) {
            if let Some(message) = &result.message {
                io.write(message, Style::Normal);
            }
            if let Err(err) = self.state.apply_all(result.changes, self.state.player.moves) {
                warn!("after-turn item hook produced an invalid change: {err}");
            }
        }
        if let Some(result) = self.hooks.dispatch_location(location, LocationEvent::AfterTurn, None, &self.state) {
            if let Some(message) = &result.message {
                io.write(message, Style::Normal);
            }
            if let Err(err) = self.state.apply_all(result.changes, self.state.player.moves) {
                warn!("after-turn location hook produced an invalid change: {err}");
            }
        }

        let moved = location != location_before;
        if moved {
            if let Some(result) = self.hooks.dispatch_location(location, LocationEvent::OnEnter, None, &self.state) {
                if let Some(message) = &result.message {
                    io.write(message, Style::Normal);
                }
                if let Err(err) = self.state.apply_all(result.changes, self.state.player.moves) {
                    warn!("on-enter location hook produced an invalid change: {err}");
                }
            }
        }

        let newly_lit = !moved && !lit_before && is_lit(&self.state, location);
        if moved || newly_lit {
            self.describe_location(location, io);
        }
    }

    /// Prints the current location's name and description, or the standard
    /// darkness message if it has no light (§4.8 step 6).
    fn describe_location(&self, location: LocationId, io: &mut dyn IoCollaborator) {
        let Some(loc) = self.state.location(location) else { return };
        if is_lit(&self.state, location) {
            io.write(&format!("{}\n\n{}", loc.name, loc.description), Style::Normal);
        } else {
            io.write(&ActionResponse::RoomIsDark.to_string(), Style::Normal);
        }
    }

    /// Resolves one `combat::resolve_round`, prints/applies each event's
    /// translation in order, folds damage/condition back into the player's
    /// and enemy's `CharacterSheet`s, and replaces `combat_state` with
    /// whatever the round produced (§4.9.3).
    fn run_combat_round(&mut self, command: &crate::command::Command, io: &mut dyn IoCollaborator) {
        let Some(combat) = self.state.combat_state.clone() else { return };
        let location = self.state.player.current_location_id;
        let action = combat_action_from_command(command);

        let outcome = crate::combat::resolve_round(&self.state, &combat, action, &mut *self.rng);

        for event in &outcome.events {
            let (message, changes, effects) = crate::combat::translate_event(event, &combat, location);
            io.write(&message, Style::Normal);
            if let Err(err) = self.state.apply_all(changes, self.state.player.moves) {
                warn!("combat event produced an invalid change: {err}");
            }
            for effect in &effects {
                self.apply_side_effect(effect, io);
            }

            let player_sheet = crate::combat::apply_health_event(self.state.player.character_sheet.clone(), event);
            if player_sheet != self.state.player.character_sheet {
                if let Err(err) = self
                    .state
                    .apply(StateChange::SetPlayerCharacterSheet(Box::new(player_sheet)), self.state.player.moves)
                {
                    warn!("failed to apply player health event: {err}");
                }
            }
            if let Some(enemy_sheet) = self.state.item(combat.enemy_id).and_then(|i| i.character_sheet.clone()) {
                let updated = crate::combat::apply_health_event(enemy_sheet.clone(), event);
                if updated != enemy_sheet {
                    if let Err(err) = self.state.apply(
                        StateChange::SetItemCharacterSheet { id: combat.enemy_id, sheet: Box::new(updated) },
                        self.state.player.moves,
                    ) {
                        warn!("failed to apply enemy health event: {err}");
                    }
                }
            }
        }

        if let Err(err) = self.state.apply(StateChange::SetCombatState(outcome.next_state), self.state.player.moves) {
            warn!("failed to update combat state: {err}");
        }
    }
}

/// Maps a dispatched command onto the combat action it represents; any verb
/// the combat system doesn't recognize becomes `CombatAction::Special`,
/// which still gives the enemy a turn without the player landing a blow.
fn combat_action_from_command(command: &crate::command::Command) -> crate::combat::CombatAction {
    use crate::combat::CombatAction;
    match command.verb.0.as_str() {
        "attack" | "hit" | "fight" => CombatAction::Attack,
        "defend" | "block" => CombatAction::Defend,
        "flee" | "run" => CombatAction::Flee(command.direction),
        "talk" | "yield" | "surrender" => CombatAction::Talk(command.particle.clone()),
        other => CombatAction::Special(other.to_string()),
    }
}

fn describe_parse_error(err: &ParseError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionResponse;
    use crate::handlers::{LookHandler, QuitHandler, WaitHandler};
    use crate::io::ScriptedIo;
    use crate::rng::StdRngStream;
    use crate::vocab::{ObjectCondition, SyntaxRule, TokenType, VerbEntry};
    use crate::world::tests_support::empty_state;

    fn vocab_with(words: &[&str]) -> Vocabulary {
        Vocabulary {
            verbs: words
                .iter()
                .map(|w| VerbEntry {
                    verb: Verb::new(*w),
                    synonyms: Default::default(),
                    rules: vec![SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None)],
                })
                .collect(),
            noise_words: Default::default(),
        }
    }

    fn engine_with(words: &[&str]) -> Engine {
        let mut handlers = HandlerRegistry::default();
        handlers.register(Verb::new("look"), &["l"], Box::new(LookHandler));
        handlers.register(Verb::new("wait"), &["z"], Box::new(WaitHandler));
        handlers.register(Verb::new("quit"), &["q"], Box::new(QuitHandler));
        Engine::new(
            empty_state(),
            vocab_with(words),
            handlers,
            HookRegistry::default(),
            TimerRegistry::default(),
            Box::new(StdRngStream::from_seed(1)),
        )
    }

    #[test]
    fn unknown_word_does_not_consume_a_turn() {
        let mut engine = engine_with(&["look"]);
        let mut io = ScriptedIo::default();
        let control = engine.process_input("frobnicate", &mut io);
        assert_eq!(control, EngineControl::Continue);
        assert_eq!(engine.state.player.moves, 0);
        assert_eq!(io.output[0].0, ActionResponse::UnknownVerb("frobnicate".into()).to_string());
    }

    #[test]
    fn waiting_consumes_a_turn() {
        let mut engine = engine_with(&["wait"]);
        let mut io = ScriptedIo::default();
        engine.process_input("wait", &mut io);
        assert_eq!(engine.state.player.moves, 1);
    }

    #[test]
    fn looking_does_not_consume_a_turn() {
        let mut engine = engine_with(&["look"]);
        let mut io = ScriptedIo::default();
        engine.process_input("look", &mut io);
        assert_eq!(engine.state.player.moves, 0);
        assert!(io.output[0].0.starts_with("Room"));
    }

    #[test]
    fn quit_signals_the_caller_to_stop() {
        let mut engine = engine_with(&["quit"]);
        let mut io = ScriptedIo::default();
        let control = engine.process_input("quit", &mut io);
        assert_eq!(control, EngineControl::Quit);
    }
}
