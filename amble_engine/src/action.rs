//! The action-handler protocol: `validate` → `process` → `post_process`,
//! and the `ActionResult`/`SideEffect` vocabulary handlers emit instead of
//! mutating state directly.
//!
//! Grounded in the teacher's `TriggerAction`/`dispatch_action`
//! (trigger/action.rs) for the shape of an effect-dispatch enum, but
//! restructured into a registry keyed by `Verb` (§9 "dynamic dispatch over
//! verbs") rather than the teacher's flat REPL `match` (repl.rs).

use std::collections::HashMap;

use crate::change::StateChange;
use crate::command::Command;
use crate::error::ActionResponse;
use crate::id::{ContextId, DaemonId, FuseId};
use crate::value::StateValue;
use crate::vocab::{ObjectCondition, SyntaxRule, Verb};
use crate::world::GameState;

/// How this handler's result should combine with whatever the engine's
/// default dispatch would otherwise have done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFlow {
    Append,
    Prepend,
    Override,
    /// The handler declines to fully handle this command; the engine falls
    /// through to its default verb behavior, which then runs its own hooks
    /// (an open question in the source, resolved this way per design note).
    Yield,
}

/// A typed side effect a handler wants the engine to carry out beyond the
/// declarative `changes` list (timers, narrative, deferred combat beats).
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    StartFuse { id: FuseId, turns: u32 },
    CancelFuse { id: FuseId },
    StartDaemon { id: DaemonId },
    CancelDaemon { id: DaemonId },
    ScheduleEnemyReturn { enemy: crate::id::ItemId, turns: u32 },
    EmitNarrative(String),
}

/// The outcome of `ActionHandler::process`.
#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    pub message: Option<String>,
    pub changes: Vec<StateChange>,
    pub effects: Vec<SideEffect>,
    pub execution_flow: ExecutionFlowOrDefault,
}

/// Wraps `ExecutionFlow` so `ActionResult` can `#[derive(Default)]`
/// (`Append` is the sensible default for a handler that doesn't care).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionFlowOrDefault(pub ExecutionFlow);

impl Default for ExecutionFlowOrDefault {
    fn default() -> Self {
        Self(ExecutionFlow::Append)
    }
}

impl ActionResult {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Default::default() }
    }

    /// Concatenates messages with a paragraph separator and appends the
    /// other's changes/effects in order, per §4.6's merge rule.
    pub fn merge(mut self, other: ActionResult) -> Self {
        self.message = match (self.message.take(), other.message) {
            (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        self.changes.extend(other.changes);
        self.effects.extend(other.effects);
        self
    }
}

/// What a handler's `validate`/`process` methods see: the parsed command,
/// an immutable snapshot taken at dispatch time, and a transient scratch
/// map for passing data between hooks within the same turn.
pub struct ActionContext<'a> {
    pub command: &'a Command,
    pub state: &'a GameState,
    pub scratch: HashMap<ContextId, StateValue>,
}

impl<'a> ActionContext<'a> {
    pub fn new(command: &'a Command, state: &'a GameState) -> Self {
        Self { command, state, scratch: HashMap::new() }
    }
}

/// Verb metadata plus the three-phase protocol. All handler work is
/// single-threaded cooperative (§5); no handler ever observes or produces a
/// partially-applied `StateChange` batch.
pub trait ActionHandler: Send + Sync {
    fn synonyms(&self) -> &[Verb];
    fn syntax(&self) -> &[SyntaxRule];

    fn requires_light(&self) -> bool {
        true
    }

    fn consumes_turn(&self) -> bool {
        true
    }

    /// Whether a successful dispatch of this handler ends the session (the
    /// stock quit verb is the only one that sets this).
    fn ends_game(&self) -> bool {
        false
    }

    /// Read-only check; must not mutate. If the action is impossible, fail
    /// with a specific `ActionResponse`.
    fn validate(&self, ctx: &ActionContext) -> Result<(), ActionResponse>;

    /// Compute the outcome; must not mutate shared state.
    fn process(&self, ctx: &ActionContext) -> Result<ActionResult, ActionResponse>;

    /// Runs after `changes` are applied and `message` is printed. Default
    /// no-op.
    fn post_process(&self, _ctx: &ActionContext, _result: &ActionResult) {}
}

/// Default scope restriction helper shared by several stock handlers: does
/// the rule's `direct_object_conditions` admit an item that is currently
/// held by the player?
pub fn admits_held(conditions: ObjectCondition) -> bool {
    conditions.contains(ObjectCondition::HELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_messages_with_paragraph_break() {
        let a = ActionResult::with_message("First.");
        let b = ActionResult::with_message("Second.");
        let merged = a.merge(b);
        assert_eq!(merged.message.unwrap(), "First.\n\nSecond.");
    }

    #[test]
    fn merge_preserves_single_message_when_other_is_empty() {
        let a = ActionResult::with_message("Only.");
        let b = ActionResult::default();
        let merged = a.merge(b);
        assert_eq!(merged.message.unwrap(), "Only.");
    }

    #[test]
    fn default_execution_flow_is_append() {
        assert_eq!(ActionResult::default().execution_flow.0, ExecutionFlow::Append);
    }
}
