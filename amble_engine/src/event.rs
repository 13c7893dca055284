//! Item and location event hooks (§4.7): `beforeTurn`/`afterTurn`/
//! `onInitialize`/`onDestroy` for items, `beforeTurn`/`afterTurn`/`onEnter`
//! for locations, and the ordered per-turn dispatch.
//!
//! Grounded in the teacher's `Trigger`/`TriggerCondition` (trigger.rs) --
//! generalized from a single global trigger list matched against a free-
//! form event description into typed per-item/per-location hook slots keyed
//! directly by `ItemEvent`/`LocationEvent`.

use crate::action::ActionResult;
use crate::command::Command;
use crate::id::{ItemId, LocationId};
use crate::world::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemEvent {
    BeforeTurn,
    AfterTurn,
    OnInitialize,
    OnDestroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationEvent {
    BeforeTurn,
    AfterTurn,
    OnEnter,
}

/// A hook body: given the command about to run (or that just ran) and a
/// state snapshot, optionally produce an `ActionResult`. Returning `None`
/// is the "yield" case -- the engine continues to the next hook or the
/// verb handler itself.
pub trait ItemHook: Send + Sync {
    fn run(&self, item: ItemId, command: Option<&Command>, state: &GameState) -> Option<ActionResult>;
}

pub trait LocationHook: Send + Sync {
    fn run(&self, location: LocationId, command: Option<&Command>, state: &GameState) -> Option<ActionResult>;
}

/// Registry of hooks keyed by entity and event slot, consulted by the
/// engine's turn loop in the order fixed by §4.7.
#[derive(Default)]
pub struct HookRegistry {
    item_hooks: std::collections::HashMap<(ItemId, ItemEvent), Vec<Box<dyn ItemHook>>>,
    location_hooks: std::collections::HashMap<(LocationId, LocationEvent), Vec<Box<dyn LocationHook>>>,
}

impl HookRegistry {
    pub fn register_item_hook(&mut self, item: ItemId, event: ItemEvent, hook: Box<dyn ItemHook>) {
        self.item_hooks.entry((item, event)).or_default().push(hook);
    }

    pub fn register_location_hook(&mut self, location: LocationId, event: LocationEvent, hook: Box<dyn LocationHook>) {
        self.location_hooks.entry((location, event)).or_default().push(hook);
    }

    /// Location hook for `current_location`, per §4.7 step 1/5.
    pub fn dispatch_location(
        &self,
        location: LocationId,
        event: LocationEvent,
        command: Option<&Command>,
        state: &GameState,
    ) -> Option<ActionResult> {
        self.location_hooks.get(&(location, event))?.iter().find_map(|h| h.run(location, command, state))
    }

    /// Item hooks for every item currently in scope, visited in ascending
    /// `ItemId` order (§5 "item hooks run in ascending ItemId").
    pub fn dispatch_items(
        &self,
        mut items_in_scope: Vec<ItemId>,
        event: ItemEvent,
        command: Option<&Command>,
        state: &GameState,
    ) -> Option<ActionResult> {
        items_in_scope.sort();
        for item in items_in_scope {
            if let Some(hooks) = self.item_hooks.get(&(item, event)) {
                if let Some(result) = hooks.iter().find_map(|h| h.run(item, command, state)) {
                    return Some(result);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFires;
    impl ItemHook for AlwaysFires {
        fn run(&self, _item: ItemId, _command: Option<&Command>, _state: &GameState) -> Option<ActionResult> {
            Some(ActionResult::with_message("fired"))
        }
    }

    #[test]
    fn item_hooks_dispatch_in_ascending_id_order() {
        let mut registry = HookRegistry::default();
        let a = ItemId::new();
        registry.register_item_hook(a, ItemEvent::BeforeTurn, Box::new(AlwaysFires));
        let state = crate::world::tests_support::empty_state();
        let result = registry.dispatch_items(vec![a], ItemEvent::BeforeTurn, None, &state);
        assert_eq!(result.unwrap().message.unwrap(), "fired");
    }

    #[test]
    fn unregistered_location_hook_yields_none() {
        let registry = HookRegistry::default();
        let state = crate::world::tests_support::empty_state();
        let loc = state.player.current_location_id;
        assert!(registry.dispatch_location(loc, LocationEvent::OnEnter, None, &state).is_none());
    }
}
