//! Daemon (periodic) and fuse (countdown) scheduling, and the ordered
//! per-turn advancement of both (§4.8).
//!
//! Grounded directly in the teacher's `Scheduler` (scheduler.rs), a
//! `BinaryHeap<Reverse<(turn, idx)>>` priority queue keyed by due turn.
//! This spec's two registries are simpler -- fuses count down per active
//! instance, daemons fire on a frequency modulus -- so the teacher's heap
//! collapses to two sorted-key iterations, but the underlying idea (a
//! registry of named timed payloads, dispatched in deterministic id order)
//! is the same one the teacher's scheduler embodies.

use std::collections::HashMap;

use crate::action::ActionResult;
use crate::change::StateChange;
use crate::id::{DaemonId, FuseId};
use crate::world::{FuseState, GameState};

pub type TimerBody = Box<dyn Fn(&GameState) -> ActionResult + Send + Sync>;

pub struct DaemonDef {
    pub frequency: u32,
    pub body: TimerBody,
}

pub struct FuseDef {
    pub body: TimerBody,
}

/// Content-provided payload definitions, keyed by the same ids that live
/// in `GameState.active_fuses`/`active_daemons`. Kept separate from
/// `GameState` itself since closures aren't serializable.
#[derive(Default)]
pub struct TimerRegistry {
    daemons: HashMap<DaemonId, DaemonDef>,
    fuses: HashMap<FuseId, FuseDef>,
}

impl TimerRegistry {
    pub fn register_daemon(&mut self, id: DaemonId, frequency: u32, body: TimerBody) {
        self.daemons.insert(id, DaemonDef { frequency, body });
    }

    pub fn register_fuse(&mut self, id: FuseId, body: TimerBody) {
        self.fuses.insert(id, FuseDef { body });
    }
}

/// The changes and merged results produced by advancing every active timer
/// by one turn.
#[derive(Default)]
pub struct TimerTickOutcome {
    pub changes: Vec<StateChange>,
    pub results: Vec<ActionResult>,
}

/// Decrements every active fuse (ascending `FuseId`), firing and removing
/// any that reach zero, then fires every due daemon (ascending `DaemonId`).
/// Fuses are always processed before daemons, per §4.8/§5's ordering
/// guarantee.
pub fn advance_timers(state: &GameState, moves_after_increment: u64, registry: &TimerRegistry) -> TimerTickOutcome {
    let mut outcome = TimerTickOutcome::default();

    let mut fuse_ids: Vec<FuseId> = state.active_fuses.keys().copied().collect();
    fuse_ids.sort();
    for id in fuse_ids {
        let Some(fuse) = state.active_fuses.get(&id) else { continue };
        let remaining = fuse.turns_remaining.saturating_sub(1);
        if remaining == 0 {
            outcome.changes.push(StateChange::RemoveActiveFuse { id });
            if let Some(def) = registry.fuses.get(&id) {
                outcome.results.push((def.body)(state));
            }
        } else {
            outcome.changes.push(StateChange::UpdateFuseTurns { id, turns_remaining: remaining });
        }
    }

    let mut daemon_ids: Vec<DaemonId> = state.active_daemons.iter().copied().collect();
    daemon_ids.sort();
    for id in daemon_ids {
        if let Some(def) = registry.daemons.get(&id) {
            if def.frequency > 0 && moves_after_increment % def.frequency as u64 == 0 {
                outcome.results.push((def.body)(state));
            }
        }
    }

    outcome
}

/// Starts a fuse with `turns` remaining (a `StartFuse` side effect).
pub fn start_fuse_change(id: FuseId, turns: u32) -> StateChange {
    StateChange::AddActiveFuse { id, state: FuseState { turns_remaining: turns } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::empty_state;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn fuse_at_one_turn_fires_and_is_removed() {
        let mut state = empty_state();
        let fuse_id = FuseId::new();
        state.active_fuses.insert(fuse_id, FuseState { turns_remaining: 1 });

        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        let mut registry = TimerRegistry::default();
        registry.register_fuse(
            fuse_id,
            Box::new(move |_state| {
                fired_clone.store(true, Ordering::SeqCst);
                ActionResult::with_message("The clock chimes.")
            }),
        );

        let outcome = advance_timers(&state, 2, &registry);
        assert!(fired.load(Ordering::SeqCst));
        assert!(outcome.changes.contains(&StateChange::RemoveActiveFuse { id: fuse_id }));
        assert_eq!(outcome.results[0].message.as_deref(), Some("The clock chimes."));
    }

    #[test]
    fn fuse_with_turns_remaining_only_decrements() {
        let mut state = empty_state();
        let fuse_id = FuseId::new();
        state.active_fuses.insert(fuse_id, FuseState { turns_remaining: 3 });
        let registry = TimerRegistry::default();

        let outcome = advance_timers(&state, 1, &registry);
        assert_eq!(outcome.changes, vec![StateChange::UpdateFuseTurns { id: fuse_id, turns_remaining: 2 }]);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn daemon_fires_only_on_its_frequency() {
        let mut state = empty_state();
        let daemon_id = DaemonId::new();
        state.active_daemons.insert(daemon_id);
        let mut registry = TimerRegistry::default();
        registry.register_daemon(daemon_id, 3, Box::new(|_| ActionResult::with_message("tick")));

        assert!(advance_timers(&state, 2, &registry).results.is_empty());
        assert_eq!(advance_timers(&state, 3, &registry).results.len(), 1);
        let _ = &mut state;
    }
}
