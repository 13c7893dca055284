//! `Command`: the parser's fully resolved output, ready for dispatch to an
//! `ActionHandler`.
//!
//! The teacher's `command.rs` models this as a flat enum, one variant per
//! verb, each carrying its own already-resolved fields (`Command::Take {
//! item: String }`). This spec's parser resolves nouns to `ItemId`s (not
//! strings) and needs the same shape to carry an ambiguous "all" expansion,
//! so `Command` is a single struct parameterized by `Verb` instead -- closer
//! to how the teacher's own `SyntaxRule`-less design would look if pushed
//! through a generic object resolver.

use std::collections::HashSet;

use crate::id::ItemId;
use crate::vocab::{Direction, Preposition, Verb};

/// One or more resolved objects a noun phrase matched -- plural only when
/// the phrase was "all" under a rule with `AllowsMultiple`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedObject {
    Single(ItemId),
    Multiple(HashSet<ItemId>),
}

impl ResolvedObject {
    pub fn iter(&self) -> Box<dyn Iterator<Item = ItemId> + '_> {
        match self {
            Self::Single(id) => Box::new(std::iter::once(*id)),
            Self::Multiple(set) => Box::new(set.iter().copied()),
        }
    }

    pub fn single(&self) -> Option<ItemId> {
        match self {
            Self::Single(id) => Some(*id),
            Self::Multiple(set) if set.len() == 1 => set.iter().next().copied(),
            Self::Multiple(_) => None,
        }
    }
}

/// The parser's fully resolved output.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub verb: Verb,
    pub direct_object: Option<ResolvedObject>,
    pub indirect_object: Option<ResolvedObject>,
    pub direction: Option<Direction>,
    pub preposition: Option<Preposition>,
    pub particle: Option<String>,
    /// Adjectives supplied for the direct-object noun phrase, kept for
    /// handlers (e.g. "examine") that echo back exactly what was asked
    /// about, and for the pretty-printer round-trip property (§8).
    pub modifiers: Vec<String>,
}

impl Command {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            direct_object: None,
            indirect_object: None,
            direction: None,
            preposition: None,
            particle: None,
            modifiers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_resolved_object_round_trips_through_single() {
        let id = ItemId::new();
        let obj = ResolvedObject::Single(id);
        assert_eq!(obj.single(), Some(id));
        assert_eq!(obj.iter().count(), 1);
    }

    #[test]
    fn multiple_with_one_member_reduces_to_single() {
        let id = ItemId::new();
        let obj = ResolvedObject::Multiple(HashSet::from([id]));
        assert_eq!(obj.single(), Some(id));
    }

    #[test]
    fn multiple_with_several_members_has_no_single() {
        let obj = ResolvedObject::Multiple(HashSet::from([ItemId::new(), ItemId::new()]));
        assert_eq!(obj.single(), None);
    }
}
