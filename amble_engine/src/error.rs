//! The three disjoint error taxonomies (§7): `ParseError` (recoverable,
//! reported to the player, no turn consumed), `ActionResponse` (thrown by
//! `validate`/`process`, recovered by printing a message), and
//! `EngineError` (internal bugs, logged, fatal to the turn).
//!
//! Grounded in the teacher's `SearchError` (entity_search.rs) for the
//! pattern of a `thiserror`-derived enum at a library boundary; expanded
//! here to the full variant lists this spec names, since the teacher's
//! search/command errors cover only a fraction of them.

use thiserror::Error;

use crate::id::{AttributeId, ItemId};

/// Reported to the player without consuming a turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("I don't understand.")]
    EmptyInput,
    #[error("I don't know the word \"{0}\".")]
    VerbUnknown(String),
    #[error("Which do you mean, {0}?")]
    AmbiguousVerb(String, Vec<String>),
    #[error("I understood as far as wanting to {0}, but not what to do with it.")]
    VerbUnderstoodButSyntaxFailed(String),
    #[error("That's not how you use the verb \"{0}\".")]
    VerbSyntaxRulesAllFailed(String),
    #[error("{0}")]
    BadGrammar(String),
    #[error("Which direction?")]
    ExpectedDirection,
    #[error("I expected \"{expected}\" after \"{verb}\", but found \"{found}\".")]
    ExpectedParticleAfterVerb { expected: String, verb: String, found: String },
    #[error("I expected \"{0}\" but the sentence ended.")]
    ExpectedParticleButReachedEnd(String),
    #[error("I didn't understand the words after that: {0}.")]
    UnexpectedWordsAfterCommand(Vec<String>),
    #[error("You don't see any \"{0}\" here.")]
    ItemNotInScope(String),
    #[error("I don't see a \"{modifiers}\" {noun} here.", modifiers = .1.join(" "))]
    ModifierMismatch(String, Vec<String>),
    #[error("Which {0} do you mean: {1:?}?")]
    AmbiguousObjectReference(String, Vec<String>),
    #[error("Which do you mean: {0:?}?")]
    AmbiguousReference(Vec<String>),
    #[error("I don't know what \"{0}\" refers to.")]
    PronounNotSet(String),
    #[error("You can't see that \"{0}\" anymore.")]
    PronounRefersToOutOfScopeItem(String),
    #[error("\"{0}\" can't be modified with adjectives.")]
    PronounCannotBeModified(String),
    #[error("You can't modify yourself with {1:?}.")]
    PlayerReferenceCannotBeModified(String, Vec<String>),
    #[error("I expected \"{expected}\" after the verb \"{verb}\", not \"{found}\".")]
    PrepositionMismatch { verb: String, expected: String, found: String },
    #[error("You need to be more specific; try \"{0}\".")]
    SpecificVerbRequired(String),
    #[error("You can't {0} more than one thing at once.")]
    VerbDoesNotSupportMultipleObjects(String),
    #[error("You can't {0} with more than one thing at once.")]
    VerbDoesNotSupportMultipleIndirectObjects(String),
    #[error("There's nothing here to take.")]
    AllCommandNothingToTake,
    #[error("You're not carrying anything.")]
    AllCommandNothingCarrying,
    #[error("There's nothing here.")]
    AllCommandNothingHere,
    #[error("Something went wrong: {0}")]
    InternalError(String),
}

/// Returned by `ActionHandler::validate`/`process`; the engine recovers by
/// printing a message. Must not consume a turn unless the handler already
/// applied partial effects, which it should not do.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionResponse {
    #[error("That's closed.")]
    ContainerIsClosed(ItemId),
    #[error("That's already open.")]
    ContainerIsOpen(ItemId),
    #[error("It's already open.")]
    ItemAlreadyOpen(ItemId),
    #[error("It's already closed.")]
    ItemAlreadyClosed(ItemId),
    #[error("It's locked.")]
    ItemIsLocked(ItemId),
    #[error("It's already unlocked.")]
    ItemIsUnlocked(ItemId),
    #[error("You can't open that.")]
    ItemNotOpenable(ItemId),
    #[error("You can't close that.")]
    ItemNotClosable(ItemId),
    #[error("You can't lock that.")]
    ItemNotLockable(ItemId),
    #[error("You can't unlock that.")]
    ItemNotUnlockable(ItemId),
    #[error("You're already wearing that.")]
    ItemIsAlreadyWorn(ItemId),
    #[error("You're not wearing that.")]
    ItemIsNotWorn(ItemId),
    #[error("You can't wear that.")]
    ItemNotWearable(ItemId),
    #[error("You can't take that off.")]
    ItemNotRemovable(ItemId),
    #[error("You can't take that.")]
    ItemNotTakable(ItemId),
    #[error("You can't drop that.")]
    ItemNotDroppable(ItemId),
    #[error("There's nothing to read.")]
    ItemNotReadable(ItemId),
    #[error("You're not holding that.")]
    ItemNotHeld(ItemId),
    #[error("You can't reach that.")]
    ItemNotAccessible(ItemId),
    #[error("That's not in there.")]
    ItemNotInContainer(ItemId, ItemId),
    #[error("That's not on there.")]
    ItemNotOnSurface(ItemId, ItemId),
    #[error("That won't fit in there.")]
    ItemTooLargeForContainer(ItemId, ItemId),
    #[error("You can't carry any more.")]
    PlayerCannotCarryMore,
    #[error("That's not a container.")]
    TargetIsNotAContainer(ItemId),
    #[error("That's not a surface.")]
    TargetIsNotASurface(ItemId),
    #[error("It's too dark to see.")]
    RoomIsDark,
    #[error("You can't go that way.")]
    InvalidDirection,
    #[error("{}", .0.clone().unwrap_or_else(|| "You can't go that way.".into()))]
    DirectionIsBlocked(Option<String>),
    #[error("That key doesn't fit.")]
    WrongKey(ItemId, ItemId),
    #[error("{0}")]
    PrerequisiteNotMet(String),
    #[error("{0}")]
    Custom(String),
    #[error("You don't have a {0} for that.")]
    ToolMissing(String),
    #[error("I don't know what that is.")]
    UnknownEntity(String),
    #[error("I don't know how to \"{0}\".")]
    UnknownVerb(String),
    #[error("Something about the world changed before that could finish.")]
    StateValidationFailed { change: String, actual_old_value: String },
    #[error("Something went wrong internally: {0}")]
    InternalEngineError(String),
}

/// Internal engine failures: bugs, not player mistakes. Logged; the turn
/// is aborted; already-applied changes are preserved since they were valid
/// when applied.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown attribute id referenced in content: {0}")]
    UnknownAttribute(AttributeId),
    #[error(transparent)]
    Apply(#[from] crate::change::ApplyError),
    #[error(transparent)]
    Load(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_blocked_falls_back_to_default_message() {
        let err = ActionResponse::DirectionIsBlocked(None);
        assert_eq!(err.to_string(), "You can't go that way.");
    }

    #[test]
    fn direction_blocked_uses_custom_message_when_present() {
        let err = ActionResponse::DirectionIsBlocked(Some("The door is barred.".into()));
        assert_eq!(err.to_string(), "The door is barred.");
    }
}
