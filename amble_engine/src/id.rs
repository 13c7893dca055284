//! Identifier types.
//!
//! Every kind of thing the engine can name -- an item, a location, a
//! daemon, a fuse, a global, an attribute, a transient context slot -- gets
//! its own newtype around a `Uuid` rather than sharing one bare type. This
//! mirrors the teacher's habit of tagging locations by kind
//! (`Location::Room(Uuid)` vs `Location::Item(Uuid)`) but pushes the
//! distinction to the type level so an `ItemId` can never be handed to a
//! function expecting a `LocationId`.
//!
//! Content files refer to entities by a human-readable `symbol`; the loader
//! resolves those symbols to stable ids the same way the teacher's loader
//! turns TOML symbols into `Uuid`s via [`crate::idgen`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Deterministically derive an id from a stable token (used for
            /// content loaded from world-definition files, so the same
            /// symbol always maps to the same id across loads).
            pub fn from_token(namespace: &Uuid, token: &str) -> Self {
                Self(Uuid::new_v5(namespace, token.as_bytes()))
            }

            /// The underlying uuid.
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(Uuid::nil())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

id_newtype!(ItemId, "Identifies an [`crate::world::Item`].");
id_newtype!(LocationId, "Identifies a [`crate::world::Location`].");
id_newtype!(DaemonId, "Identifies a recurring [`crate::turn::Daemon`].");
id_newtype!(FuseId, "Identifies a countdown [`crate::turn::Fuse`].");
id_newtype!(GlobalId, "Identifies a named value in `GameState::global_values`/`global_flags`.");
id_newtype!(AttributeId, "Identifies an entry in an item or location attribute bag.");
id_newtype!(ContextId, "Identifies a transient slot in an `ActionContext`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_token_is_deterministic() {
        let ns = Uuid::new_v4();
        let a = ItemId::from_token(&ns, "rusty_key");
        let b = ItemId::from_token(&ns, "rusty_key");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_tokens_differ() {
        let ns = Uuid::new_v4();
        assert_ne!(ItemId::from_token(&ns, "a"), ItemId::from_token(&ns, "b"));
    }

    #[test]
    fn default_is_nil() {
        assert_eq!(ItemId::default().uuid(), Uuid::nil());
    }
}
