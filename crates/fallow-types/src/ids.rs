//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Worlds and actors are identified by UUID v7 values so that persisted
//! session records sort by creation time and identifiers of different
//! kinds cannot be mixed up at compile time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world (level / dimension) owned by the host.
    WorldId
}

define_id! {
    /// Unique identifier for an actor (player) admitted into a world.
    ActorId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let world = WorldId::new();
        let actor = ActorId::new();
        assert_ne!(world.into_inner(), Uuid::nil());
        assert_ne!(actor.into_inner(), Uuid::nil());
    }

    #[test]
    fn world_id_serializes_as_plain_uuid() {
        let id = WorldId::from(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn display_matches_uuid() {
        let id = WorldId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
