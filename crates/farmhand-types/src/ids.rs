//! Type-safe identifier wrappers.
//!
//! Every entity has a strongly-typed ID to prevent accidental mixing of
//! identifiers at compile time. Surrogate row identifiers (farm and factory
//! entries, missions) use UUID v7 (time-ordered) for efficient indexing.
//! Player and channel identifiers come from the chat platform as 64-bit
//! snowflakes; item identifiers come from the static game data.

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

/// Generates a newtype wrapper around an externally assigned integer.
macro_rules! define_external_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

define_external_id! {
    /// Chat-platform user id of a registered player.
    PlayerId(i64)
}

define_external_id! {
    /// Chat-platform channel id used to route reminders.
    ChannelId(i64)
}

define_external_id! {
    /// Identifier of an item definition in the game data.
    ItemId(i32)
}

define_id! {
    /// Unique identifier for a farm field or factory queue row.
    EntryId
}

define_id! {
    /// Unique identifier for a generated mission offer.
    MissionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_are_unique() {
        let a = EntryId::new();
        let b = EntryId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn external_ids_serialize_transparently() {
        let json = serde_json::to_string(&ItemId(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
        let back: Result<PlayerId, _> = serde_json::from_str("123456789012345678");
        assert_eq!(back.ok(), Some(PlayerId(123_456_789_012_345_678)));
    }

    #[test]
    fn id_display_matches_inner() {
        let id = MissionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
        assert_eq!(ItemId(7).to_string(), "7");
    }
}
