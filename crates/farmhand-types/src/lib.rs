//! Shared type definitions for the Farmhand game backend.
//!
//! This crate is the single source of truth for identifiers, enumerations,
//! and row structs used across the workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for player, item, entry, and mission ids
//! - [`enums`] -- Item categories, modifier tracks, boosts, derived states
//! - [`structs`] -- Farm/factory entries, accounts, missions, notifications

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BoostKind, CapacityKind, FactoryState, FarmState, ItemCategory, ModifierTrack,
    NotificationKind,
};
pub use ids::{ChannelId, EntryId, ItemId, MissionId, PlayerId};
pub use structs::{
    ActiveBoost, ExportContract, FactoryEntry, FarmEntry, InventoryLine, MissionLine,
    MissionOffer, ModifierLevels, Notification, PlayerAccount,
};
