//! Core entity structs: ledger entries, player aggregates, and reward offers.
//!
//! These are plain data carriers. State derivation, formulas, and
//! validation live in `farmhand-engine`; persistence lives in
//! `farmhand-db`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{BoostKind, ModifierTrack, NotificationKind};
use crate::ids::{ChannelId, EntryId, ItemId, MissionId, PlayerId};

// ---------------------------------------------------------------------------
// Scheduled entries
// ---------------------------------------------------------------------------

/// One in-flight growth cycle on a player's farm (a `farm` table row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmEntry {
    /// Surrogate row id.
    pub id: EntryId,
    /// Owning player.
    pub player_id: PlayerId,
    /// The planted seed, tree, or animal.
    pub item_id: ItemId,
    /// Units of the expanded product this cycle will yield.
    pub amount: u32,
    /// Yield of one field this cycle before any theft.
    pub field_yield: u32,
    /// Farm fields occupied by this entry.
    pub fields_used: u32,
    /// Harvest cycles left, including the current one.
    pub iterations: u32,
    /// When the current cycle started.
    pub starts: DateTime<Utc>,
    /// When the current cycle becomes collectable.
    pub ends: DateTime<Utc>,
    /// When the current cycle rots.
    pub dies: DateTime<Utc>,
    /// Fields already plundered by other players this cycle.
    pub robbed_fields: u32,
    /// Planted under an active cat boost: rotten yields stay collectable.
    pub cat_boost: bool,
}

/// One queued unit of production in a player's factory (a `factory` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryEntry {
    /// Surrogate row id.
    pub id: EntryId,
    /// Owning player.
    pub player_id: PlayerId,
    /// The crafted item being produced.
    pub item_id: ItemId,
    /// When production of this unit starts.
    pub starts: DateTime<Utc>,
    /// When this unit is ready.
    pub ends: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Player aggregate
// ---------------------------------------------------------------------------

/// A registered player's mutable account (the `profile` row).
///
/// Level is never stored: it is derived from `xp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccount {
    /// The player.
    pub player_id: PlayerId,
    /// Gold currency.
    pub gold: i64,
    /// Premium currency.
    pub gems: i64,
    /// Total experience points.
    pub xp: i64,
    /// Base number of farm fields.
    pub farm_slots: u32,
    /// Base number of factory queue slots.
    pub factory_slots: u32,
    /// Factory worker level; each level shortens production by 5%.
    pub factory_level: u32,
    /// Trade store slots.
    pub store_slots: u32,
    /// Whether the player wants reminders and theft notices.
    pub notifications: bool,
    /// Channel where reminders for this player are delivered.
    pub channel_id: Option<ChannelId>,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
}

/// A player's upgrade levels for one item (the `modifications` row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierLevels {
    /// Grow-time reduction level (0-10).
    pub grow_time: u8,
    /// Collect-window extension level (0-10).
    pub collect_window: u8,
    /// Yield volume level (0-10).
    pub volume: u8,
}

impl ModifierLevels {
    /// All tracks at zero (no modification purchased).
    pub const ZERO: Self = Self {
        grow_time: 0,
        collect_window: 0,
        volume: 0,
    };

    /// The level of a single track.
    pub const fn level(&self, track: ModifierTrack) -> u8 {
        match track {
            ModifierTrack::GrowTime => self.grow_time,
            ModifierTrack::CollectWindow => self.collect_window,
            ModifierTrack::Volume => self.volume,
        }
    }

    /// Return a copy with one track set to `level`.
    #[must_use]
    pub const fn with_level(mut self, track: ModifierTrack, level: u8) -> Self {
        match track {
            ModifierTrack::GrowTime => self.grow_time = level,
            ModifierTrack::CollectWindow => self.collect_window = level,
            ModifierTrack::Volume => self.volume = level,
        }
        self
    }
}

/// Quantity of one item held by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    /// The item.
    pub item_id: ItemId,
    /// Units held.
    pub amount: u32,
}

/// A boost that is active until `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBoost {
    /// Which boost.
    pub kind: BoostKind,
    /// Expiry time.
    pub until: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Missions and exports
// ---------------------------------------------------------------------------

/// One required item line of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionLine {
    /// Item to deliver.
    pub item_id: ItemId,
    /// Units to deliver.
    pub amount: u32,
}

/// A generated mission offer. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionOffer {
    /// Mission id.
    pub id: MissionId,
    /// Player the mission belongs to.
    pub player_id: PlayerId,
    /// Items to deliver.
    pub lines: Vec<MissionLine>,
    /// Gold paid on completion.
    pub gold: i64,
    /// Experience paid on completion.
    pub xp: i64,
    /// Bonus chest item granted on completion.
    pub chest: Option<ItemId>,
    /// Generation time.
    pub created_at: DateTime<Utc>,
}

/// A time-boxed export contract with escalating shipment rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportContract {
    /// Player the contract belongs to.
    pub player_id: PlayerId,
    /// Item to ship.
    pub item_id: ItemId,
    /// Units required per shipment.
    pub amount_per_shipment: u32,
    /// Gold base reward; shipment `n` pays `base_gold * n`.
    pub base_gold: i64,
    /// Experience base reward; shipment `n` pays `base_xp * (1 + 0.4 n)`.
    pub base_xp: i64,
    /// Shipments delivered so far (0-10).
    pub shipments: u32,
    /// When the contract was started.
    pub started_at: DateTime<Utc>,
    /// When the contract expires.
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A message handed to the external reminder dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient.
    pub player_id: PlayerId,
    /// Channel to deliver in, if the player configured one.
    pub channel_id: Option<ChannelId>,
    /// Item the notice is about.
    pub item_id: ItemId,
    /// Units involved.
    pub amount: u32,
    /// When the dispatcher should deliver it.
    pub fire_at: DateTime<Utc>,
    /// Notice type.
    pub kind: NotificationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_levels_track_access() {
        let levels = ModifierLevels::ZERO
            .with_level(ModifierTrack::Volume, 4)
            .with_level(ModifierTrack::GrowTime, 2);
        assert_eq!(levels.level(ModifierTrack::Volume), 4);
        assert_eq!(levels.level(ModifierTrack::GrowTime), 2);
        assert_eq!(levels.level(ModifierTrack::CollectWindow), 0);
    }

    #[test]
    fn notification_kind_is_tagged() {
        let kind = NotificationKind::Robbed { by: PlayerId(9) };
        let json = serde_json::to_string(&kind).unwrap_or_default();
        assert!(json.contains("\"type\":\"robbed\""));
        assert!(json.contains("\"by\":9"));
    }
}
