//! Raw row shapes and their conversions into domain types.
//!
//! Postgres has no unsigned integers, so counts are stored as `INTEGER`
//! and checked on the way out. A negative or oversized value means the
//! row was written outside this crate and surfaces as [`DbError::Corrupt`].

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use farmhand_types::{
    ChannelId, EntryId, FactoryEntry, FarmEntry, InventoryLine, ItemId, MissionId, MissionLine,
    MissionOffer, ModifierLevels, PlayerAccount, PlayerId,
};

use crate::error::DbError;

/// Convert a stored `INTEGER` count into a `u32`.
pub(crate) fn count(table: &'static str, column: &'static str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| {
        tracing::error!(table, column, value, error = %e, "Negative count in database");
        DbError::Corrupt {
            table,
            column,
            value: i64::from(value),
        }
    })
}

/// Convert a stored `SMALLINT` level into a `u8`.
fn level(table: &'static str, column: &'static str, value: i16) -> Result<u8, DbError> {
    u8::try_from(value).map_err(|e| {
        tracing::error!(table, column, value, error = %e, "Level out of range in database");
        DbError::Corrupt {
            table,
            column,
            value: i64::from(value),
        }
    })
}

/// Convert a domain count into its stored `INTEGER` form.
pub(crate) fn stored(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// A row of the `profile` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    /// Discord user id.
    pub player_id: i64,
    /// Gold balance.
    pub gold: i64,
    /// Gem balance.
    pub gems: i64,
    /// Lifetime experience.
    pub xp: i64,
    /// Purchased farm fields.
    pub farm_slots: i32,
    /// Purchased factory queue slots.
    pub factory_slots: i32,
    /// Factory worker level.
    pub factory_level: i32,
    /// Purchased store slots.
    pub store_slots: i32,
    /// Whether reminders are enabled.
    pub notifications: bool,
    /// Channel reminders are posted to.
    pub channel_id: Option<i64>,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for PlayerAccount {
    type Error = DbError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            player_id: PlayerId(row.player_id),
            gold: row.gold,
            gems: row.gems,
            xp: row.xp,
            farm_slots: count("profile", "farm_slots", row.farm_slots)?,
            factory_slots: count("profile", "factory_slots", row.factory_slots)?,
            factory_level: count("profile", "factory_level", row.factory_level)?,
            store_slots: count("profile", "store_slots", row.store_slots)?,
            notifications: row.notifications,
            channel_id: row.channel_id.map(ChannelId),
            registered_at: row.registered_at,
        })
    }
}

/// A row of the `planted` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlantedRow {
    /// Entry id.
    pub id: Uuid,
    /// Owner.
    pub player_id: i64,
    /// Planted item.
    pub item_id: i32,
    /// Units the current cycle will yield.
    pub amount: i32,
    /// Per-field yield of the current cycle before theft.
    pub field_yield: i32,
    /// Fields occupied.
    pub fields_used: i32,
    /// Cycles left including the current one.
    pub iterations: i32,
    /// Start of the current cycle.
    pub starts: DateTime<Utc>,
    /// Ready time of the current cycle.
    pub ends: DateTime<Utc>,
    /// Rot time of the current cycle.
    pub dies: DateTime<Utc>,
    /// Fields already robbed this cycle.
    pub robbed_fields: i32,
    /// Whether a cat was guarding at planting time.
    pub cat_boost: bool,
}

impl TryFrom<PlantedRow> for FarmEntry {
    type Error = DbError;

    fn try_from(row: PlantedRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EntryId(row.id),
            player_id: PlayerId(row.player_id),
            item_id: ItemId(row.item_id),
            amount: count("planted", "amount", row.amount)?,
            field_yield: count("planted", "field_yield", row.field_yield)?,
            fields_used: count("planted", "fields_used", row.fields_used)?,
            iterations: count("planted", "iterations", row.iterations)?,
            starts: row.starts,
            ends: row.ends,
            dies: row.dies,
            robbed_fields: count("planted", "robbed_fields", row.robbed_fields)?,
            cat_boost: row.cat_boost,
        })
    }
}

/// A row of the `factory` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FactoryRow {
    /// Entry id.
    pub id: Uuid,
    /// Owner.
    pub player_id: i64,
    /// Item being produced.
    pub item_id: i32,
    /// Production start.
    pub starts: DateTime<Utc>,
    /// Production end.
    pub ends: DateTime<Utc>,
}

impl From<FactoryRow> for FactoryEntry {
    fn from(row: FactoryRow) -> Self {
        Self {
            id: EntryId(row.id),
            player_id: PlayerId(row.player_id),
            item_id: ItemId(row.item_id),
            starts: row.starts,
            ends: row.ends,
        }
    }
}

/// A row of the `inventory` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryRow {
    /// Stored item.
    pub item_id: i32,
    /// Units held.
    pub amount: i32,
}

impl TryFrom<InventoryRow> for InventoryLine {
    type Error = DbError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: ItemId(row.item_id),
            amount: count("inventory", "amount", row.amount)?,
        })
    }
}

/// A row of the `modifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModificationRow {
    /// Modified item.
    pub item_id: i32,
    /// Grow time level.
    pub grow_time: i16,
    /// Collect window level.
    pub collect_window: i16,
    /// Volume level.
    pub volume: i16,
}

impl ModificationRow {
    /// Split into the item id and its checked levels.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if a level does not fit in a `u8`.
    pub fn into_levels(self) -> Result<(ItemId, ModifierLevels), DbError> {
        Ok((
            ItemId(self.item_id),
            ModifierLevels {
                grow_time: level("modifications", "grow_time", self.grow_time)?,
                collect_window: level("modifications", "collect_window", self.collect_window)?,
                volume: level("modifications", "volume", self.volume)?,
            },
        ))
    }
}

/// A row of the `missions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MissionRow {
    /// Mission id.
    pub id: Uuid,
    /// Owner.
    pub player_id: i64,
    /// Requested lines.
    pub lines: Json<Vec<MissionLine>>,
    /// Gold reward.
    pub gold: i64,
    /// XP reward.
    pub xp: i64,
    /// Optional chest reward.
    pub chest: Option<i32>,
    /// Offer time.
    pub created_at: DateTime<Utc>,
}

impl From<MissionRow> for MissionOffer {
    fn from(row: MissionRow) -> Self {
        Self {
            id: MissionId(row.id),
            player_id: PlayerId(row.player_id),
            lines: row.lines.0,
            gold: row.gold,
            xp: row.xp,
            chest: row.chest.map(ItemId),
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn negative_counts_are_corrupt() {
        let err = count("inventory", "amount", -3).unwrap_err();
        assert!(matches!(
            err,
            DbError::Corrupt {
                table: "inventory",
                column: "amount",
                value: -3
            }
        ));
        assert_eq!(count("inventory", "amount", 12).unwrap(), 12);
    }

    #[test]
    fn stored_counts_saturate() {
        assert_eq!(stored(5), 5);
        assert_eq!(stored(u32::MAX), i32::MAX);
    }

    #[test]
    fn modification_levels_are_checked() {
        let row = ModificationRow {
            item_id: 1,
            grow_time: 3,
            collect_window: 0,
            volume: 10,
        };
        let (item, levels) = row.into_levels().unwrap();
        assert_eq!(item, ItemId(1));
        assert_eq!(levels.grow_time, 3);
        assert_eq!(levels.volume, 10);

        let bad = ModificationRow {
            item_id: 1,
            grow_time: -1,
            collect_window: 0,
            volume: 0,
        };
        assert!(bad.into_levels().is_err());
    }
}
