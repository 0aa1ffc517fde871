//! Persistence for the `modifications` table.
//!
//! Each modifier track has its own fixed statement; the column is chosen
//! by matching on [`ModifierTrack`], never by formatting it into SQL.

use std::collections::BTreeMap;

use farmhand_types::{ItemId, ModifierLevels, ModifierTrack, PlayerId};
use sqlx::PgConnection;

use crate::error::DbError;
use crate::rows::ModificationRow;

const UPSERT_GROW_TIME: &str = r"INSERT INTO modifications (player_id, item_id, grow_time) VALUES ($1, $2, $3)
  ON CONFLICT (player_id, item_id) DO UPDATE SET grow_time = EXCLUDED.grow_time";
const UPSERT_COLLECT_WINDOW: &str = r"INSERT INTO modifications (player_id, item_id, collect_window) VALUES ($1, $2, $3)
  ON CONFLICT (player_id, item_id) DO UPDATE SET collect_window = EXCLUDED.collect_window";
const UPSERT_VOLUME: &str = r"INSERT INTO modifications (player_id, item_id, volume) VALUES ($1, $2, $3)
  ON CONFLICT (player_id, item_id) DO UPDATE SET volume = EXCLUDED.volume";

/// Operations on the `modifications` table.
pub struct ModifierStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ModifierStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Levels of one item; all zero if the player never upgraded it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored level is out of range.
    pub async fn get(&mut self, player: PlayerId, item: ItemId) -> Result<ModifierLevels, DbError> {
        let row = sqlx::query_as::<_, ModificationRow>(
            "SELECT item_id, grow_time, collect_window, volume FROM modifications WHERE player_id = $1 AND item_id = $2",
        )
        .bind(player.0)
        .bind(item.0)
        .fetch_optional(&mut *self.conn)
        .await?;

        match row {
            Some(row) => Ok(row.into_levels()?.1),
            None => Ok(ModifierLevels::ZERO),
        }
    }

    /// Levels of every item the player upgraded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored level is out of range.
    pub async fn all_for_player(&mut self, player: PlayerId) -> Result<BTreeMap<ItemId, ModifierLevels>, DbError> {
        let rows = sqlx::query_as::<_, ModificationRow>(
            "SELECT item_id, grow_time, collect_window, volume FROM modifications WHERE player_id = $1",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        rows.into_iter().map(ModificationRow::into_levels).collect()
    }

    /// Store a new level on one track.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn set_level(
        &mut self,
        player: PlayerId,
        item: ItemId,
        track: ModifierTrack,
        level: u8,
    ) -> Result<(), DbError> {
        let sql = match track {
            ModifierTrack::GrowTime => UPSERT_GROW_TIME,
            ModifierTrack::CollectWindow => UPSERT_COLLECT_WINDOW,
            ModifierTrack::Volume => UPSERT_VOLUME,
        };
        sqlx::query(sql)
            .bind(player.0)
            .bind(item.0)
            .bind(i16::from(level))
            .execute(&mut *self.conn)
            .await?;

        tracing::debug!(player_id = %player, item_id = %item, track = track.key(), level, "Set modifier level");
        Ok(())
    }
}
