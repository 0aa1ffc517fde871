//! Persistence for the `profile` table.
//!
//! Every game operation that spends or credits a balance locks the
//! profile row first with [`ProfileStore::lock`]; the row lock is what
//! serializes concurrent commands from the same player.

use farmhand_types::{PlayerAccount, PlayerId};
use sqlx::PgConnection;

use crate::error::DbError;
use crate::rows::{ProfileRow, stored};

const PROFILE_COLUMNS: &str = "player_id, gold, gems, xp, farm_slots, factory_slots, factory_level, store_slots, notifications, channel_id, registered_at";

/// Operations on the `profile` table.
pub struct ProfileStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ProfileStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert a freshly registered account.
    ///
    /// Returns `false` if the player is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&mut self, account: &PlayerAccount) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO profile (player_id, gold, gems, xp, farm_slots, factory_slots, factory_level, store_slots, notifications, channel_id, registered_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
              ON CONFLICT (player_id) DO NOTHING",
        )
        .bind(account.player_id.0)
        .bind(account.gold)
        .bind(account.gems)
        .bind(account.xp)
        .bind(stored(account.farm_slots))
        .bind(stored(account.factory_slots))
        .bind(stored(account.factory_level))
        .bind(stored(account.store_slots))
        .bind(account.notifications)
        .bind(account.channel_id.map(|c| c.0))
        .bind(account.registered_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Read an account without locking it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored count is negative.
    pub async fn fetch(&mut self, player: PlayerId) -> Result<Option<PlayerAccount>, DbError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE player_id = $1");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(player.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(PlayerAccount::try_from).transpose()
    }

    /// Read an account and hold its row lock until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored count is negative.
    pub async fn lock(&mut self, player: PlayerId) -> Result<Option<PlayerAccount>, DbError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE player_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(player.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(PlayerAccount::try_from).transpose()
    }

    /// Write back every mutable column of an account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails, including a
    /// balance check violation.
    pub async fn update(&mut self, account: &PlayerAccount) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE profile
              SET gold = $2, gems = $3, xp = $4, farm_slots = $5, factory_slots = $6,
                  factory_level = $7, store_slots = $8, notifications = $9, channel_id = $10
              WHERE player_id = $1",
        )
        .bind(account.player_id.0)
        .bind(account.gold)
        .bind(account.gems)
        .bind(account.xp)
        .bind(stored(account.farm_slots))
        .bind(stored(account.factory_slots))
        .bind(stored(account.factory_level))
        .bind(stored(account.store_slots))
        .bind(account.notifications)
        .bind(account.channel_id.map(|c| c.0))
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Delete an account; owned rows go with it through cascades.
    ///
    /// Returns `false` if no such account existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&mut self, player: PlayerId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM profile WHERE player_id = $1")
            .bind(player.0)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
