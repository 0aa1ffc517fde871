//! Persistence for the `factory` table, the production queue.

use chrono::{DateTime, Utc};
use farmhand_types::{EntryId, FactoryEntry, PlayerId};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::FactoryRow;

/// Operations on the `factory` table.
pub struct FactoryStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> FactoryStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// The queue of a player in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&mut self, player: PlayerId) -> Result<Vec<FactoryEntry>, DbError> {
        let rows = sqlx::query_as::<_, FactoryRow>(
            "SELECT id, player_id, item_id, starts, ends FROM factory WHERE player_id = $1 ORDER BY ends, id",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(FactoryEntry::from).collect())
    }

    /// The queue of a player, row-locked until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn lock(&mut self, player: PlayerId) -> Result<Vec<FactoryEntry>, DbError> {
        let rows = sqlx::query_as::<_, FactoryRow>(
            "SELECT id, player_id, item_id, starts, ends FROM factory WHERE player_id = $1 ORDER BY ends, id FOR UPDATE",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(FactoryEntry::from).collect())
    }

    /// Append entries to the queue in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_batch(&mut self, entries: &[FactoryEntry]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }

        let len = entries.len();
        let mut ids: Vec<Uuid> = Vec::with_capacity(len);
        let mut players: Vec<i64> = Vec::with_capacity(len);
        let mut items: Vec<i32> = Vec::with_capacity(len);
        let mut starts: Vec<DateTime<Utc>> = Vec::with_capacity(len);
        let mut ends: Vec<DateTime<Utc>> = Vec::with_capacity(len);

        for entry in entries {
            ids.push(entry.id.into_inner());
            players.push(entry.player_id.0);
            items.push(entry.item_id.0);
            starts.push(entry.starts);
            ends.push(entry.ends);
        }

        sqlx::query(
            r"INSERT INTO factory (id, player_id, item_id, starts, ends)
              SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[], $3::INTEGER[], $4::TIMESTAMPTZ[], $5::TIMESTAMPTZ[])",
        )
        .bind(&ids)
        .bind(&players)
        .bind(&items)
        .bind(&starts)
        .bind(&ends)
        .execute(&mut *self.conn)
        .await?;

        tracing::debug!(count = len, "Queued factory entries (batch UNNEST)");
        Ok(())
    }

    /// Remove collected entries.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_batch(&mut self, ids: &[EntryId]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let raw: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let result = sqlx::query("DELETE FROM factory WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}
