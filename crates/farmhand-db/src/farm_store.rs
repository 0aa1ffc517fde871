//! Persistence for the `planted` table, the farm ledger.
//!
//! Harvests touch many entries at once, so updates and deletes are sent
//! as a single UNNEST or `ANY` statement instead of one per row.

use chrono::{DateTime, Utc};
use farmhand_types::{EntryId, FarmEntry, ItemId, PlayerId};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::{PlantedRow, stored};

const PLANTED_COLUMNS: &str = "id, player_id, item_id, amount, field_yield, fields_used, iterations, starts, ends, dies, robbed_fields, cat_boost";

/// Operations on the `planted` table.
pub struct FarmStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> FarmStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// All entries of a player, ordered by item, start time, then id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored count is negative.
    pub async fn list(&mut self, player: PlayerId) -> Result<Vec<FarmEntry>, DbError> {
        let sql = format!(
            "SELECT {PLANTED_COLUMNS} FROM planted WHERE player_id = $1 ORDER BY item_id, starts, id"
        );
        self.fetch(&sql, player).await
    }

    /// All entries of a player, row-locked until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored count is negative.
    pub async fn lock(&mut self, player: PlayerId) -> Result<Vec<FarmEntry>, DbError> {
        let sql = format!(
            "SELECT {PLANTED_COLUMNS} FROM planted WHERE player_id = $1 ORDER BY item_id, starts, id FOR UPDATE"
        );
        self.fetch(&sql, player).await
    }

    async fn fetch(&mut self, sql: &str, player: PlayerId) -> Result<Vec<FarmEntry>, DbError> {
        let rows = sqlx::query_as::<_, PlantedRow>(sql)
            .bind(player.0)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(FarmEntry::try_from).collect()
    }

    /// Insert a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&mut self, entry: &FarmEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO planted (id, player_id, item_id, amount, field_yield, fields_used, iterations, starts, ends, dies, robbed_fields, cat_boost)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(entry.id.into_inner())
        .bind(entry.player_id.0)
        .bind(entry.item_id.0)
        .bind(stored(entry.amount))
        .bind(stored(entry.field_yield))
        .bind(stored(entry.fields_used))
        .bind(stored(entry.iterations))
        .bind(entry.starts)
        .bind(entry.ends)
        .bind(entry.dies)
        .bind(stored(entry.robbed_fields))
        .bind(entry.cat_boost)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Overwrite the mutable columns of many entries in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_batch(&mut self, entries: &[FarmEntry]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }

        let len = entries.len();
        let mut ids: Vec<Uuid> = Vec::with_capacity(len);
        let mut amounts: Vec<i32> = Vec::with_capacity(len);
        let mut field_yields: Vec<i32> = Vec::with_capacity(len);
        let mut iterations: Vec<i32> = Vec::with_capacity(len);
        let mut starts: Vec<DateTime<Utc>> = Vec::with_capacity(len);
        let mut ends: Vec<DateTime<Utc>> = Vec::with_capacity(len);
        let mut dies: Vec<DateTime<Utc>> = Vec::with_capacity(len);
        let mut robbed: Vec<i32> = Vec::with_capacity(len);

        for entry in entries {
            ids.push(entry.id.into_inner());
            amounts.push(stored(entry.amount));
            field_yields.push(stored(entry.field_yield));
            iterations.push(stored(entry.iterations));
            starts.push(entry.starts);
            ends.push(entry.ends);
            dies.push(entry.dies);
            robbed.push(stored(entry.robbed_fields));
        }

        sqlx::query(
            r"UPDATE planted AS p
              SET amount = u.amount, field_yield = u.field_yield, iterations = u.iterations,
                  starts = u.starts, ends = u.ends, dies = u.dies, robbed_fields = u.robbed_fields
              FROM UNNEST($1::UUID[], $2::INTEGER[], $3::INTEGER[], $4::INTEGER[], $5::TIMESTAMPTZ[], $6::TIMESTAMPTZ[], $7::TIMESTAMPTZ[], $8::INTEGER[])
                   AS u(id, amount, field_yield, iterations, starts, ends, dies, robbed_fields)
              WHERE p.id = u.id",
        )
        .bind(&ids)
        .bind(&amounts)
        .bind(&field_yields)
        .bind(&iterations)
        .bind(&starts)
        .bind(&ends)
        .bind(&dies)
        .bind(&robbed)
        .execute(&mut *self.conn)
        .await?;

        tracing::debug!(count = len, "Updated farm entries (batch UNNEST)");
        Ok(())
    }

    /// Delete many entries by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_batch(&mut self, ids: &[EntryId]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let raw: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let result = sqlx::query("DELETE FROM planted WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every entry of a player, or only those of one item.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_all(&mut self, player: PlayerId, item: Option<ItemId>) -> Result<u64, DbError> {
        let result = sqlx::query(
            "DELETE FROM planted WHERE player_id = $1 AND ($2::INTEGER IS NULL OR item_id = $2)",
        )
        .bind(player.0)
        .bind(item.map(|i| i.0))
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }
}

impl FarmStore<'_> {
    /// Write a theft's effect on the target's entries, guarded by the
    /// state each entry had when it was read.
    ///
    /// `previous` pairs each entry id with the `robbed_fields` the caller
    /// resolved against. Each update still carries the `iterations` and
    /// `ends` of the cycle it was resolved against, so a row the owner
    /// harvested and advanced into a new cycle meanwhile does not match.
    /// Returns `false` if any entry moved; the caller must then roll back.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn apply_theft(
        &mut self,
        updates: &[FarmEntry],
        previous: &[(EntryId, u32)],
    ) -> Result<bool, DbError> {
        if updates.is_empty() {
            return Ok(true);
        }

        let len = updates.len();
        let mut ids: Vec<Uuid> = Vec::with_capacity(len);
        let mut amounts: Vec<i32> = Vec::with_capacity(len);
        let mut robbed: Vec<i32> = Vec::with_capacity(len);
        let mut expected: Vec<i32> = Vec::with_capacity(len);
        let mut iterations: Vec<i32> = Vec::with_capacity(len);
        let mut ends: Vec<DateTime<Utc>> = Vec::with_capacity(len);

        for entry in updates {
            let Some((_, before)) = previous.iter().find(|(id, _)| *id == entry.id) else {
                return Ok(false);
            };
            ids.push(entry.id.into_inner());
            amounts.push(stored(entry.amount));
            robbed.push(stored(entry.robbed_fields));
            expected.push(stored(*before));
            iterations.push(stored(entry.iterations));
            ends.push(entry.ends);
        }

        let result = sqlx::query(
            r"UPDATE planted AS p
              SET amount = u.amount, robbed_fields = u.robbed_fields
              FROM UNNEST($1::UUID[], $2::INTEGER[], $3::INTEGER[], $4::INTEGER[], $5::INTEGER[], $6::TIMESTAMPTZ[])
                   AS u(id, amount, robbed_fields, expected, iterations, ends)
              WHERE p.id = u.id
                AND p.robbed_fields = u.expected
                AND p.iterations = u.iterations
                AND p.ends = u.ends",
        )
        .bind(&ids)
        .bind(&amounts)
        .bind(&robbed)
        .bind(&expected)
        .bind(&iterations)
        .bind(&ends)
        .execute(&mut *self.conn)
        .await?;

        Ok(usize::try_from(result.rows_affected()).is_ok_and(|n| n == len))
    }
}
