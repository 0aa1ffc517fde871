//! Persistence for the `inventory` table.
//!
//! Credits are upserts; debits are guarded by the held amount in the
//! statement itself so a debit can never drive a row negative. Rows that
//! reach zero are pruned in the same transaction.

use std::collections::BTreeMap;

use farmhand_types::{InventoryLine, ItemId, PlayerId};
use sqlx::PgConnection;

use crate::error::DbError;
use crate::rows::{InventoryRow, stored};

/// Operations on the `inventory` table.
pub struct InventoryStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> InventoryStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Everything a player holds, keyed by item.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored amount is negative.
    pub async fn all(&mut self, player: PlayerId) -> Result<BTreeMap<ItemId, u32>, DbError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            "SELECT item_id, amount FROM inventory WHERE player_id = $1 AND amount > 0 ORDER BY item_id",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        collect(rows)
    }

    /// Everything a player holds, row-locked until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::Corrupt`] if a stored amount is negative.
    pub async fn lock(&mut self, player: PlayerId) -> Result<BTreeMap<ItemId, u32>, DbError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            "SELECT item_id, amount FROM inventory WHERE player_id = $1 ORDER BY item_id FOR UPDATE",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        collect(rows)
    }

    /// Add every line to the player's inventory in one statement.
    ///
    /// Lines for the same item are summed before writing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn credit_batch(&mut self, player: PlayerId, lines: &[InventoryLine]) -> Result<(), DbError> {
        let merged = merge(lines);
        if merged.is_empty() {
            return Ok(());
        }

        let items: Vec<i32> = merged.keys().map(|item| item.0).collect();
        let amounts: Vec<i32> = merged.values().map(|amount| stored(*amount)).collect();

        sqlx::query(
            r"INSERT INTO inventory (player_id, item_id, amount)
              SELECT $1, u.item_id, u.amount FROM UNNEST($2::INTEGER[], $3::INTEGER[]) AS u(item_id, amount)
              ON CONFLICT (player_id, item_id) DO UPDATE SET amount = inventory.amount + EXCLUDED.amount",
        )
        .bind(player.0)
        .bind(&items)
        .bind(&amounts)
        .execute(&mut *self.conn)
        .await?;

        tracing::debug!(player_id = %player, lines = items.len(), "Credited inventory");
        Ok(())
    }

    /// Remove every line from the player's inventory.
    ///
    /// Returns `false` if any line was not fully covered; in that case the
    /// caller must roll back since earlier lines may already be applied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn debit_batch(&mut self, player: PlayerId, lines: &[InventoryLine]) -> Result<bool, DbError> {
        let merged = merge(lines);
        if merged.is_empty() {
            return Ok(true);
        }

        let items: Vec<i32> = merged.keys().map(|item| item.0).collect();
        let amounts: Vec<i32> = merged.values().map(|amount| stored(*amount)).collect();

        let result = sqlx::query(
            r"UPDATE inventory AS i
              SET amount = i.amount - u.amount
              FROM UNNEST($2::INTEGER[], $3::INTEGER[]) AS u(item_id, amount)
              WHERE i.player_id = $1 AND i.item_id = u.item_id AND i.amount >= u.amount",
        )
        .bind(player.0)
        .bind(&items)
        .bind(&amounts)
        .execute(&mut *self.conn)
        .await?;

        if usize::try_from(result.rows_affected()).is_ok_and(|n| n == items.len()) {
            self.prune(player).await?;
            Ok(true)
        } else {
            tracing::debug!(player_id = %player, "Inventory debit not covered");
            Ok(false)
        }
    }

    /// Delete rows that reached zero.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn prune(&mut self, player: PlayerId) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM inventory WHERE player_id = $1 AND amount = 0")
            .bind(player.0)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

fn collect(rows: Vec<InventoryRow>) -> Result<BTreeMap<ItemId, u32>, DbError> {
    rows.into_iter()
        .map(|row| InventoryLine::try_from(row).map(|line| (line.item_id, line.amount)))
        .collect()
}

fn merge(lines: &[InventoryLine]) -> BTreeMap<ItemId, u32> {
    let mut merged = BTreeMap::new();
    for line in lines.iter().filter(|line| line.amount > 0) {
        let slot: &mut u32 = merged.entry(line.item_id).or_default();
        *slot = slot.saturating_add(line.amount);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_duplicates_and_drops_zero() {
        let lines = [
            InventoryLine { item_id: ItemId(2), amount: 3 },
            InventoryLine { item_id: ItemId(1), amount: 0 },
            InventoryLine { item_id: ItemId(2), amount: 4 },
        ];
        let merged = merge(&lines);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(&ItemId(2)), Some(&7));
    }
}
