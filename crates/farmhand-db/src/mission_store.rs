//! Persistence for the `missions` table.

use farmhand_types::{MissionId, MissionOffer, PlayerId};
use sqlx::PgConnection;
use sqlx::types::Json;

use crate::error::DbError;
use crate::rows::MissionRow;

/// Operations on the `missions` table.
pub struct MissionStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> MissionStore<'c> {
    /// Create a store bound to a connection or open transaction.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Open offers of a player, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&mut self, player: PlayerId) -> Result<Vec<MissionOffer>, DbError> {
        let rows = sqlx::query_as::<_, MissionRow>(
            "SELECT id, player_id, lines, gold, xp, chest, created_at FROM missions WHERE player_id = $1 ORDER BY created_at, id",
        )
        .bind(player.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(MissionOffer::from).collect())
    }

    /// Persist a freshly generated offer.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&mut self, offer: &MissionOffer) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO missions (id, player_id, lines, gold, xp, chest, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(offer.id.into_inner())
        .bind(offer.player_id.0)
        .bind(Json(&offer.lines))
        .bind(offer.gold)
        .bind(offer.xp)
        .bind(offer.chest.map(|c| c.0))
        .bind(offer.created_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Remove an offer and return it.
    ///
    /// Returns `None` if the offer does not exist or belongs to someone
    /// else; of two concurrent takers only one gets the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn take(&mut self, player: PlayerId, id: MissionId) -> Result<Option<MissionOffer>, DbError> {
        let row = sqlx::query_as::<_, MissionRow>(
            r"DELETE FROM missions WHERE id = $1 AND player_id = $2
              RETURNING id, player_id, lines, gold, xp, chest, created_at",
        )
        .bind(id.into_inner())
        .bind(player.0)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(MissionOffer::from))
    }

    /// Whether an offer exists, without taking it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn exists(&mut self, player: PlayerId, id: MissionId) -> Result<bool, DbError> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM missions WHERE id = $1 AND player_id = $2")
            .bind(id.into_inner())
            .bind(player.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.is_some())
    }
}
