//! Applying a settlement inside an open transaction.

use farmhand_db::{InventoryStore, ProfileStore};
use farmhand_engine::Settlement;
use farmhand_types::{InventoryLine, PlayerAccount};
use sqlx::PgConnection;
use tracing::info;

use crate::error::ServiceError;

/// Credit the settlement's items and write the account's new xp, gold and
/// gems. Runs on the caller's transaction; nothing is visible until the
/// caller commits.
pub(crate) async fn apply(
    conn: &mut PgConnection,
    account: &mut PlayerAccount,
    settlement: &Settlement,
) -> Result<(), ServiceError> {
    let lines: Vec<InventoryLine> = settlement
        .items
        .iter()
        .map(|(item_id, amount)| InventoryLine {
            item_id: *item_id,
            amount: *amount,
        })
        .collect();
    InventoryStore::new(&mut *conn)
        .credit_batch(account.player_id, &lines)
        .await?;

    settlement.apply(account);
    ProfileStore::new(conn).update(account).await?;

    if settlement.leveled_up() {
        info!(
            player_id = %account.player_id,
            old_level = settlement.old_level,
            new_level = settlement.new_level,
            gems = settlement.gems_bonus,
            unlocked = settlement.unlocked.len(),
            "Player leveled up"
        );
    }
    Ok(())
}
