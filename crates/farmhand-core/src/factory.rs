//! Factory operations: queueing production and collecting goods.

use chrono::Utc;
use farmhand_db::{FactoryStore, InventoryStore};
use farmhand_engine::schedule::{self, ProductionPlan, QueueContext};
use farmhand_engine::{GameError, Settlement, boosts, checks, cycle, levels, settlement};
use farmhand_types::{FactoryEntry, FactoryState, ItemId, PlayerId};
use serde::Serialize;
use tracing::info;

use crate::account::{fetch_account, lock_account};
use crate::context::GameContext;
use crate::error::{ServiceError, stale};
use crate::settle;

/// A queued unit with its state at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// The ledger row.
    pub entry: FactoryEntry,
    /// Derived state.
    pub state: FactoryState,
}

/// A player's production queue in completion order.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the read fails.
pub async fn queue(ctx: &GameContext, player: PlayerId) -> Result<Vec<QueueStatus>, ServiceError> {
    let mut conn = ctx.db().pool().acquire().await?;
    let entries = FactoryStore::new(&mut conn).list(player).await?;
    let now = Utc::now();
    Ok(entries
        .into_iter()
        .map(|entry| QueueStatus {
            state: schedule::factory_state(&entry, now),
            entry,
        })
        .collect())
}

/// Plan an order without reserving anything.
///
/// # Errors
///
/// Returns [`GameError`] if the item is unknown or not craftable, the
/// quantity is invalid, or slots or ingredients are short.
pub async fn quote_production(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    amount: i64,
) -> Result<ProductionPlan, ServiceError> {
    let amount = checks::validate_quantity(amount, ctx.config().quantity_ceiling)?;
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;

    let account = fetch_account(ctx.db(), player).await?;
    let boosts = ctx.boosts(player).await?;
    let mut conn = ctx.db().pool().acquire().await?;
    let queued = FactoryStore::new(&mut conn).list(player).await?;
    let inventory = InventoryStore::new(&mut conn).all(player).await?;

    let now = Utc::now();
    let plan = schedule::plan_production(
        item,
        amount,
        &queued,
        &inventory,
        &QueueContext {
            player_id: player,
            player_level: levels::level_for_xp(account.xp),
            worker_level: account.factory_level,
            slots: boosts::factory_capacity(&account, &boosts, now),
            now,
        },
    )?;
    Ok(plan)
}

/// Queue `amount` units of `item_id`, consuming their ingredients.
///
/// Slots and every ingredient line are re-checked under lock; nothing is
/// consumed unless all of them are covered.
///
/// # Errors
///
/// Returns [`GameError::StaleConfirmation`] if slots or ingredients were
/// used up since the order was quoted.
pub async fn queue_production(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    amount: u32,
) -> Result<Vec<FactoryEntry>, ServiceError> {
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;

    let mut tx = ctx.db().begin().await?;
    let account = lock_account(&mut tx, player).await?;
    let queued = FactoryStore::new(&mut tx).lock(player).await?;
    let inventory = InventoryStore::new(&mut tx).lock(player).await?;
    let boosts = ctx.boosts(player).await?;

    let now = Utc::now();
    let plan = schedule::plan_production(
        item,
        amount,
        &queued,
        &inventory,
        &QueueContext {
            player_id: player,
            player_level: levels::level_for_xp(account.xp),
            worker_level: account.factory_level,
            slots: boosts::factory_capacity(&account, &boosts, now),
            now,
        },
    )
    .map_err(stale)?;

    if !InventoryStore::new(&mut tx).debit_batch(player, &plan.consumed).await? {
        return Err(GameError::ConcurrentModificationLost("ingredients changed while queueing".to_owned()).into());
    }
    FactoryStore::new(&mut tx).insert_batch(&plan.entries).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        item_id = %item.id,
        amount = plan.entries.len(),
        "Queued production"
    );
    ctx.notify(schedule::production_reminder(&plan, &account));
    Ok(plan.entries)
}

/// Collect every finished unit in one transaction.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if nothing is ready, or
/// [`GameError::CatalogDesync`] if a ledger row names an unknown item.
pub async fn collect(ctx: &GameContext, player: PlayerId) -> Result<Settlement, ServiceError> {
    let catalog = ctx.catalog();
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let queued = FactoryStore::new(&mut tx).lock(player).await?;

    let plan = cycle::plan_collect(&queued, &catalog, Utc::now())?;
    let settlement = settlement::settle(&account, plan.yields, plan.xp, 0, &catalog);

    FactoryStore::new(&mut tx).delete_batch(&plan.deletes).await?;
    settle::apply(&mut tx, &mut account, &settlement).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        collected = plan.deletes.len(),
        xp = settlement.xp,
        "Collected factory goods"
    );
    ctx.invalidate_account(player).await;
    Ok(settlement)
}
