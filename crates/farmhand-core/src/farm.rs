//! Farm operations: planting, harvesting, clearing fields.

use chrono::Utc;
use farmhand_db::{FarmStore, ModifierStore, ProfileStore};
use farmhand_engine::schedule::{self, PlantContext, PlantQuote};
use farmhand_engine::{GameError, Missing, Resource, Settlement, boosts, checks, cycle, levels, settlement};
use farmhand_types::{BoostKind, FarmEntry, FarmState, ItemId, PlayerId};
use serde::Serialize;
use tracing::{debug, info};

use crate::account::{fetch_account, lock_account};
use crate::context::GameContext;
use crate::error::{ServiceError, stale};
use crate::settle;

/// A farm entry with its state at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldStatus {
    /// The ledger row.
    pub entry: FarmEntry,
    /// Derived state.
    pub state: FarmState,
    /// Whether a harvest now would pay out this entry.
    pub harvestable: bool,
}

/// Outcome of a harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Items, xp and level changes granted.
    pub settlement: Settlement,
    /// Entries that started another cycle.
    pub advanced: usize,
    /// Entries deleted.
    pub retired: usize,
    /// Entries whose current cycle rotted.
    pub rotten: u32,
}

/// A player's farm, ordered by item id.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the read fails.
pub async fn fields(ctx: &GameContext, player: PlayerId) -> Result<Vec<FieldStatus>, ServiceError> {
    let mut conn = ctx.db().pool().acquire().await?;
    let entries = FarmStore::new(&mut conn).list(player).await?;
    let now = Utc::now();
    let guard = ctx.guard().is_active(now);
    Ok(entries
        .into_iter()
        .map(|entry| FieldStatus {
            state: schedule::farm_state(&entry, now),
            harvestable: schedule::is_harvestable(&entry, now, guard),
            entry,
        })
        .collect())
}

/// Price planting `fields` fields of an item, without reserving anything.
///
/// # Errors
///
/// Returns [`GameError`] if the item is unknown or not plantable, the
/// quantity is invalid, or the player lacks level, fields or gold.
pub async fn quote_planting(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    fields: i64,
) -> Result<PlantQuote, ServiceError> {
    let fields = checks::validate_quantity(fields, ctx.config().quantity_ceiling)?;
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;

    let account = fetch_account(ctx.db(), player).await?;
    let boosts = ctx.boosts(player).await?;
    let mut conn = ctx.db().pool().acquire().await?;
    let entries = FarmStore::new(&mut conn).list(player).await?;
    let item_levels = ModifierStore::new(&mut conn).get(player, item_id).await?;

    let now = Utc::now();
    let quote = schedule::plan_planting(
        item,
        fields,
        &PlantContext {
            player_id: player,
            player_level: levels::level_for_xp(account.xp),
            levels: item_levels,
            used_fields: schedule::used_fields(&entries),
            capacity: boosts::farm_capacity(&account, &boosts, now),
            cat_active: boosts::is_active(&boosts, BoostKind::Cat, now),
            now,
        },
    )?;
    checks::ensure_balance(Resource::Gold, quote.cost, account.gold)?;
    Ok(quote)
}

/// Plant what `quote` describes after the player confirmed it.
///
/// Capacity and gold are checked again under the profile lock and the
/// entry window starts at commit time.
///
/// # Errors
///
/// Returns [`GameError::StaleConfirmation`] if fields or gold were spent
/// while the player was confirming.
pub async fn plant(ctx: &GameContext, quote: &PlantQuote) -> Result<FarmEntry, ServiceError> {
    let player = quote.entry.player_id;
    let catalog = ctx.catalog();
    let item = catalog
        .find_by_id(quote.entry.item_id)
        .map_err(GameError::from_lookup)?;

    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let entries = FarmStore::new(&mut tx).lock(player).await?;
    let item_levels = ModifierStore::new(&mut tx).get(player, item.id).await?;
    let boosts = ctx.boosts(player).await?;

    let now = Utc::now();
    let fresh = schedule::plan_planting(
        item,
        quote.entry.fields_used,
        &PlantContext {
            player_id: player,
            player_level: levels::level_for_xp(account.xp),
            levels: item_levels,
            used_fields: schedule::used_fields(&entries),
            capacity: boosts::farm_capacity(&account, &boosts, now),
            cat_active: boosts::is_active(&boosts, BoostKind::Cat, now),
            now,
        },
    )
    .map_err(stale)?;
    checks::ensure_balance(Resource::Gold, fresh.cost, account.gold).map_err(stale)?;

    account.gold = account.gold.saturating_sub(fresh.cost);
    FarmStore::new(&mut tx).insert(&fresh.entry).await?;
    ProfileStore::new(&mut tx).update(&account).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        item_id = %item.id,
        fields = fresh.entry.fields_used,
        cost = fresh.cost,
        "Planted"
    );
    ctx.invalidate_account(player).await;
    ctx.notify(schedule::harvest_reminder(&fresh.entry, &account));
    Ok(fresh.entry)
}

/// Harvest every ready or rotten entry in one transaction.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if nothing is ready, or
/// [`GameError::CatalogDesync`] if a ledger row names an unknown item.
pub async fn harvest(ctx: &GameContext, player: PlayerId) -> Result<HarvestReport, ServiceError> {
    let catalog = ctx.catalog();
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let entries = FarmStore::new(&mut tx).lock(player).await?;
    let item_levels = ModifierStore::new(&mut tx).all_for_player(player).await?;

    let now = Utc::now();
    let plan = cycle::plan_harvest(&entries, &catalog, &item_levels, now, ctx.guard().is_active(now))?;
    let settlement = settlement::settle(&account, plan.yields, plan.xp, 0, &catalog);

    FarmStore::new(&mut tx).update_batch(&plan.updates).await?;
    FarmStore::new(&mut tx).delete_batch(&plan.deletes).await?;
    settle::apply(&mut tx, &mut account, &settlement).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        advanced = plan.updates.len(),
        retired = plan.deletes.len(),
        rotten = plan.rotten,
        xp = settlement.xp,
        "Harvested"
    );
    ctx.invalidate_account(player).await;
    let reminders = plan
        .updates
        .iter()
        .filter_map(|entry| schedule::harvest_reminder(entry, &account));
    ctx.notify(reminders);

    Ok(HarvestReport {
        advanced: plan.updates.len(),
        retired: plan.deletes.len(),
        rotten: plan.rotten,
        settlement,
    })
}

/// Delete rotten entries that the cat boost or guard no longer protect.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if nothing is rotten.
pub async fn clear_rotten(ctx: &GameContext, player: PlayerId) -> Result<u64, ServiceError> {
    let mut tx = ctx.db().begin().await?;
    lock_account(&mut tx, player).await?;
    let entries = FarmStore::new(&mut tx).lock(player).await?;

    let now = Utc::now();
    let rotten = cycle::rotten_entries(&entries, now, ctx.guard().is_active(now));
    if rotten.is_empty() {
        return Err(GameError::NotFound(Missing::ReadyEntries).into());
    }
    let deleted = FarmStore::new(&mut tx).delete_batch(&rotten).await?;
    tx.commit().await?;

    debug!(player_id = %player, deleted, "Cleared rotten fields");
    Ok(deleted)
}

/// Delete every farm entry, or every entry of one item.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the delete fails.
pub async fn clear_all(
    ctx: &GameContext,
    player: PlayerId,
    item: Option<ItemId>,
) -> Result<u64, ServiceError> {
    let mut tx = ctx.db().begin().await?;
    lock_account(&mut tx, player).await?;
    let deleted = FarmStore::new(&mut tx).delete_all(player, item).await?;
    tx.commit().await?;

    info!(player_id = %player, deleted, "Cleared fields");
    Ok(deleted)
}
