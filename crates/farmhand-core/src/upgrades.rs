//! Paid upgrades: per-item modifier levels and capacity counters.
//!
//! Both follow the quote, confirm, commit shape: the quote is computed
//! without locks, the commit locks the profile and prices the upgrade
//! again before charging.

use farmhand_db::{ModifierStore, ProfileStore};
use farmhand_engine::capacity::{self, CapacityQuote};
use farmhand_engine::modifiers::{self, UpgradeQuote};
use farmhand_engine::{GameError, Resource, checks};
use farmhand_types::{CapacityKind, ItemId, ModifierLevels, ModifierTrack, PlayerAccount, PlayerId};
use tracing::{info, warn};

use crate::account::{fetch_account, lock_account};
use crate::context::GameContext;
use crate::error::{ServiceError, stale};

/// Cooldown action shared by every modifier upgrade of a player.
pub const MODIFY_COOLDOWN: &str = "modify";

fn u64_cost(cost: u64) -> i64 {
    i64::try_from(cost).unwrap_or(i64::MAX)
}

/// Price the next level of `track` for `item_id`.
///
/// # Errors
///
/// Returns [`GameError`] if the item cannot be upgraded, the track is
/// maxed, the upgrade is on cooldown, or gold is short.
pub async fn quote_modifier(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    track: ModifierTrack,
) -> Result<UpgradeQuote, ServiceError> {
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;
    let account = fetch_account(ctx.db(), player).await?;
    let cooldown = ctx.cache().cooldown_remaining(player, MODIFY_COOLDOWN).await?;

    let mut conn = ctx.db().pool().acquire().await?;
    let current = ModifierStore::new(&mut conn).get(player, item_id).await?;

    let quote = modifiers::quote_upgrade(item, current, track, cooldown)?;
    checks::ensure_balance(Resource::Gold, u64_cost(quote.cost), account.gold)?;
    Ok(quote)
}

/// Buy the upgrade `quote` describes after the player confirmed it.
///
/// # Errors
///
/// Returns [`GameError::StaleConfirmation`] if gold was spent meanwhile,
/// or [`GameError::ConcurrentModificationLost`] if the level moved.
pub async fn upgrade_modifier(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    quote: &UpgradeQuote,
) -> Result<ModifierLevels, ServiceError> {
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;

    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let cooldown = ctx.cache().cooldown_remaining(player, MODIFY_COOLDOWN).await?;
    let current = ModifierStore::new(&mut tx).get(player, item_id).await?;

    let fresh = modifiers::quote_upgrade(item, current, quote.track, cooldown)?;
    if fresh.next_level != quote.next_level {
        return Err(GameError::ConcurrentModificationLost(format!(
            "{} level moved to {}",
            quote.track.key(),
            current.level(quote.track)
        ))
        .into());
    }
    let cost = u64_cost(fresh.cost);
    checks::ensure_balance(Resource::Gold, cost, account.gold).map_err(stale)?;

    account.gold = account.gold.saturating_sub(cost);
    ModifierStore::new(&mut tx)
        .set_level(player, item_id, fresh.track, fresh.next_level)
        .await?;
    ProfileStore::new(&mut tx).update(&account).await?;
    tx.commit().await?;

    if let Err(e) = ctx
        .cache()
        .start_cooldown(player, MODIFY_COOLDOWN, fresh.cooldown_secs)
        .await
    {
        warn!(player_id = %player, error = %e, "Failed to start modifier cooldown");
    }
    info!(
        player_id = %player,
        item_id = %item_id,
        track = fresh.track.key(),
        level = fresh.next_level,
        cost,
        "Upgraded modifier"
    );
    ctx.invalidate_account(player).await;
    Ok(fresh.levels)
}

/// Price raising a capacity counter by one.
///
/// # Errors
///
/// Returns [`GameError`] if the counter is maxed or gold is short.
pub async fn quote_capacity(
    ctx: &GameContext,
    player: PlayerId,
    kind: CapacityKind,
) -> Result<CapacityQuote, ServiceError> {
    let account = fetch_account(ctx.db(), player).await?;
    let quote = capacity::quote_upgrade(&account, kind)?;
    checks::ensure_balance(Resource::Gold, quote.cost, account.gold)?;
    Ok(quote)
}

/// Buy the capacity upgrade `quote` describes after the player confirmed.
///
/// # Errors
///
/// Returns [`GameError::StaleConfirmation`] if gold was spent meanwhile,
/// or [`GameError::ConcurrentModificationLost`] if the counter moved.
pub async fn upgrade_capacity(
    ctx: &GameContext,
    player: PlayerId,
    quote: &CapacityQuote,
) -> Result<PlayerAccount, ServiceError> {
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;

    let fresh = capacity::quote_upgrade(&account, quote.kind)?;
    if fresh.next != quote.next {
        return Err(GameError::ConcurrentModificationLost(format!(
            "{:?} is already at {}",
            quote.kind,
            capacity::current(&account, quote.kind)
        ))
        .into());
    }
    checks::ensure_balance(Resource::Gold, fresh.cost, account.gold).map_err(stale)?;

    account.gold = account.gold.saturating_sub(fresh.cost);
    capacity::apply(&mut account, &fresh);
    ProfileStore::new(&mut tx).update(&account).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        kind = ?fresh.kind,
        value = fresh.next,
        cost = fresh.cost,
        "Upgraded capacity"
    );
    ctx.invalidate_account(player).await;
    Ok(account)
}
