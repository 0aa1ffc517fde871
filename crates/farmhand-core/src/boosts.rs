//! Boost purchases.
//!
//! Active boosts live only in the cache, keyed per player, and expire with
//! the longest running boost. Gold is charged in Postgres; the cache list
//! is written before the charge commits and restored if the commit fails.

use chrono::Utc;
use farmhand_db::ProfileStore;
use farmhand_engine::boosts::{self, BoostQuote};
use farmhand_engine::{Resource, checks, levels};
use farmhand_types::{ActiveBoost, BoostKind, PlayerId};
use tracing::{error, info};

use crate::account::{fetch_account, lock_account};
use crate::context::GameContext;
use crate::error::{ServiceError, stale};

/// Boosts still running for a player.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the cache read fails.
pub async fn active_boosts(ctx: &GameContext, player: PlayerId) -> Result<Vec<ActiveBoost>, ServiceError> {
    let now = Utc::now();
    let mut active = ctx.boosts(player).await?;
    active.retain(|b| b.until > now);
    Ok(active)
}

/// Price activating `kind` for `hours`.
///
/// # Errors
///
/// Returns [`farmhand_engine::GameError`] if the boost is unknown, the
/// hours are invalid, or the player lacks level or gold.
pub async fn quote_boost(
    ctx: &GameContext,
    player: PlayerId,
    kind: BoostKind,
    hours: u32,
) -> Result<BoostQuote, ServiceError> {
    let account = fetch_account(ctx.db(), player).await?;
    let current = ctx.boosts(player).await?;
    let quote = boosts::quote_activation(
        &ctx.catalog(),
        kind,
        hours,
        levels::level_for_xp(account.xp),
        &current,
        Utc::now(),
    )?;
    checks::ensure_balance(Resource::Gold, quote.cost, account.gold)?;
    Ok(quote)
}

/// Activate the boost `quote` describes after the player confirmed it.
///
/// The expiry is recomputed at commit time so an extension counts from the
/// boost's latest expiry.
///
/// # Errors
///
/// Returns [`farmhand_engine::GameError::StaleConfirmation`] if gold was
/// spent meanwhile, or [`ServiceError::Db`] if a write fails.
pub async fn activate_boost(
    ctx: &GameContext,
    player: PlayerId,
    quote: &BoostQuote,
) -> Result<BoostQuote, ServiceError> {
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let previous = ctx.boosts(player).await?;

    let now = Utc::now();
    let fresh = boosts::quote_activation(
        &ctx.catalog(),
        quote.kind,
        quote.hours,
        levels::level_for_xp(account.xp),
        &previous,
        now,
    )
    .map_err(stale)?;
    checks::ensure_balance(Resource::Gold, fresh.cost, account.gold).map_err(stale)?;

    account.gold = account.gold.saturating_sub(fresh.cost);
    ProfileStore::new(&mut tx).update(&account).await?;

    let ttl = boosts::cache_ttl_secs(&fresh.boosts, now).unwrap_or(1);
    ctx.cache().put_boosts(player, &fresh.boosts, ttl).await?;

    if let Err(e) = tx.commit().await {
        restore(ctx, player, &previous).await;
        return Err(e.into());
    }

    info!(
        player_id = %player,
        kind = ?fresh.kind,
        hours = fresh.hours,
        until = %fresh.until,
        cost = fresh.cost,
        "Activated boost"
    );
    ctx.invalidate_account(player).await;
    Ok(fresh)
}

async fn restore(ctx: &GameContext, player: PlayerId, previous: &[ActiveBoost]) {
    let now = Utc::now();
    let result = match boosts::cache_ttl_secs(previous, now) {
        Some(ttl) => ctx.cache().put_boosts(player, previous, ttl).await,
        None => ctx.cache().put_boosts(player, &[], 1).await,
    };
    if let Err(e) = result {
        error!(player_id = %player, error = %e, "Failed to restore boosts after a rolled back purchase");
    }
}
