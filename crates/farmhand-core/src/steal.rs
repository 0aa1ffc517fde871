//! Stealing from another player's farm.
//!
//! The target's rows are not locked. The outcome is written back with a
//! conditional update on each entry's `robbed_fields` and cycle, so a second
//! thief resolving against the same rows loses the race and rolls back
//! instead of skimming the same fields twice. The same check rejects a
//! theft from a cycle the owner harvested in the meantime.

use chrono::Utc;
use farmhand_db::{FarmStore, InventoryStore};
use farmhand_engine::{GameError, Guard, StealOutcome, TheftBlock, boosts, theft};
use farmhand_types::{EntryId, InventoryLine, PlayerId};
use tracing::{info, warn};

use crate::account::{fetch_account, lock_account};
use crate::context::{GameContext, with_rng};
use crate::error::ServiceError;

/// Cooldown action for stealing.
pub const STEAL_COOLDOWN: &str = "steal";

/// Attempt to steal from `target`'s collectable fields.
///
/// # Errors
///
/// Returns [`GameError::TheftBlocked`] for a self-target, a fenced farm or
/// a farm with nothing eligible, [`GameError::OnCooldown`] while the thief
/// is cooling down, or [`GameError::ConcurrentModificationLost`] if another
/// thief or the owner's harvest got to the fields first.
pub async fn steal(ctx: &GameContext, thief: PlayerId, target: PlayerId) -> Result<StealOutcome, ServiceError> {
    if thief == target {
        return Err(GameError::TheftBlocked(TheftBlock::SelfTarget).into());
    }
    if let Some(remaining_secs) = ctx.cache().cooldown_remaining(thief, STEAL_COOLDOWN).await? {
        return Err(GameError::OnCooldown { remaining_secs }.into());
    }

    let catalog = ctx.catalog();
    let victim = fetch_account(ctx.db(), target).await?;
    let target_boosts = ctx.boosts(target).await?;

    let mut tx = ctx.db().begin().await?;
    lock_account(&mut tx, thief).await?;
    let entries = FarmStore::new(&mut tx).list(target).await?;

    let now = Utc::now();
    let guard = boosts::guard(&target_boosts, now);
    let outcome = with_rng(|rng| theft::resolve(&entries, &catalog, guard, now, rng))?;

    let previous: Vec<(EntryId, u32)> = entries.iter().map(|e| (e.id, e.robbed_fields)).collect();
    if !FarmStore::new(&mut tx).apply_theft(&outcome.updates, &previous).await? {
        return Err(GameError::ConcurrentModificationLost(format!("fields of {target} changed meanwhile")).into());
    }

    let loot: Vec<InventoryLine> = outcome
        .loot
        .iter()
        .map(|(item_id, amount)| InventoryLine {
            item_id: *item_id,
            amount: *amount,
        })
        .collect();
    InventoryStore::new(&mut tx).credit_batch(thief, &loot).await?;
    tx.commit().await?;

    if let Err(e) = ctx
        .cache()
        .start_cooldown(thief, STEAL_COOLDOWN, ctx.config().steal_cooldown_secs)
        .await
    {
        warn!(player_id = %thief, error = %e, "Failed to start steal cooldown");
    }
    info!(
        thief = %thief,
        target = %target,
        won = outcome.won,
        caught = outcome.caught,
        "Resolved theft"
    );
    ctx.notify(theft::robbery_notices(&victim, thief, &outcome, now));
    Ok(outcome)
}

/// Whether `target` exists and can currently be robbed at all.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] for an unknown target, or
/// [`GameError::TheftBlocked`] if a fence is up.
pub async fn check_target(ctx: &GameContext, target: PlayerId) -> Result<(), ServiceError> {
    fetch_account(ctx.db(), target).await?;
    let boosts = ctx.boosts(target).await?;
    if boosts::guard(&boosts, Utc::now()) == Guard::Blocked {
        return Err(GameError::TheftBlocked(TheftBlock::Fence).into());
    }
    Ok(())
}
