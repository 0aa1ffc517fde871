//! Mission board: offers, refreshes and completions.

use std::collections::BTreeMap;

use chrono::Utc;
use farmhand_db::{InventoryStore, MissionStore};
use farmhand_engine::missions::{self, MAX_OPEN_MISSIONS};
use farmhand_engine::{GameError, Missing, Settlement, levels, settlement};
use farmhand_types::{MissionId, MissionOffer, PlayerId};
use tracing::info;

use crate::account::lock_account;
use crate::context::{GameContext, with_rng};
use crate::error::ServiceError;
use crate::settle;

/// The player's open missions, topped up to [`MAX_OPEN_MISSIONS`].
///
/// # Errors
///
/// Returns [`GameError::NotFound`] for an unknown player, or
/// [`ServiceError::Db`] if a read or write fails.
pub async fn offer_missions(ctx: &GameContext, player: PlayerId) -> Result<Vec<MissionOffer>, ServiceError> {
    let catalog = ctx.catalog();
    let tuning = ctx.mission_tuning();

    let mut tx = ctx.db().begin().await?;
    let account = lock_account(&mut tx, player).await?;
    let mut open = MissionStore::new(&mut tx).list(player).await?;
    let missing = MAX_OPEN_MISSIONS.saturating_sub(open.len());
    if missing == 0 {
        return Ok(open);
    }

    let level = levels::level_for_xp(account.xp);
    let now = Utc::now();
    let fresh = with_rng(|rng| {
        (0..missing)
            .map(|_| missions::generate(&catalog, player, level, tuning, now, rng))
            .collect::<Result<Vec<_>, _>>()
    })?;
    for offer in &fresh {
        MissionStore::new(&mut tx).insert(offer).await?;
    }
    tx.commit().await?;

    info!(player_id = %player, generated = fresh.len(), "Topped up missions");
    open.extend(fresh);
    Ok(open)
}

/// Replace an open mission with a newly generated one.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if the mission is not open.
pub async fn refresh_mission(
    ctx: &GameContext,
    player: PlayerId,
    mission: MissionId,
) -> Result<MissionOffer, ServiceError> {
    let catalog = ctx.catalog();
    let tuning = ctx.mission_tuning();

    let mut tx = ctx.db().begin().await?;
    let account = lock_account(&mut tx, player).await?;
    if MissionStore::new(&mut tx).take(player, mission).await?.is_none() {
        return Err(GameError::NotFound(Missing::Mission(mission)).into());
    }

    let level = levels::level_for_xp(account.xp);
    let now = Utc::now();
    let offer = with_rng(|rng| missions::generate(&catalog, player, level, tuning, now, rng))?;
    MissionStore::new(&mut tx).insert(&offer).await?;
    tx.commit().await?;

    info!(player_id = %player, replaced = %mission, mission = %offer.id, "Refreshed mission");
    Ok(offer)
}

/// Deliver a mission's items and pay its reward.
///
/// The offer row is deleted in the same transaction that consumes the
/// items, so a duplicate completion finds nothing to take.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if the mission is not open,
/// [`GameError::ConcurrentModificationLost`] if another request completed
/// it first, or [`GameError::InsufficientResource`] if items are missing.
pub async fn complete_mission(
    ctx: &GameContext,
    player: PlayerId,
    mission: MissionId,
) -> Result<Settlement, ServiceError> {
    let mut conn = ctx.db().pool().acquire().await?;
    if !MissionStore::new(&mut conn).exists(player, mission).await? {
        return Err(GameError::NotFound(Missing::Mission(mission)).into());
    }
    drop(conn);

    let catalog = ctx.catalog();
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let Some(offer) = MissionStore::new(&mut tx).take(player, mission).await? else {
        return Err(GameError::ConcurrentModificationLost(format!("mission {mission} was already completed")).into());
    };

    let held = InventoryStore::new(&mut tx).lock(player).await?;
    let lines = missions::requirements(&offer, &held)?;
    if !InventoryStore::new(&mut tx).debit_batch(player, &lines).await? {
        return Err(GameError::ConcurrentModificationLost("inventory changed during mission".to_owned()).into());
    }

    let items: BTreeMap<_, _> = offer.chest.map(|chest| (chest, 1)).into_iter().collect();
    let xp = u64::try_from(offer.xp).unwrap_or(0);
    let settlement = settlement::settle(&account, items, xp, offer.gold, &catalog);
    settle::apply(&mut tx, &mut account, &settlement).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        mission = %mission,
        gold = offer.gold,
        xp = offer.xp,
        chest = offer.chest.is_some(),
        "Completed mission"
    );
    ctx.invalidate_account(player).await;
    Ok(settlement)
}
