//! Export contracts.
//!
//! The contract itself lives in the cache with a TTL equal to its remaining
//! time, so an expired contract simply disappears. A fully shipped contract
//! stays until then too; a player gets one contract per time box. Shipments
//! are serialized by the profile row lock; the cache copy is advanced
//! before the transaction commits and put back if the commit fails.

use std::collections::BTreeMap;

use chrono::Utc;
use farmhand_db::InventoryStore;
use farmhand_engine::exports::{self, ShipmentReward};
use farmhand_engine::schedule::secs_until;
use farmhand_engine::{GameError, Limit, Missing, Resource, Settlement, checks, levels, missions, settlement};
use farmhand_types::{ExportContract, InventoryLine, PlayerId};
use serde::Serialize;
use tracing::{error, info};

use crate::account::{fetch_account, lock_account};
use crate::context::{GameContext, with_rng};
use crate::error::ServiceError;
use crate::settle;

/// Result of one delivered shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentReport {
    /// Reward paid for this shipment.
    pub reward: ShipmentReward,
    /// What was credited to the account.
    pub settlement: Settlement,
    /// The contract after the shipment; `None` once fully shipped.
    pub contract: Option<ExportContract>,
}

/// The player's active contract, if any.
///
/// A fully shipped contract counts as active until it expires.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the cache read fails.
pub async fn active_export(ctx: &GameContext, player: PlayerId) -> Result<Option<ExportContract>, ServiceError> {
    let now = Utc::now();
    Ok(ctx
        .cache()
        .get_export(player)
        .await?
        .filter(|contract| contract.expires_at > now))
}

/// Start a new contract.
///
/// # Errors
///
/// Returns [`GameError::AlreadyAtLimit`] if a contract is active or was
/// fulfilled within its time box, or [`GameError::NotFound`] if nothing is
/// unlocked to export yet.
pub async fn start_export(ctx: &GameContext, player: PlayerId) -> Result<ExportContract, ServiceError> {
    if active_export(ctx, player).await?.is_some() {
        return Err(GameError::AlreadyAtLimit(Limit::ActiveExport).into());
    }
    let account = fetch_account(ctx.db(), player).await?;
    let catalog = ctx.catalog();
    let duration = ctx.config().export_secs;
    let contract = with_rng(|rng| {
        exports::generate(
            &catalog,
            player,
            levels::level_for_xp(account.xp),
            duration,
            Utc::now(),
            rng,
        )
    })?;
    ctx.cache().put_export(&contract, duration).await?;

    info!(
        player_id = %player,
        item_id = %contract.item_id,
        amount = contract.amount_per_shipment,
        expires_at = %contract.expires_at,
        "Started export contract"
    );
    Ok(contract)
}

/// Deliver the next shipment of the active contract.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] without an active contract,
/// [`GameError::AlreadyAtLimit`] after the last shipment, or
/// [`GameError::InsufficientResource`] if the player lacks the goods.
pub async fn ship_export(ctx: &GameContext, player: PlayerId) -> Result<ShipmentReport, ServiceError> {
    let catalog = ctx.catalog();
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;

    let contract = ctx
        .cache()
        .get_export(player)
        .await?
        .ok_or(GameError::NotFound(Missing::Export))?;
    let now = Utc::now();
    let reward = exports::next_shipment(&contract, now)?;

    let held = InventoryStore::new(&mut tx).lock(player).await?;
    let have = held.get(&contract.item_id).copied().unwrap_or(0);
    checks::ensure(
        Resource::Item(contract.item_id),
        u64::from(contract.amount_per_shipment),
        u64::from(have),
    )?;
    let line = InventoryLine {
        item_id: contract.item_id,
        amount: contract.amount_per_shipment,
    };
    if !InventoryStore::new(&mut tx).debit_batch(player, &[line]).await? {
        return Err(GameError::ConcurrentModificationLost("inventory changed during shipment".to_owned()).into());
    }

    let items: BTreeMap<_, _> = reward
        .chest_due
        .then(|| with_rng(|rng| missions::draw_chest(&catalog, rng)))
        .flatten()
        .map(|chest| (chest, 1))
        .into_iter()
        .collect();
    let xp = u64::try_from(reward.xp).unwrap_or(0);
    let settlement = settlement::settle(&account, items, xp, reward.gold, &catalog);
    settle::apply(&mut tx, &mut account, &settlement).await?;

    let shipped = ExportContract {
        shipments: reward.number,
        ..contract.clone()
    };
    ctx.cache()
        .put_export(&shipped, secs_until(now, shipped.expires_at))
        .await?;
    let next = (!exports::is_fulfilled(&shipped)).then_some(shipped);

    if let Err(e) = tx.commit().await {
        let ttl = secs_until(Utc::now(), contract.expires_at);
        if let Err(restore) = ctx.cache().put_export(&contract, ttl).await {
            error!(player_id = %player, error = %restore, "Failed to restore export contract after rollback");
        }
        return Err(e.into());
    }

    info!(
        player_id = %player,
        shipment = reward.number,
        gold = reward.gold,
        xp = reward.xp,
        chest = reward.chest_due,
        "Shipped export"
    );
    ctx.invalidate_account(player).await;
    Ok(ShipmentReport {
        reward,
        settlement,
        contract: next,
    })
}
