//! Market: the shared price table, sales, and the periodic price roll.
//!
//! Every serving process runs the roll timer, but only the process that
//! claims the cache lease for the current period rolls. It broadcasts the
//! result and the others adopt it from the bus.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use farmhand_db::{InventoryStore, ProfileStore};
use farmhand_engine::GameError;
use farmhand_engine::checks;
use farmhand_engine::market::{self, SaleQuote};
use farmhand_types::{InventoryLine, ItemId, PlayerId};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::account::lock_account;
use crate::bus::BusEvent;
use crate::context::{GameContext, with_rng};
use crate::error::{ServiceError, stale};

/// The current market board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketBoard {
    /// Catalog snapshot the prices belong to.
    pub version: u64,
    /// Gold paid per unit, by item.
    pub prices: BTreeMap<ItemId, u32>,
}

/// Prices of every market item in the current snapshot.
pub fn prices(ctx: &GameContext) -> MarketBoard {
    let catalog = ctx.catalog();
    MarketBoard {
        version: catalog.version(),
        prices: catalog.market_prices(),
    }
}

/// Price selling `amount` units of `item_id`.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] for an unknown item,
/// [`GameError::WrongItem`] if the market does not buy it, or
/// [`GameError::InsufficientResource`] if the player holds too few.
pub async fn quote_sale(
    ctx: &GameContext,
    player: PlayerId,
    item_id: ItemId,
    amount: i64,
) -> Result<SaleQuote, ServiceError> {
    let amount = checks::validate_quantity(amount, ctx.config().quantity_ceiling)?;
    let catalog = ctx.catalog();
    let item = catalog.find_by_id(item_id).map_err(GameError::from_lookup)?;

    let mut conn = ctx.db().pool().acquire().await?;
    let held = InventoryStore::new(&mut conn)
        .all(player)
        .await?
        .get(&item_id)
        .copied()
        .unwrap_or(0);
    Ok(market::quote_sale(item, amount, held)?)
}

/// Sell what `quote` describes after the player confirmed it.
///
/// The sale pays the price current at commit time, which may differ from
/// the quoted price if the market rolled while the player was confirming.
///
/// # Errors
///
/// Returns [`GameError::StaleConfirmation`] if the stock was spent
/// meanwhile.
pub async fn sell(ctx: &GameContext, player: PlayerId, quote: &SaleQuote) -> Result<SaleQuote, ServiceError> {
    let catalog = ctx.catalog();
    let item = catalog
        .find_by_id(quote.item_id)
        .map_err(GameError::from_lookup)?;

    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    let held = InventoryStore::new(&mut tx)
        .lock(player)
        .await?
        .get(&quote.item_id)
        .copied()
        .unwrap_or(0);

    let fresh = market::quote_sale(item, quote.amount, held).map_err(stale)?;
    let line = InventoryLine {
        item_id: fresh.item_id,
        amount: fresh.amount,
    };
    if !InventoryStore::new(&mut tx).debit_batch(player, &[line]).await? {
        return Err(GameError::ConcurrentModificationLost("inventory changed during sale".to_owned()).into());
    }
    account.gold = account.gold.saturating_add(fresh.gold);
    ProfileStore::new(&mut tx).update(&account).await?;
    tx.commit().await?;

    info!(
        player_id = %player,
        item_id = %fresh.item_id,
        amount = fresh.amount,
        unit_price = fresh.unit_price,
        gold = fresh.gold,
        "Sold to market"
    );
    ctx.invalidate_account(player).await;
    Ok(fresh)
}

/// Roll new market prices and announce them to every process.
///
/// # Errors
///
/// Returns [`ServiceError::Bus`] if the broadcast fails; the new prices
/// are already live locally in that case.
pub async fn refresh_market(ctx: &GameContext) -> Result<MarketBoard, ServiceError> {
    let current = ctx.catalog();
    let next = with_rng(|rng| current.regenerate_market_prices(rng));
    let board = MarketBoard {
        version: next.version(),
        prices: next.market_prices(),
    };
    let revision = next.revision();
    ctx.catalog_handle().swap(next);
    info!(version = board.version, items = board.prices.len(), "Market prices rolled");

    ctx.publish(BusEvent::MarketRolled {
        revision,
        prices: board.prices.clone(),
    })
    .await?;
    Ok(board)
}

/// Index of the roll period containing the current time.
pub fn current_period(interval: Duration) -> u64 {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    now.checked_div(interval.as_secs().max(1)).unwrap_or(0)
}

/// Roll market prices for `period` if no other process has.
///
/// Returns `None` when another process holds the period's lease; its
/// broadcast carries the prices.
///
/// # Errors
///
/// Returns [`ServiceError::Db`] if the lease cannot be claimed, or
/// [`ServiceError::Bus`] if the broadcast fails.
pub async fn roll_for_period(
    ctx: &GameContext,
    period: u64,
    lease_secs: u64,
) -> Result<Option<MarketBoard>, ServiceError> {
    let holder = ctx.instance().to_string();
    if !ctx.cache().claim_market_roll(period, &holder, lease_secs).await? {
        debug!(period, "Market roll for this period belongs to another process");
        return Ok(None);
    }
    refresh_market(ctx).await.map(Some)
}

/// Roll market prices every `interval` until `shutdown` flips.
pub async fn run_market_timer(ctx: Arc<GameContext>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; prices loaded at startup stand.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let period = current_period(interval);
                if let Err(e) = roll_for_period(&ctx, period, interval.as_secs()).await {
                    warn!(period, error = %e, "Market roll failed");
                }
            }
            _ = shutdown.changed() => {
                info!("Market timer stopping");
                break;
            }
        }
    }
}
