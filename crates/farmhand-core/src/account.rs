//! Account lifecycle: registration, deletion, cached reads.

use chrono::Utc;
use farmhand_db::{ProfileStore, PostgresPool};
use farmhand_engine::levels::{self, LevelProgress};
use farmhand_engine::{GameError, Limit, Missing};
use farmhand_types::{ChannelId, PlayerAccount, PlayerId};
use serde::Serialize;
use sqlx::PgConnection;
use tracing::{info, warn};

use crate::context::GameContext;
use crate::error::ServiceError;

/// An account with its derived level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    /// Stored account state.
    pub account: PlayerAccount,
    /// Level derived from experience.
    pub progress: LevelProgress,
}

/// Lock a player's profile row for the rest of the transaction.
pub(crate) async fn lock_account(
    conn: &mut PgConnection,
    player: PlayerId,
) -> Result<PlayerAccount, ServiceError> {
    ProfileStore::new(conn)
        .lock(player)
        .await?
        .ok_or(ServiceError::Game(GameError::NotFound(Missing::Account(player))))
}

/// Read a profile row without locking it.
pub(crate) async fn fetch_account(
    db: &PostgresPool,
    player: PlayerId,
) -> Result<PlayerAccount, ServiceError> {
    let mut conn = db.pool().acquire().await?;
    ProfileStore::new(&mut conn)
        .fetch(player)
        .await?
        .ok_or(ServiceError::Game(GameError::NotFound(Missing::Account(player))))
}

/// Create an account with the configured starting balances.
///
/// # Errors
///
/// Returns [`GameError::AlreadyAtLimit`] with [`Limit::Registration`] if the
/// player is already registered.
pub async fn register(
    ctx: &GameContext,
    player: PlayerId,
    channel: Option<ChannelId>,
) -> Result<PlayerAccount, ServiceError> {
    let game = ctx.config();
    let account = PlayerAccount {
        player_id: player,
        gold: game.starting_gold,
        gems: game.starting_gems,
        xp: 0,
        farm_slots: game.base_farm_slots,
        factory_slots: game.base_factory_slots,
        factory_level: 0,
        store_slots: game.base_store_slots,
        notifications: true,
        channel_id: channel,
        registered_at: Utc::now(),
    };

    let mut conn = ctx.db().pool().acquire().await?;
    if !ProfileStore::new(&mut conn).insert(&account).await? {
        return Err(GameError::AlreadyAtLimit(Limit::Registration).into());
    }

    info!(player_id = %player, gold = account.gold, "Registered player");
    Ok(account)
}

/// Delete an account and everything it owns.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if the player is not registered.
pub async fn delete(ctx: &GameContext, player: PlayerId) -> Result<(), ServiceError> {
    let mut conn = ctx.db().pool().acquire().await?;
    if !ProfileStore::new(&mut conn).delete(player).await? {
        return Err(GameError::NotFound(Missing::Account(player)).into());
    }
    drop(conn);

    if let Err(e) = ctx.cache().purge_player(player).await {
        warn!(player_id = %player, error = %e, "Failed to purge cache for deleted player");
    }
    info!(player_id = %player, "Deleted player");
    Ok(())
}

/// Read an account through the cache.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if the player is not registered.
pub async fn get_account(ctx: &GameContext, player: PlayerId) -> Result<AccountView, ServiceError> {
    let cached = match ctx.cache().get_account(player).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(player_id = %player, error = %e, "Account cache read failed");
            None
        }
    };

    let account = match cached {
        Some(account) => account,
        None => {
            let account = fetch_account(ctx.db(), player).await?;
            if let Err(e) = ctx.cache().put_account(&account).await {
                warn!(player_id = %player, error = %e, "Account cache write failed");
            }
            account
        }
    };

    Ok(AccountView {
        progress: levels::progress(account.xp),
        account,
    })
}

/// Turn harvest reminders on or off and set where they are posted.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if the player is not registered.
pub async fn set_notifications(
    ctx: &GameContext,
    player: PlayerId,
    enabled: bool,
    channel: Option<ChannelId>,
) -> Result<PlayerAccount, ServiceError> {
    let mut tx = ctx.db().begin().await?;
    let mut account = lock_account(&mut tx, player).await?;
    account.notifications = enabled;
    if channel.is_some() {
        account.channel_id = channel;
    }
    ProfileStore::new(&mut tx).update(&account).await?;
    tx.commit().await?;

    ctx.invalidate_account(player).await;
    Ok(account)
}
