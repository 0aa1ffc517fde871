//! Farmhand game backend process.
//!
//! Wires storage, the item catalog, the NATS bus and the periodic timers
//! into a [`GameContext`] and keeps them running until interrupted. The
//! chat front end drives the game through `farmhand-core` operations.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `farmhand-config.yaml`
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Connect to the cache
//! 5. Load the item catalog
//! 6. Start the reminder dispatcher
//! 7. Connect to NATS (optional; without it changes stay local)
//! 8. Start the bus listener and the market timer
//! 9. Wait for Ctrl-C, then stop tasks and close pools

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use farmhand_catalog::{Catalog, CatalogHandle};
use farmhand_core::bus::{self, NatsBus};
use farmhand_core::config::{FarmhandConfig, LoggingConfig};
use farmhand_core::notify::ChannelNotifier;
use farmhand_core::{GameContext, market};
use farmhand_db::{CachePool, PostgresConfig, PostgresPool};
use farmhand_types::Notification;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Default configuration path, overridable with `FARMHAND_CONFIG`.
const CONFIG_PATH: &str = "farmhand-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1-2. Configuration decides the log format, so read it first.
    let config_path = std::env::var("FARMHAND_CONFIG").map_or_else(|_| PathBuf::from(CONFIG_PATH), PathBuf::from);
    let config = FarmhandConfig::load_or_default(&config_path).map_err(ServerError::from)?;
    init_tracing(&config.logging);

    info!(
        config = %config_path.display(),
        catalog = %config.game.catalog_path.display(),
        market_refresh_secs = config.game.market_refresh_secs,
        "farmhand-server starting"
    );

    // 3. PostgreSQL.
    let pg_config = PostgresConfig::new(&config.infrastructure.postgres_url)
        .with_max_connections(config.infrastructure.postgres_max_connections);
    let db = PostgresPool::connect(&pg_config).await.map_err(ServerError::from)?;
    db.run_migrations().await.map_err(ServerError::from)?;

    // 4. Cache.
    let cache = CachePool::connect(&config.infrastructure.cache_url)
        .await
        .map_err(ServerError::from)?
        .with_account_ttl(config.game.account_cache_secs);

    // 5. Catalog.
    let catalog = Catalog::from_file(&config.game.catalog_path).map_err(ServerError::from)?;
    info!(
        version = catalog.version(),
        items = catalog.items().count(),
        "Catalog loaded"
    );

    // 6. Reminders.
    let (notifier, reminders) = ChannelNotifier::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = tokio::spawn(dispatch_reminders(reminders, shutdown_rx.clone()));

    let mut ctx = GameContext::new(
        db.clone(),
        cache.clone(),
        CatalogHandle::new(catalog),
        Arc::new(notifier),
        config.game.clone(),
    );

    // 7. NATS.
    let mut subscriber = None;
    match NatsBus::connect(&config.infrastructure.nats_url).await {
        Ok(nats) => {
            match nats.subscribe().await {
                Ok(sub) => subscriber = Some((sub, nats.origin())),
                Err(e) => warn!(error = %e, "Bus subscription failed, remote changes will be missed"),
            }
            ctx = ctx.with_bus(nats);
        }
        Err(e) => warn!(error = %e, "Running without a bus, changes stay local to this process"),
    }
    let ctx = Arc::new(ctx);

    // 8. Background tasks.
    let listener = subscriber.map(|(sub, origin)| {
        tokio::spawn(bus::run_listener(Arc::clone(&ctx), sub, origin, shutdown_rx.clone()))
    });
    let timer = tokio::spawn(market::run_market_timer(
        Arc::clone(&ctx),
        Duration::from_secs(config.game.market_refresh_secs.max(1)),
        shutdown_rx,
    ));
    info!("farmhand-server ready");

    // 9. Shutdown.
    tokio::signal::ctrl_c().await.map_err(ServerError::from)?;
    info!("Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        warn!("Background tasks already stopped");
    }
    for handle in [Some(timer), listener, Some(dispatcher)].into_iter().flatten() {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background task ended abnormally");
        }
    }

    if let Err(e) = cache.close().await {
        warn!(error = %e, "Failed to close cache connection");
    }
    db.close().await;
    info!("farmhand-server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if logging.is_json() {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Hold each reminder until it is due and hand it to the log.
///
/// The chat front end tails these records to post the actual messages.
async fn dispatch_reminders(
    mut reminders: mpsc::UnboundedReceiver<Notification>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = reminders.recv() => {
                let Some(reminder) = next else {
                    break;
                };
                let delay = reminder
                    .fire_at
                    .signed_duration_since(Utc::now())
                    .to_std().unwrap_or(Duration::ZERO);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    info!(
                        player_id = %reminder.player_id,
                        channel_id = ?reminder.channel_id,
                        item_id = %reminder.item_id,
                        amount = reminder.amount,
                        kind = ?reminder.kind,
                        "Reminder due"
                    );
                });
            }
            _ = shutdown.changed() => break,
        }
    }
}
