//! Shared handles every game operation runs against.
//!
//! A [`GameContext`] bundles the store, the cache, the catalog snapshot
//! handle, the field guard, the notification boundary and the bus. It is
//! built once at startup and shared behind an [`Arc`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use farmhand_catalog::{Catalog, CatalogHandle};
use farmhand_db::{CachePool, PostgresPool};
use farmhand_engine::missions::MissionTuning;
use farmhand_engine::schedule::add_secs;
use farmhand_types::{ActiveBoost, Notification, PlayerId};
use rand::rngs::ThreadRng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::{BusEvent, NatsBus};
use crate::config::GameConfig;
use crate::error::ServiceError;
use crate::guard::FieldGuard;
use crate::notify::Notifier;

/// Everything a game operation needs besides its arguments.
pub struct GameContext {
    instance: Uuid,
    db: PostgresPool,
    cache: CachePool,
    catalog: CatalogHandle,
    guard: FieldGuard,
    notifier: Arc<dyn Notifier>,
    bus: Option<NatsBus>,
    config: GameConfig,
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("instance", &self.instance)
            .field("catalog_version", &self.catalog.version())
            .field("guard", &self.guard)
            .field("bus", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}

impl GameContext {
    /// Assemble a context without a bus; changes stay local to this process.
    pub fn new(
        db: PostgresPool,
        cache: CachePool,
        catalog: CatalogHandle,
        notifier: Arc<dyn Notifier>,
        config: GameConfig,
    ) -> Self {
        Self {
            instance: Uuid::now_v7(),
            db,
            cache,
            catalog,
            guard: FieldGuard::new(),
            notifier,
            bus: None,
            config,
        }
    }

    /// Attach the bus used to broadcast process-wide changes.
    #[must_use]
    pub fn with_bus(mut self, bus: NatsBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Id of this serving process.
    pub const fn instance(&self) -> Uuid {
        self.instance
    }

    /// The persistent store.
    pub const fn db(&self) -> &PostgresPool {
        &self.db
    }

    /// The cache.
    pub const fn cache(&self) -> &CachePool {
        &self.cache
    }

    /// The catalog snapshot current right now.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    /// The swappable catalog handle.
    pub const fn catalog_handle(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// The field guard flag.
    pub const fn guard(&self) -> &FieldGuard {
        &self.guard
    }

    /// Game tuning.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The bus, if this process is connected to one.
    pub const fn bus(&self) -> Option<&NatsBus> {
        self.bus.as_ref()
    }

    /// Mission generation tuning from configuration.
    pub const fn mission_tuning(&self) -> MissionTuning {
        MissionTuning {
            multiplier_pct: self.config.mission_multiplier_pct,
            luck: self.config.mission_luck,
        }
    }

    /// Active boosts of a player.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Db`] if the cache read fails.
    pub async fn boosts(&self, player: PlayerId) -> Result<Vec<ActiveBoost>, ServiceError> {
        Ok(self.cache.get_boosts(player).await?)
    }

    /// Hand notifications to the dispatcher.
    pub fn notify(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.notifier.dispatch(notification);
        }
    }

    /// Drop the cached account after a committed write.
    ///
    /// The cache copy is not authoritative, so a failure is only logged.
    pub async fn invalidate_account(&self, player: PlayerId) {
        if let Err(e) = self.cache.invalidate_account(player).await {
            warn!(player_id = %player, error = %e, "Failed to invalidate cached account");
        }
    }

    // -----------------------------------------------------------------------
    // Process-wide state
    // -----------------------------------------------------------------------

    /// Adopt a catalog snapshot if its revision is later than the current one.
    pub fn on_catalog_reloaded(&self, catalog: Catalog) -> bool {
        let offered = catalog.revision();
        let swapped = self.catalog.swap_if_newer(catalog);
        if swapped {
            info!(version = offered.version, tag = offered.tag, "Catalog snapshot adopted");
        } else {
            debug!(
                offered = ?offered,
                current = ?self.catalog.snapshot().revision(),
                "Ignoring superseded catalog snapshot"
            );
        }
        swapped
    }

    /// Raise the field guard until `until`.
    pub fn on_guard_enabled(&self, until: DateTime<Utc>) {
        self.guard.enable_until(until);
    }

    /// Apply an event received from another process.
    pub fn apply_bus_event(&self, event: BusEvent) {
        match event {
            BusEvent::MarketRolled { revision, prices } => {
                let next = self.catalog().with_market_prices(revision, &prices);
                self.on_catalog_reloaded(next);
            }
            BusEvent::CatalogReloaded { revision } => match Catalog::from_file(&self.config.catalog_path) {
                Ok(fresh) => {
                    let next = fresh.with_market_prices(revision, &fresh.market_prices());
                    self.on_catalog_reloaded(next);
                }
                Err(e) => {
                    error!(version = revision.version, error = %e, "Failed to reload catalog announced on the bus");
                }
            },
            BusEvent::GuardEnabled { until } => self.on_guard_enabled(until),
        }
    }

    /// Broadcast a change already applied locally.
    ///
    /// Without a bus this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bus`] if publishing fails.
    pub async fn publish(&self, event: BusEvent) -> Result<(), ServiceError> {
        match &self.bus {
            Some(bus) => bus.publish(event).await,
            None => Ok(()),
        }
    }

    /// Raise the field guard for `secs` in every process.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bus`] if the broadcast fails; the guard is
    /// already up locally in that case.
    pub async fn enable_guard(&self, secs: u64) -> Result<DateTime<Utc>, ServiceError> {
        let until = add_secs(Utc::now(), secs);
        self.on_guard_enabled(until);
        self.publish(BusEvent::GuardEnabled { until }).await?;
        Ok(until)
    }

    /// Reload the catalog file and make every process adopt it.
    ///
    /// The reload carries [`RELOAD_TAG`](farmhand_catalog::RELOAD_TAG), so it
    /// supersedes a market roll that raced it to the same version.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Catalog`] if the file cannot be loaded, or
    /// [`ServiceError::Bus`] if the broadcast fails.
    pub async fn reload_catalog(&self) -> Result<u64, ServiceError> {
        let fresh = Catalog::from_file(&self.config.catalog_path)?;
        let revision = self.catalog.snapshot().revision().next_reload();
        let next = fresh.with_market_prices(revision, &fresh.market_prices());
        self.on_catalog_reloaded(next);
        self.publish(BusEvent::CatalogReloaded { revision }).await?;
        Ok(revision.version)
    }
}

/// Run `f` with a thread-local random number generator.
///
/// The generator must not live across an `.await`.
pub(crate) fn with_rng<T>(f: impl FnOnce(&mut ThreadRng) -> T) -> T {
    f(&mut rand::rng())
}
