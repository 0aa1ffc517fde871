//! Shared, swappable access to the current catalog snapshot.
//!
//! Readers take an [`Arc`] to the snapshot that was current when they asked
//! and keep using it for the whole operation, so one request never sees a
//! half-applied market re-roll. Writers replace the snapshot wholesale.

use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::Catalog;

/// Cloneable handle to the process-wide catalog.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    /// Wrap an initial snapshot.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Version of the current snapshot.
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Replace the current snapshot unconditionally.
    pub fn swap(&self, next: Catalog) {
        let version = next.version();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
        drop(guard);
        tracing::debug!(version, "Catalog snapshot swapped");
    }

    /// Replace the current snapshot only if `next` has a later
    /// [`Revision`](crate::Revision).
    ///
    /// Returns whether the swap happened. Stale broadcasts are ignored, and
    /// of two rolls made at the same version every process keeps the one
    /// with the larger tag.
    pub fn swap_if_newer(&self, next: Catalog) -> bool {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if next.revision() <= guard.revision() {
            return false;
        }
        let revision = next.revision();
        *guard = Arc::new(next);
        drop(guard);
        tracing::debug!(version = revision.version, tag = revision.tag, "Catalog snapshot swapped");
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn handle() -> CatalogHandle {
        let catalog = Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap();
        CatalogHandle::new(catalog)
    }

    #[test]
    fn held_snapshot_survives_swap() {
        let handle = handle();
        let before = handle.snapshot();
        let mut rng = StdRng::seed_from_u64(3);
        handle.swap(before.regenerate_market_prices(&mut rng));
        assert_eq!(before.version(), 1);
        assert_eq!(handle.version(), 2);
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let handle = handle();
        let current = handle.snapshot();
        let mut rng = StdRng::seed_from_u64(5);
        let newer = current.regenerate_market_prices(&mut rng);
        assert!(handle.swap_if_newer(newer.clone()));
        assert!(!handle.swap_if_newer(newer));
        assert!(!handle.swap_if_newer((*current).clone()));
        assert_eq!(handle.version(), 2);
    }

    #[test]
    fn concurrent_rolls_converge() {
        let east = handle();
        let west = handle();
        let east_roll = east
            .snapshot()
            .regenerate_market_prices(&mut StdRng::seed_from_u64(21));
        let west_roll = west
            .snapshot()
            .regenerate_market_prices(&mut StdRng::seed_from_u64(22));
        assert_eq!(east_roll.version(), west_roll.version());
        assert_ne!(east_roll.revision(), west_roll.revision());
        east.swap(east_roll.clone());
        west.swap(west_roll.clone());

        // Each side receives the other's broadcast.
        let east_took = east.swap_if_newer(
            east.snapshot()
                .with_market_prices(west_roll.revision(), &west_roll.market_prices()),
        );
        let west_took = west.swap_if_newer(
            west.snapshot()
                .with_market_prices(east_roll.revision(), &east_roll.market_prices()),
        );

        assert!(east_took ^ west_took);
        assert_eq!(east.snapshot().revision(), west.snapshot().revision());
        assert_eq!(east.snapshot().market_prices(), west.snapshot().market_prices());
    }
}
