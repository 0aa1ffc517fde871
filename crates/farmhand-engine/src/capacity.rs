//! Capacity upgrades: farm fields, factory slots, workers, store slots.

use farmhand_types::{CapacityKind, PlayerAccount};

use crate::error::{GameError, Limit};
use crate::schedule::MAX_FACTORY_WORKERS;

/// Highest purchasable farm field count.
pub const MAX_FARM_SLOTS: u32 = 30;

/// Highest purchasable factory slot count.
pub const MAX_FACTORY_SLOTS: u32 = 20;

/// Highest purchasable store slot count.
pub const MAX_STORE_SLOTS: u32 = 12;

/// Current value of a capacity counter.
pub const fn current(account: &PlayerAccount, kind: CapacityKind) -> u32 {
    match kind {
        CapacityKind::FarmSlots => account.farm_slots,
        CapacityKind::FactorySlots => account.factory_slots,
        CapacityKind::FactoryWorkers => account.factory_level,
        CapacityKind::StoreSlots => account.store_slots,
    }
}

/// Maximum value of a capacity counter.
pub const fn maximum(kind: CapacityKind) -> u32 {
    match kind {
        CapacityKind::FarmSlots => MAX_FARM_SLOTS,
        CapacityKind::FactorySlots => MAX_FACTORY_SLOTS,
        CapacityKind::FactoryWorkers => MAX_FACTORY_WORKERS,
        CapacityKind::StoreSlots => MAX_STORE_SLOTS,
    }
}

const fn unit_cost(kind: CapacityKind) -> i64 {
    match kind {
        CapacityKind::FarmSlots => 150,
        CapacityKind::FactorySlots => 250,
        CapacityKind::FactoryWorkers => 800,
        CapacityKind::StoreSlots => 200,
    }
}

/// A priced capacity upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityQuote {
    /// Counter upgraded.
    pub kind: CapacityKind,
    /// Value after the upgrade.
    pub next: u32,
    /// Gold to charge.
    pub cost: i64,
}

/// Price raising `kind` by one. Cost grows with the square of the new value.
pub fn quote_upgrade(account: &PlayerAccount, kind: CapacityKind) -> Result<CapacityQuote, GameError> {
    let now = current(account, kind);
    if now >= maximum(kind) {
        return Err(GameError::AlreadyAtLimit(Limit::Capacity(kind)));
    }
    let next = now.saturating_add(1);
    let cost = unit_cost(kind).saturating_mul(i64::from(next).saturating_mul(i64::from(next)));
    Ok(CapacityQuote { kind, next, cost })
}

/// Write an upgraded value back to the account.
pub const fn apply(account: &mut PlayerAccount, quote: &CapacityQuote) {
    match quote.kind {
        CapacityKind::FarmSlots => account.farm_slots = quote.next,
        CapacityKind::FactorySlots => account.factory_slots = quote.next,
        CapacityKind::FactoryWorkers => account.factory_level = quote.next,
        CapacityKind::StoreSlots => account.store_slots = quote.next,
    }
}
