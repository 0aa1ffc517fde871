//! Time-boxed player boosts.
//!
//! Boosts are kept as a list of `(kind, until)` pairs. Expired pairs are
//! ignored everywhere and pruned whenever the list is rewritten.

use chrono::{DateTime, Utc};

use farmhand_catalog::Catalog;
use farmhand_types::{ActiveBoost, BoostKind, PlayerAccount};

use crate::checks;
use crate::error::{GameError, Missing};
use crate::schedule::{add_secs, secs_until};

/// Longest single activation, in hours.
pub const MAX_BOOST_HOURS: u32 = 168;

/// Extra capacity granted by the slot boosts.
pub const SLOT_BOOST_BONUS: u32 = 2;

const SECS_PER_HOUR: u64 = 3_600;

/// Theft protection in effect on a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// No guard: thieves take whatever the pool yields.
    Unguarded,
    /// A guard dog catches the thief on 1 of `n` draws.
    CatchOneIn(u32),
    /// A fence: theft is impossible.
    Blocked,
}

/// Whether a boost of `kind` is active at `now`.
pub fn is_active(boosts: &[ActiveBoost], kind: BoostKind, now: DateTime<Utc>) -> bool {
    boosts.iter().any(|b| b.kind == kind && b.until > now)
}

/// Strongest theft protection active at `now`.
pub fn guard(boosts: &[ActiveBoost], now: DateTime<Utc>) -> Guard {
    if is_active(boosts, BoostKind::Fence, now) {
        return Guard::Blocked;
    }
    boosts
        .iter()
        .filter(|b| b.until > now)
        .filter_map(|b| b.kind.catch_one_in())
        .min()
        .map_or(Guard::Unguarded, Guard::CatchOneIn)
}

/// Farm capacity including an active slot boost.
pub fn farm_capacity(account: &PlayerAccount, boosts: &[ActiveBoost], now: DateTime<Utc>) -> u32 {
    let bonus = if is_active(boosts, BoostKind::FarmSlots, now) {
        SLOT_BOOST_BONUS
    } else {
        0
    };
    account.farm_slots.saturating_add(bonus)
}

/// Factory slots including an active slot boost.
pub fn factory_capacity(
    account: &PlayerAccount,
    boosts: &[ActiveBoost],
    now: DateTime<Utc>,
) -> u32 {
    let bonus = if is_active(boosts, BoostKind::FactorySlots, now) {
        SLOT_BOOST_BONUS
    } else {
        0
    };
    account.factory_slots.saturating_add(bonus)
}

/// Seconds until the last active boost expires, `None` if none is active.
pub fn cache_ttl_secs(boosts: &[ActiveBoost], now: DateTime<Utc>) -> Option<u64> {
    boosts
        .iter()
        .filter(|b| b.until > now)
        .map(|b| secs_until(now, b.until))
        .max()
}

/// A priced boost activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostQuote {
    /// Boost bought.
    pub kind: BoostKind,
    /// Hours bought.
    pub hours: u32,
    /// Gold to charge.
    pub cost: i64,
    /// New expiry of the boost.
    pub until: DateTime<Utc>,
    /// The pruned boost list with the activation applied.
    pub boosts: Vec<ActiveBoost>,
}

/// Price activating `kind` for `hours`, extending an active boost of the
/// same kind.
pub fn quote_activation(
    catalog: &Catalog,
    kind: BoostKind,
    hours: u32,
    player_level: u32,
    boosts: &[ActiveBoost],
    now: DateTime<Utc>,
) -> Result<BoostQuote, GameError> {
    let terms = catalog
        .boost(kind)
        .ok_or(GameError::NotFound(Missing::Boost(kind)))?;
    let hours = checks::validate_quantity(i64::from(hours), MAX_BOOST_HOURS)?;
    checks::ensure_level(terms.level, player_level)?;

    let start = boosts
        .iter()
        .filter(|b| b.kind == kind && b.until > now)
        .map(|b| b.until)
        .max()
        .unwrap_or(now);
    let until = add_secs(start, u64::from(hours).saturating_mul(SECS_PER_HOUR));

    let mut next: Vec<ActiveBoost> = boosts
        .iter()
        .filter(|b| b.until > now && b.kind != kind)
        .copied()
        .collect();
    next.push(ActiveBoost { kind, until });
    next.sort_by_key(|b| b.kind);

    Ok(BoostQuote {
        kind,
        hours,
        cost: i64::from(terms.price_per_hour).saturating_mul(i64::from(hours)),
        until,
        boosts: next,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmhand_types::PlayerId;

    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap()
    }

    fn boost(kind: BoostKind, secs: u64) -> ActiveBoost {
        ActiveBoost {
            kind,
            until: add_secs(t0(), secs),
        }
    }

    #[test]
    fn strongest_guard_wins_and_fence_blocks() {
        let now = t0();
        assert_eq!(guard(&[], now), Guard::Unguarded);
        let dogs = [boost(BoostKind::Dog1, 60), boost(BoostKind::Dog4, 60)];
        assert_eq!(guard(&dogs, now), Guard::CatchOneIn(3));
        let fenced = [boost(BoostKind::Dog1, 60), boost(BoostKind::Fence, 60)];
        assert_eq!(guard(&fenced, now), Guard::Blocked);
        assert_eq!(guard(&fenced, add_secs(now, 61)), Guard::Unguarded);
    }

    #[test]
    fn slot_boost_adds_two() {
        let account = PlayerAccount {
            player_id: PlayerId(1),
            gold: 0,
            gems: 0,
            xp: 0,
            farm_slots: 6,
            factory_slots: 3,
            factory_level: 0,
            store_slots: 2,
            notifications: false,
            channel_id: None,
            registered_at: t0(),
        };
        let boosts = [boost(BoostKind::FarmSlots, 60)];
        assert_eq!(farm_capacity(&account, &boosts, t0()), 8);
        assert_eq!(factory_capacity(&account, &boosts, t0()), 3);
        assert_eq!(farm_capacity(&account, &boosts, add_secs(t0(), 60)), 6);
    }

    #[test]
    fn activation_extends_and_prunes() {
        let catalog = catalog();
        let boosts = [boost(BoostKind::Dog1, 1_800), boost(BoostKind::Cat, 0)];
        let quote = quote_activation(&catalog, BoostKind::Dog1, 2, 10, &boosts, t0()).unwrap();
        assert_eq!(quote.cost, 60);
        assert_eq!(quote.until, add_secs(t0(), 9_000));
        assert_eq!(quote.boosts.len(), 1);
        assert_eq!(cache_ttl_secs(&quote.boosts, t0()), Some(9_000));
    }

    #[test]
    fn activation_checks_level_and_hours() {
        let catalog = catalog();
        assert!(matches!(
            quote_activation(&catalog, BoostKind::Fence, 1, 3, &[], t0()),
            Err(GameError::InsufficientResource { .. })
        ));
        assert!(matches!(
            quote_activation(&catalog, BoostKind::Dog1, 0, 10, &[], t0()),
            Err(GameError::InvalidQuantity { .. })
        ));
    }
}
