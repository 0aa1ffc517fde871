//! Per-item upgrade effects and upgrade pricing.
//!
//! Three independent tracks, each levelled 0..=[`MAX_MODIFIER_LEVEL`]:
//!
//! | Track | Effect per level |
//! |-------|------------------|
//! | grow time | -5% of base grow time |
//! | collect window | +10% of base window |
//! | volume | +10% of base yield per field |
//!
//! Effects are floored on the base value, so a missing modifier row and an
//! all-zero row behave identically.

use farmhand_catalog::ItemDefinition;
use farmhand_types::{ModifierLevels, ModifierTrack};

use crate::error::{GameError, Limit};

/// Highest level on every track.
pub const MAX_MODIFIER_LEVEL: u8 = 10;

/// Fixed part of the upgrade cooldown, in seconds.
const COOLDOWN_BASE_SECS: u64 = 60;

/// Exponent of the upgrade price curve.
const COST_EXPONENT: f64 = 1.55;

/// Exponent of the upgrade cooldown curve.
const COOLDOWN_EXPONENT: f64 = 4.9362;

/// `base * level * pct / 100`, floored.
fn percent_of(base: u32, level: u8, pct: u64) -> u64 {
    u64::from(base)
        .saturating_mul(u64::from(level.min(MAX_MODIFIER_LEVEL)))
        .saturating_mul(pct)
        / 100
}

fn to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Grow time after the grow-time track discount.
pub fn effective_grow_time(base: u32, level: u8) -> u32 {
    to_u32(u64::from(base).saturating_sub(percent_of(base, level, 5)))
}

/// Collect window after the window track extension.
pub fn effective_collect_window(base: u32, level: u8) -> u32 {
    to_u32(u64::from(base).saturating_add(percent_of(base, level, 10)))
}

/// Yield per field after the volume track bonus.
pub fn effective_yield(base: u32, level: u8) -> u32 {
    to_u32(u64::from(base).saturating_add(percent_of(base, level, 10)))
}

/// Round to the nearest multiple of ten.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_ten(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    ((value / 10.0).round() * 10.0) as u64
}

/// Gold cost of buying `level` on a track for an item with `base_price`.
pub fn upgrade_cost(base_price: u32, level: u8) -> u64 {
    round_to_ten(f64::from(base_price) * f64::from(level).powf(COST_EXPONENT))
}

/// Cooldown in seconds imposed after buying `level`.
pub fn upgrade_cooldown_secs(level: u8) -> u64 {
    COOLDOWN_BASE_SECS.saturating_add(round_to_ten(f64::from(level).powf(COOLDOWN_EXPONENT)))
}

/// A priced, not yet committed, modifier upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeQuote {
    /// Track being upgraded.
    pub track: ModifierTrack,
    /// Level after the upgrade.
    pub next_level: u8,
    /// Gold to charge.
    pub cost: u64,
    /// Cooldown to start once committed.
    pub cooldown_secs: u64,
    /// Levels to persist once committed.
    pub levels: ModifierLevels,
}

/// Price the next level of `track` for a growable item.
///
/// `cooldown_remaining` is the remaining upgrade cooldown, if any.
pub fn quote_upgrade(
    item: &ItemDefinition,
    current: ModifierLevels,
    track: ModifierTrack,
    cooldown_remaining: Option<u64>,
) -> Result<UpgradeQuote, GameError> {
    if item.growable().is_none() {
        return Err(GameError::WrongItem {
            item: item.id,
            reason: "only seeds, trees, and animals can be upgraded",
        });
    }

    let level = current.level(track);
    if level >= MAX_MODIFIER_LEVEL {
        return Err(GameError::AlreadyAtLimit(Limit::Modifier(track)));
    }
    if let Some(remaining_secs) = cooldown_remaining.filter(|secs| *secs > 0) {
        return Err(GameError::OnCooldown { remaining_secs });
    }

    let next_level = level.saturating_add(1);
    let base_price = item.purchase.map_or(0, |p| p.gold_price);
    Ok(UpgradeQuote {
        track,
        next_level,
        cost: upgrade_cost(base_price, next_level),
        cooldown_secs: upgrade_cooldown_secs(next_level),
        levels: current.with_level(track, next_level),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmhand_catalog::{GrowableInfo, ItemKind, PurchaseInfo};
    use farmhand_types::ItemId;

    use super::*;

    fn seed() -> ItemDefinition {
        ItemDefinition {
            id: ItemId(1),
            name: "Lettuce Seeds".to_owned(),
            level: 1,
            kind: ItemKind::Seed(GrowableInfo {
                grow_time: 600,
                collect_window: 900,
                amount: 2,
                iterations: 1,
                expands_to: ItemId(101),
            }),
            xp: 20,
            purchase: Some(PurchaseInfo { gold_price: 10 }),
            market: None,
        }
    }

    #[test]
    fn zero_levels_are_identity() {
        assert_eq!(effective_grow_time(600, 0), 600);
        assert_eq!(effective_collect_window(900, 0), 900);
        assert_eq!(effective_yield(2, 0), 2);
    }

    #[test]
    fn effects_floor_on_base() {
        assert_eq!(effective_grow_time(600, 3), 510);
        assert_eq!(effective_grow_time(7, 1), 7);
        assert_eq!(effective_collect_window(900, 10), 1_800);
        assert_eq!(effective_yield(2, 4), 2);
        assert_eq!(effective_yield(2, 5), 3);
        assert_eq!(effective_grow_time(600, 10), 300);
    }

    #[test]
    fn cost_and_cooldown_grow_super_linearly() {
        assert_eq!(upgrade_cost(10, 1), 10);
        assert_eq!(upgrade_cooldown_secs(1), 60);
        let mut previous = 0;
        for level in 1..=MAX_MODIFIER_LEVEL {
            let cost = upgrade_cost(300, level);
            assert!(cost > previous);
            previous = cost;
        }
        assert!(upgrade_cooldown_secs(10) > 80_000);
    }

    #[test]
    fn quote_checks_limits_and_cooldown() {
        let item = seed();
        let quote =
            quote_upgrade(&item, ModifierLevels::ZERO, ModifierTrack::Volume, None).unwrap();
        assert_eq!(quote.next_level, 1);
        assert_eq!(quote.levels.volume, 1);

        let maxed = ModifierLevels::ZERO.with_level(ModifierTrack::GrowTime, MAX_MODIFIER_LEVEL);
        assert_eq!(
            quote_upgrade(&item, maxed, ModifierTrack::GrowTime, None),
            Err(GameError::AlreadyAtLimit(Limit::Modifier(ModifierTrack::GrowTime)))
        );
        assert_eq!(
            quote_upgrade(&item, ModifierLevels::ZERO, ModifierTrack::GrowTime, Some(42)),
            Err(GameError::OnCooldown { remaining_secs: 42 })
        );
    }
}
