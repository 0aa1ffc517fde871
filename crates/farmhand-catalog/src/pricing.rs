//! Price-band and experience formulas.
//!
//! All formulas work in integer arithmetic on seconds so that results are
//! exact floors of the real-valued definitions:
//!
//! ```text
//! growable min = floor(cost * 0.75 / amount)
//! growable max = floor(cost / amount + hours * rate / amount)
//! crafted  min = floor(value * 0.90)
//! crafted  max = floor(value * 1.05 + hours * rate)
//! ```
//!
//! `value` is the summed max price of a recipe's ingredients. Every bound is
//! floored at 1 and `max >= min` always holds.

use crate::item::PriceBand;

/// Experience granted per hour of growth or production.
pub const XP_PER_HOUR: u64 = 240;

/// Upper bounds (seconds, inclusive) of the very-short, short, medium, and
/// long duration buckets. Anything longer is very-long.
const BUCKET_LIMITS: [u32; 4] = [600, 3_600, 21_600, 43_200];

/// Gold per hour for single-harvest seeds, by duration bucket.
const SEED_RATES: [u64; 5] = [150, 100, 70, 55, 45];

/// Gold per hour for replantable trees and animals, by duration bucket.
const REPLANTABLE_RATES: [u64; 5] = [400, 260, 180, 140, 110];

/// Gold per hour of factory time, by duration bucket.
const CRAFT_RATES: [u64; 5] = [120, 90, 60, 45, 35];

const SECS_PER_HOUR: u64 = 3_600;

/// Index of the duration bucket for `secs`.
pub fn duration_bucket(secs: u32) -> usize {
    BUCKET_LIMITS
        .iter()
        .position(|&limit| secs <= limit)
        .unwrap_or(BUCKET_LIMITS.len())
}

fn rate(table: &[u64; 5], secs: u32) -> u64 {
    table.get(duration_bucket(secs)).copied().unwrap_or(0)
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Price band of the product yielded by a growable.
///
/// `cost` is the purchase price per field and `amount` the units yielded
/// per field per cycle.
pub fn growable_band(cost: u32, amount: u32, grow_time: u32, replantable: bool) -> PriceBand {
    let amount = u64::from(amount.max(1));
    let cost = u64::from(cost);
    let table = if replantable {
        &REPLANTABLE_RATES
    } else {
        &SEED_RATES
    };

    let min = cost
        .saturating_mul(3)
        .checked_div(amount.saturating_mul(4))
        .unwrap_or(0)
        .max(1);
    let numerator = cost
        .saturating_mul(SECS_PER_HOUR)
        .saturating_add(u64::from(grow_time).saturating_mul(rate(table, grow_time)));
    let max = numerator
        .checked_div(SECS_PER_HOUR.saturating_mul(amount))
        .unwrap_or(0)
        .max(min);

    PriceBand {
        min: clamp_u32(min),
        max: clamp_u32(max),
    }
}

/// Price band of a crafted item whose ingredients are worth
/// `ingredient_value` at max price.
pub fn crafted_band(ingredient_value: u64, craft_time: u32) -> PriceBand {
    let min = ingredient_value
        .saturating_mul(9)
        .checked_div(10)
        .unwrap_or(0)
        .max(1);
    let numerator = ingredient_value
        .saturating_mul(105 * 36)
        .saturating_add(u64::from(craft_time).saturating_mul(rate(&CRAFT_RATES, craft_time)));
    let max = numerator
        .checked_div(SECS_PER_HOUR)
        .unwrap_or(0)
        .max(min);

    PriceBand {
        min: clamp_u32(min),
        max: clamp_u32(max),
    }
}

/// Experience per harvested unit of a growable.
pub fn growable_xp(grow_time: u32, amount: u32) -> u32 {
    let per_unit = u64::from(grow_time)
        .saturating_mul(XP_PER_HOUR)
        .checked_div(SECS_PER_HOUR.saturating_mul(u64::from(amount.max(1))))
        .unwrap_or(0);
    clamp_u32(per_unit.max(1))
}

/// Experience per crafted unit.
pub fn crafted_xp(craft_time: u32) -> u32 {
    let xp = u64::from(craft_time)
        .saturating_mul(XP_PER_HOUR)
        .checked_div(SECS_PER_HOUR)
        .unwrap_or(0);
    clamp_u32(xp.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets() {
        assert_eq!(duration_bucket(1), 0);
        assert_eq!(duration_bucket(600), 0);
        assert_eq!(duration_bucket(601), 1);
        assert_eq!(duration_bucket(3_600), 1);
        assert_eq!(duration_bucket(21_600), 2);
        assert_eq!(duration_bucket(43_200), 3);
        assert_eq!(duration_bucket(43_201), 4);
    }

    #[test]
    fn lettuce_band() {
        // min = floor(10 * 0.75 / 2) = 3
        // max = floor(10/2 + (600/3600 * 150) / 2) = floor(5 + 12.5) = 17
        let band = growable_band(10, 2, 600, false);
        assert_eq!(band, PriceBand { min: 3, max: 17 });
    }

    #[test]
    fn replantables_earn_more_per_hour() {
        let seed = growable_band(300, 4, 7_200, false);
        let tree = growable_band(300, 4, 7_200, true);
        assert_eq!(seed.min, tree.min);
        assert!(tree.max > seed.max);
    }

    #[test]
    fn bands_never_drop_below_one() {
        let band = growable_band(0, 50, 1, false);
        assert_eq!(band.min, 1);
        assert!(band.max >= 1);
        let crafted = crafted_band(0, 1);
        assert_eq!(crafted.min, 1);
        assert!(crafted.max >= crafted.min);
    }

    #[test]
    fn crafted_band_from_value() {
        // value 100, one hour: min 90, max = 105 + 90 = 195
        let band = crafted_band(100, 3_600);
        assert_eq!(band, PriceBand { min: 90, max: 195 });
    }

    #[test]
    fn xp_formulas() {
        assert_eq!(growable_xp(600, 2), 20);
        assert_eq!(growable_xp(1, 100), 1);
        assert_eq!(crafted_xp(3_600), 240);
        assert_eq!(crafted_xp(0), 1);
    }
}
