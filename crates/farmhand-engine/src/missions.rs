//! Procedural mission offers and reward chests.
//!
//! A mission asks for one to four item lines drawn with weights that favour
//! cheap items. Its reward is the sum of `max_price * qty * factor` over the
//! lines with `factor` in 0.70..=1.15, split into a small experience slice
//! (1/17 to 1/16) and gold for the rest.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use farmhand_catalog::{Catalog, ItemDefinition};
use farmhand_types::{
    InventoryLine, ItemCategory, ItemId, MissionId, MissionLine, MissionOffer, PlayerId,
};

use crate::checks;
use crate::error::{GameError, Missing, Resource};

/// Open missions a player holds at most.
pub const MAX_OPEN_MISSIONS: usize = 3;

/// One mission in this many carries a bonus chest.
pub const MISSION_CHEST_ONE_IN: u32 = 8;

/// One mission in this many asks for crafted goods (from level 3).
pub const CRAFTED_LINES_ONE_IN: u32 = 3;

/// Level from which crafted lines may appear.
const CRAFTED_LINES_FROM_LEVEL: u32 = 3;

/// Numerator of the draw weight; cheap items get large weights.
const WEIGHT_SCALE: u32 = 10_000;

/// Tunables for mission generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionTuning {
    /// Percentage applied to product quantities.
    pub multiplier_pct: u32,
    /// Added to every draw weight; higher values flatten the draw towards
    /// expensive items.
    pub luck: u32,
}

impl Default for MissionTuning {
    fn default() -> Self {
        Self {
            multiplier_pct: 100,
            luck: 0,
        }
    }
}

fn draw_weight(item: &ItemDefinition, luck: u32) -> u32 {
    (WEIGHT_SCALE / item.max_price().max(1)).saturating_add(luck).max(1)
}

/// Draw up to `count` distinct items, weighted towards cheap ones.
fn draw_distinct<'a>(
    pool: &[&'a ItemDefinition],
    count: usize,
    luck: u32,
    rng: &mut impl Rng,
) -> Vec<&'a ItemDefinition> {
    let mut remaining = pool.to_vec();
    let mut picked = Vec::with_capacity(count);
    while picked.len() < count && !remaining.is_empty() {
        let weights: Vec<u32> = remaining.iter().map(|i| draw_weight(i, luck)).collect();
        let Ok(dist) = WeightedIndex::new(&weights) else {
            break;
        };
        let index = dist.sample(rng);
        if index >= remaining.len() {
            break;
        }
        picked.push(remaining.swap_remove(index));
    }
    picked
}

/// Draw a reward chest by rarity weight.
pub fn draw_chest(catalog: &Catalog, rng: &mut impl Rng) -> Option<ItemId> {
    let chests: Vec<(ItemId, u32)> = catalog.chests().map(|(item, w)| (item.id, w)).collect();
    let dist = WeightedIndex::new(chests.iter().map(|(_, w)| *w)).ok()?;
    chests.get(dist.sample(rng)).map(|(id, _)| *id)
}

fn unlocked<'a>(catalog: &'a Catalog, level: u32, category: ItemCategory) -> Vec<&'a ItemDefinition> {
    catalog
        .market_items()
        .filter(|item| item.category() == category && item.level <= level)
        .collect()
}

/// Generate a fresh mission offer for a player at `level`.
pub fn generate(
    catalog: &Catalog,
    player_id: PlayerId,
    level: u32,
    tuning: MissionTuning,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<MissionOffer, GameError> {
    let products = unlocked(catalog, level, ItemCategory::Product);
    let crafted = unlocked(catalog, level, ItemCategory::Crafted);

    let total: usize = rng.random_range(1..=4);
    let crafted_count: usize = if level >= CRAFTED_LINES_FROM_LEVEL
        && !crafted.is_empty()
        && rng.random_range(0..CRAFTED_LINES_ONE_IN) == 0
    {
        rng.random_range(1..=2_usize).min(total)
    } else {
        0
    };

    let mut picks: Vec<(&ItemDefinition, u32)> = Vec::new();
    for item in draw_distinct(&crafted, crafted_count, tuning.luck, rng) {
        let upper = 1_u32.saturating_add(level / 5);
        picks.push((item, rng.random_range(1..=upper)));
    }
    let product_count = total.saturating_sub(picks.len());
    for item in draw_distinct(&products, product_count, tuning.luck, rng) {
        let upper = 4_u32.saturating_add(level / 2);
        let base = rng.random_range(2..=upper);
        let qty = base.saturating_mul(tuning.multiplier_pct) / 100;
        picks.push((item, qty.max(1)));
    }
    if picks.is_empty() {
        return Err(GameError::NotFound(Missing::Candidates));
    }
    picks.sort_by_key(|(item, _)| item.id);

    let mut reward: i64 = 0;
    for (item, qty) in &picks {
        let factor_pct: i64 = rng.random_range(70..=115);
        let line = i64::from(item.max_price())
            .saturating_mul(i64::from(*qty))
            .saturating_mul(factor_pct)
            / 100;
        reward = reward.saturating_add(line);
    }
    let divisor: i64 = rng.random_range(16..=17);
    let xp = (reward / divisor).max(1);
    let gold = reward.saturating_sub(xp).max(1);

    let chest = if rng.random_range(0..MISSION_CHEST_ONE_IN) == 0 {
        draw_chest(catalog, rng)
    } else {
        None
    };

    Ok(MissionOffer {
        id: MissionId::new(),
        player_id,
        lines: picks
            .into_iter()
            .map(|(item, amount)| MissionLine {
                item_id: item.id,
                amount,
            })
            .collect(),
        gold,
        xp,
        chest,
        created_at: now,
    })
}

/// Check that `inventory` covers every mission line.
///
/// Returns the lines to consume. Every line is checked before any is
/// consumed.
pub fn requirements(
    offer: &MissionOffer,
    inventory: &BTreeMap<ItemId, u32>,
) -> Result<Vec<InventoryLine>, GameError> {
    offer
        .lines
        .iter()
        .map(|line| {
            let held = inventory.get(&line.item_id).copied().unwrap_or(0);
            checks::ensure(
                Resource::Item(line.item_id),
                u64::from(line.amount),
                u64::from(held),
            )?;
            Ok(InventoryLine {
                item_id: line.item_id,
                amount: line.amount,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap()
    }

    #[test]
    fn offers_are_well_formed() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(42);
        for level in [1, 3, 6, 12] {
            for _ in 0..50 {
                let offer = generate(
                    &catalog,
                    PlayerId(1),
                    level,
                    MissionTuning::default(),
                    Utc::now(),
                    &mut rng,
                )
                .unwrap();
                assert!((1..=4).contains(&offer.lines.len()));
                assert!(offer.gold >= 1);
                assert!(offer.xp >= 1);
                for line in &offer.lines {
                    let item = catalog.find_by_id(line.item_id).unwrap();
                    assert!(item.level <= level);
                    assert!(line.amount >= 1);
                }
                let mut ids: Vec<ItemId> = offer.lines.iter().map(|l| l.item_id).collect();
                ids.dedup();
                assert_eq!(ids.len(), offer.lines.len());
            }
        }
    }

    #[test]
    fn low_levels_never_get_crafted_lines() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let offer = generate(
                &catalog,
                PlayerId(1),
                2,
                MissionTuning::default(),
                Utc::now(),
                &mut rng,
            )
            .unwrap();
            for line in &offer.lines {
                let item = catalog.find_by_id(line.item_id).unwrap();
                assert_ne!(item.category(), ItemCategory::Crafted);
            }
        }
    }

    #[test]
    fn chest_draw_returns_a_chest() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let id = draw_chest(&catalog, &mut rng).unwrap();
            assert_eq!(catalog.find_by_id(id).unwrap().category(), ItemCategory::Chest);
        }
    }

    #[test]
    fn requirements_check_every_line() {
        let offer = MissionOffer {
            id: MissionId::new(),
            player_id: PlayerId(1),
            lines: vec![
                MissionLine {
                    item_id: ItemId(101),
                    amount: 3,
                },
                MissionLine {
                    item_id: ItemId(103),
                    amount: 2,
                },
            ],
            gold: 10,
            xp: 1,
            chest: None,
            created_at: Utc::now(),
        };
        let enough = BTreeMap::from([(ItemId(101), 3), (ItemId(103), 5)]);
        assert_eq!(requirements(&offer, &enough).unwrap().len(), 2);
        let short = BTreeMap::from([(ItemId(101), 3)]);
        assert!(matches!(
            requirements(&offer, &short),
            Err(GameError::InsufficientResource {
                resource: Resource::Item(ItemId(103)),
                ..
            })
        ));
    }
}
