//! Steal resolution against another player's collectable fields.
//!
//! Every unrobbed field of every collectable target entry goes into a pool.
//! Units are drawn from the pool at random without replacement until the
//! pool is empty or a guard dog catches the thief. A catch ends the attempt
//! immediately; units won before it are kept.
//!
//! Each won unit skims `floor(field_yield * 0.2)` (at least 1, never more
//! than the field holds) of the entry's product. The basis is the cycle's
//! per-field yield before any theft, so every thief of one cycle skims the
//! same amount per field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;

use farmhand_catalog::Catalog;
use farmhand_types::{
    FarmEntry, FarmState, ItemId, Notification, NotificationKind, PlayerAccount, PlayerId,
};

use crate::boosts::Guard;
use crate::error::{GameError, TheftBlock};
use crate::schedule::{self, farm_state, ledger_growable};

/// Percentage of a field's yield skimmed per won unit.
pub const SKIM_PCT: u32 = 20;

/// Outcome of one steal attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StealOutcome {
    /// Target entries after skimming; only entries that lost units.
    pub updates: Vec<FarmEntry>,
    /// Products credited to the thief, by product id.
    pub loot: BTreeMap<ItemId, u32>,
    /// Units won.
    pub won: u32,
    /// Whether a guard dog ended the attempt.
    pub caught: bool,
}

/// Units skimmed per won field of an entry.
pub fn skim_per_field(entry: &FarmEntry) -> u32 {
    let per_field = entry.field_yield;
    let skim = u32::try_from(u64::from(per_field).saturating_mul(u64::from(SKIM_PCT)) / 100)
        .unwrap_or(u32::MAX);
    skim.max(1).min(per_field)
}

/// Whether an entry can be stolen from at `now`.
pub fn is_eligible(entry: &FarmEntry, now: DateTime<Utc>) -> bool {
    farm_state(entry, now) == FarmState::Collectable && entry.robbed_fields < entry.fields_used
}

/// Resolve a steal attempt against the target's farm entries.
///
/// `entries` must be the target's rows as read inside the transaction that
/// will persist the outcome, so a competing thief sees the updated
/// `robbed_fields`.
pub fn resolve(
    entries: &[FarmEntry],
    catalog: &Catalog,
    guard: Guard,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<StealOutcome, GameError> {
    let catch_one_in = match guard {
        Guard::Blocked => return Err(GameError::TheftBlocked(TheftBlock::Fence)),
        Guard::CatchOneIn(n) => Some(n.max(1)),
        Guard::Unguarded => None,
    };

    let mut targets: Vec<FarmEntry> = entries
        .iter()
        .filter(|e| is_eligible(e, now))
        .cloned()
        .collect();
    schedule::sort_farm_entries(&mut targets);

    let mut pool: Vec<usize> = Vec::new();
    for (index, entry) in targets.iter().enumerate() {
        let free = entry.fields_used.saturating_sub(entry.robbed_fields);
        pool.extend(std::iter::repeat_n(index, usize::try_from(free).unwrap_or(0)));
    }
    if pool.is_empty() {
        return Err(GameError::TheftBlocked(TheftBlock::NothingEligible));
    }

    let mut wins: BTreeMap<usize, u32> = BTreeMap::new();
    let mut outcome = StealOutcome::default();
    while !pool.is_empty() {
        if catch_one_in.is_some_and(|n| rng.random_range(0..n) == 0) {
            outcome.caught = true;
            break;
        }
        let slot = rng.random_range(0..pool.len());
        let index = pool.swap_remove(slot);
        let won = wins.entry(index).or_insert(0);
        *won = won.saturating_add(1);
        outcome.won = outcome.won.saturating_add(1);
    }

    for (index, won) in wins {
        let Some(entry) = targets.get(index) else {
            continue;
        };
        let product = ledger_growable(catalog, entry.item_id)?.expands_to;
        let skimmed = skim_per_field(entry).saturating_mul(won);

        let credited = outcome.loot.entry(product).or_insert(0);
        *credited = credited.saturating_add(skimmed);
        outcome.updates.push(FarmEntry {
            amount: entry.amount.saturating_sub(skimmed),
            robbed_fields: entry.robbed_fields.saturating_add(won).min(entry.fields_used),
            ..entry.clone()
        });
    }

    Ok(outcome)
}

/// Notices telling the target what was taken, if they opted in.
pub fn robbery_notices(
    target: &PlayerAccount,
    thief: PlayerId,
    outcome: &StealOutcome,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    if !target.notifications {
        return Vec::new();
    }
    outcome
        .loot
        .iter()
        .map(|(item_id, amount)| Notification {
            player_id: target.player_id,
            channel_id: target.channel_id,
            item_id: *item_id,
            amount: *amount,
            fire_at: now,
            kind: NotificationKind::Robbed { by: thief },
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use farmhand_types::{EntryId, ModifierLevels};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::schedule::{PlantContext, add_secs, plan_planting};

    fn catalog() -> Catalog {
        Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn plant(catalog: &Catalog, item: i32, fields: u32) -> FarmEntry {
        let ctx = PlantContext {
            player_id: PlayerId(2),
            player_level: 20,
            levels: ModifierLevels::ZERO,
            used_fields: 0,
            capacity: 50,
            cat_active: false,
            now: t0(),
        };
        plan_planting(catalog.find_by_id(ItemId(item)).unwrap(), fields, &ctx)
            .unwrap()
            .entry
    }

    #[test]
    fn unguarded_takes_whole_pool() {
        let catalog = catalog();
        // Wheat: 4 per field, 5 fields.
        let wheat = plant(&catalog, 3, 5);
        let now = add_secs(wheat.ends, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = resolve(&[wheat.clone()], &catalog, Guard::Unguarded, now, &mut rng).unwrap();

        assert!(!outcome.caught);
        assert_eq!(outcome.won, 5);
        // floor(4 * 0.2) = 0, floored at 1 per field.
        assert_eq!(outcome.loot, BTreeMap::from([(ItemId(103), 5)]));
        let updated = &outcome.updates[0];
        assert_eq!(updated.id, wheat.id);
        assert_eq!(updated.robbed_fields, 5);
        assert_eq!(updated.amount, 15);
    }

    #[test]
    fn guard_freezes_wins_at_catch() {
        let catalog = catalog();
        let wheat = plant(&catalog, 3, 5);
        let now = add_secs(wheat.ends, 1);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome =
                resolve(&[wheat.clone()], &catalog, Guard::CatchOneIn(3), now, &mut rng).unwrap();
            assert!(outcome.won <= 5);
            if !outcome.caught {
                assert_eq!(outcome.won, 5);
            }
            for entry in &outcome.updates {
                assert!(entry.robbed_fields <= entry.fields_used);
                assert_eq!(entry.robbed_fields, outcome.won);
            }
        }
    }

    #[test]
    fn second_thief_sees_robbed_fields() {
        let catalog = catalog();
        let mut cow = plant(&catalog, 31, 2);
        let now = add_secs(cow.ends, 1);
        cow.robbed_fields = 1;
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = resolve(&[cow.clone()], &catalog, Guard::Unguarded, now, &mut rng).unwrap();
        assert_eq!(outcome.won, 1);
        assert_eq!(outcome.updates[0].robbed_fields, 2);

        let after = outcome.updates[0].clone();
        assert_eq!(
            resolve(&[after], &catalog, Guard::Unguarded, now, &mut rng),
            Err(GameError::TheftBlocked(TheftBlock::NothingEligible))
        );
    }

    #[test]
    fn replantables_are_skimmed_as_product() {
        let catalog = catalog();
        // Cherry tree: 6 per field, skim floor(1.2) = 1 cherry per field.
        let cherry = plant(&catalog, 21, 3);
        let now = add_secs(cherry.ends, 1);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = resolve(&[cherry], &catalog, Guard::Unguarded, now, &mut rng).unwrap();
        assert_eq!(outcome.loot, BTreeMap::from([(ItemId(121), 3)]));
    }

    #[test]
    fn fence_and_growing_entries_block() {
        let catalog = catalog();
        let wheat = plant(&catalog, 3, 2);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            resolve(&[wheat.clone()], &catalog, Guard::Blocked, wheat.ends, &mut rng),
            Err(GameError::TheftBlocked(TheftBlock::Fence))
        );
        assert_eq!(
            resolve(&[wheat], &catalog, Guard::Unguarded, t0(), &mut rng),
            Err(GameError::TheftBlocked(TheftBlock::NothingEligible))
        );
    }

    #[test]
    fn skim_never_exceeds_field() {
        let entry = FarmEntry {
            id: EntryId::new(),
            player_id: PlayerId(2),
            item_id: ItemId(1),
            amount: 0,
            field_yield: 0,
            fields_used: 1,
            iterations: 1,
            starts: t0(),
            ends: t0(),
            dies: add_secs(t0(), 10),
            robbed_fields: 0,
            cat_boost: false,
        };
        assert_eq!(skim_per_field(&entry), 0);
        let big = FarmEntry {
            amount: 50,
            field_yield: 25,
            fields_used: 2,
            ..entry
        };
        assert_eq!(skim_per_field(&big), 5);
    }

    #[test]
    fn later_thieves_skim_the_same_per_field() {
        let catalog = catalog();
        // Apple tree on three fields with a boosted yield of twenty each.
        let tree = FarmEntry {
            amount: 60,
            field_yield: 20,
            ..plant(&catalog, 20, 3)
        };
        let now = add_secs(tree.ends, 1);

        // Whoever gets there first takes one field.
        let first = FarmEntry {
            amount: 56,
            robbed_fields: 1,
            ..tree.clone()
        };
        assert_eq!(skim_per_field(&tree), 4);
        assert_eq!(skim_per_field(&first), 4);

        let mut rng = StdRng::seed_from_u64(8);
        let outcome = resolve(&[first], &catalog, Guard::Unguarded, now, &mut rng).unwrap();
        assert_eq!(outcome.won, 2);
        assert_eq!(outcome.updates[0].amount, 48);
        assert_eq!(outcome.loot.values().sum::<u32>(), 8);
    }
}
