//! Cycle engine: retire or advance entries on harvest and collect.
//!
//! A harvest processes every ready entry of one player in a single pass
//! and returns a set-oriented plan (batched updates plus batched deletes)
//! that the caller applies inside one transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use farmhand_catalog::{Catalog, GrowableInfo};
use farmhand_types::{
    EntryId, FactoryEntry, FactoryState, FarmEntry, FarmState, ItemId, ModifierLevels,
};

use crate::error::{GameError, Missing};
use crate::schedule::{self, factory_state, farm_state, ledger_growable, ledger_item};

/// What happens to a farm entry after it is harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The entry starts its next cycle in place.
    Advance(FarmEntry),
    /// The entry has no cycles left and is deleted.
    Retire(EntryId),
}

/// Advance a harvested entry to its next cycle, or retire it.
///
/// `levels` are the player's current modifier levels for the entry's item.
pub fn advance(
    entry: &FarmEntry,
    info: &GrowableInfo,
    levels: ModifierLevels,
    now: DateTime<Utc>,
) -> CycleOutcome {
    if entry.iterations <= 1 {
        return CycleOutcome::Retire(entry.id);
    }

    let (ends, dies) = schedule::cycle_window(info, levels, now);
    CycleOutcome::Advance(FarmEntry {
        amount: schedule::cycle_amount(info, levels, entry.fields_used),
        field_yield: schedule::field_yield(info, levels),
        iterations: entry.iterations.saturating_sub(1),
        starts: now,
        ends,
        dies,
        robbed_fields: 0,
        ..entry.clone()
    })
}

/// Result of harvesting a player's farm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestPlan {
    /// Entries advanced to their next cycle.
    pub updates: Vec<FarmEntry>,
    /// Entries to delete.
    pub deletes: Vec<EntryId>,
    /// Products credited, by product id.
    pub yields: BTreeMap<ItemId, u32>,
    /// Experience earned.
    pub xp: u64,
    /// Entries that rotted and yielded nothing.
    pub rotten: u32,
}

impl HarvestPlan {
    /// Whether the harvest touched no entry at all.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Plan the harvest of every ready or rotten entry.
///
/// Entries are processed in item-id order. Rotten entries without the cat
/// boost or active guard forfeit only the current cycle's output and still
/// advance or retire.
pub fn plan_harvest(
    entries: &[FarmEntry],
    catalog: &Catalog,
    levels: &BTreeMap<ItemId, ModifierLevels>,
    now: DateTime<Utc>,
    guard_active: bool,
) -> Result<HarvestPlan, GameError> {
    let mut ordered = entries.to_vec();
    schedule::sort_farm_entries(&mut ordered);

    let mut plan = HarvestPlan::default();
    for entry in &ordered {
        let state = farm_state(entry, now);
        if state == FarmState::Growing {
            continue;
        }

        let item = ledger_item(catalog, entry.item_id)?;
        let info = ledger_growable(catalog, entry.item_id)?;
        if schedule::is_harvestable(entry, now, guard_active) {
            let credited = plan.yields.entry(info.expands_to).or_insert(0);
            *credited = credited.saturating_add(entry.amount);
            plan.xp = plan
                .xp
                .saturating_add(u64::from(item.xp).saturating_mul(u64::from(entry.amount)));
        } else {
            plan.rotten = plan.rotten.saturating_add(1);
        }

        let item_levels = levels.get(&entry.item_id).copied().unwrap_or_default();
        match advance(entry, info, item_levels, now) {
            CycleOutcome::Advance(next) => plan.updates.push(next),
            CycleOutcome::Retire(id) => plan.deletes.push(id),
        }
    }

    if plan.is_empty() {
        return Err(GameError::NotFound(Missing::ReadyEntries));
    }
    Ok(plan)
}

/// Entries to delete when clearing rotten fields.
///
/// Rotten entries still protected by the cat boost or guard are kept.
pub fn rotten_entries(entries: &[FarmEntry], now: DateTime<Utc>, guard_active: bool) -> Vec<EntryId> {
    entries
        .iter()
        .filter(|e| farm_state(e, now) == FarmState::Rotten)
        .filter(|e| !schedule::is_harvestable(e, now, guard_active))
        .map(|e| e.id)
        .collect()
}

/// Result of collecting finished factory goods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectPlan {
    /// Finished entries to delete.
    pub deletes: Vec<EntryId>,
    /// Goods credited, by item id.
    pub yields: BTreeMap<ItemId, u32>,
    /// Experience earned.
    pub xp: u64,
}

/// Plan collecting every ready factory entry. Factory goods never rot.
pub fn plan_collect(
    entries: &[FactoryEntry],
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<CollectPlan, GameError> {
    let mut ready: Vec<&FactoryEntry> = entries
        .iter()
        .filter(|e| factory_state(e, now) == FactoryState::Ready)
        .collect();
    ready.sort_by(|a, b| a.item_id.cmp(&b.item_id).then(a.ends.cmp(&b.ends)));

    let mut plan = CollectPlan::default();
    for entry in ready {
        let item = ledger_item(catalog, entry.item_id)?;
        let credited = plan.yields.entry(entry.item_id).or_insert(0);
        *credited = credited.saturating_add(1);
        plan.xp = plan.xp.saturating_add(u64::from(item.xp));
        plan.deletes.push(entry.id);
    }

    if plan.deletes.is_empty() {
        return Err(GameError::NotFound(Missing::ReadyEntries));
    }
    Ok(plan)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::arithmetic_side_effects
)]
mod tests {
    use farmhand_types::{ModifierTrack, PlayerId};

    use super::*;
    use crate::schedule::{PlantContext, add_secs, plan_planting};

    const DATA: &str = include_str!("../../../data/catalog.json");

    fn catalog() -> Catalog {
        Catalog::from_json(DATA).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn plant(catalog: &Catalog, item: i32, fields: u32) -> FarmEntry {
        let ctx = PlantContext {
            player_id: PlayerId(1),
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
    fn tree_advances_in_place() {
        let catalog = catalog();
        let mut tree = plant(&catalog, 20, 2);
        tree.robbed_fields = 1;
        let info = *catalog.find_by_id(ItemId(20)).unwrap().growable().unwrap();
        let now = add_secs(tree.ends, 10);

        let CycleOutcome::Advance(next) = advance(&tree, &info, ModifierLevels::ZERO, now) else {
            panic!("tree with three iterations must advance");
        };
        assert_eq!(next.id, tree.id);
        assert_eq!(next.iterations, 2);
        assert!(next.ends > tree.ends);
        assert!(next.dies > tree.dies);
        assert_eq!(next.robbed_fields, 0);
        assert_eq!(next.starts, now);
    }

    #[test]
    fn iterations_decrease_by_one_until_retired() {
        let catalog = catalog();
        let info = *catalog.find_by_id(ItemId(21)).unwrap().growable().unwrap();
        let mut entry = plant(&catalog, 21, 1);
        let mut now = t0();
        let mut seen = vec![entry.iterations];
        loop {
            now = add_secs(entry.ends, 1);
            match advance(&entry, &info, ModifierLevels::ZERO, now) {
                CycleOutcome::Advance(next) => {
                    assert_eq!(next.iterations, entry.iterations - 1);
                    seen.push(next.iterations);
                    entry = next;
                }
                CycleOutcome::Retire(id) => {
                    assert_eq!(id, entry.id);
                    break;
                }
            }
        }
        assert_eq!(seen, vec![4, 3, 2, 1]);
        assert!(now > t0());
    }

    #[test]
    fn advance_uses_current_modifiers() {
        let catalog = catalog();
        let info = *catalog.find_by_id(ItemId(30)).unwrap().growable().unwrap();
        let entry = plant(&catalog, 30, 3);
        let levels = ModifierLevels::ZERO.with_level(ModifierTrack::Volume, 5);
        let CycleOutcome::Advance(next) = advance(&entry, &info, levels, entry.ends) else {
            panic!("chicken must advance");
        };
        assert_eq!(next.amount, 9);
    }

    #[test]
    fn harvest_mixes_ready_rotten_and_growing() {
        let catalog = catalog();
        let lettuce = plant(&catalog, 1, 2);
        let apple = plant(&catalog, 20, 1);
        let mut wheat = plant(&catalog, 3, 1);
        wheat.ends = add_secs(t0(), 100_000);
        wheat.dies = add_secs(t0(), 200_000);

        // Lettuce is rotten at t0+8000, the apple tree is collectable.
        let now = add_secs(t0(), 8_000);
        let plan = plan_harvest(
            &[wheat.clone(), apple.clone(), lettuce.clone()],
            &catalog,
            &BTreeMap::new(),
            now,
            false,
        )
        .unwrap();

        assert_eq!(plan.rotten, 1);
        assert_eq!(plan.deletes, vec![lettuce.id]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, apple.id);
        assert_eq!(plan.yields, BTreeMap::from([(ItemId(120), 4)]));
        let apple_xp = catalog.find_by_id(ItemId(20)).unwrap().xp;
        assert_eq!(plan.xp, u64::from(apple_xp) * 4);
    }

    #[test]
    fn guard_rescues_rotten_output() {
        let catalog = catalog();
        let lettuce = plant(&catalog, 1, 2);
        let now = add_secs(t0(), 8_000);
        let plan = plan_harvest(&[lettuce], &catalog, &BTreeMap::new(), now, true).unwrap();
        assert_eq!(plan.rotten, 0);
        assert_eq!(plan.yields, BTreeMap::from([(ItemId(101), 4)]));
    }

    #[test]
    fn nothing_ready_is_not_found() {
        let catalog = catalog();
        let lettuce = plant(&catalog, 1, 2);
        assert_eq!(
            plan_harvest(&[lettuce], &catalog, &BTreeMap::new(), t0(), false),
            Err(GameError::NotFound(Missing::ReadyEntries))
        );
    }

    #[test]
    fn unknown_ledger_item_is_desync() {
        let catalog = catalog();
        let mut entry = plant(&catalog, 1, 1);
        entry.item_id = ItemId(777);
        let now = add_secs(t0(), 700);
        let err = plan_harvest(&[entry], &catalog, &BTreeMap::new(), now, false).unwrap_err();
        assert_eq!(err, GameError::CatalogDesync(ItemId(777)));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn clear_rotten_keeps_protected_entries() {
        let catalog = catalog();
        let plain = plant(&catalog, 1, 1);
        let mut cat = plant(&catalog, 1, 1);
        cat.cat_boost = true;
        let now = add_secs(t0(), 8_000);
        assert_eq!(rotten_entries(&[plain.clone(), cat], now, false), vec![plain.id]);
        assert!(rotten_entries(&[plain], now, true).is_empty());
    }

    #[test]
    fn collect_takes_only_ready_goods() {
        let catalog = catalog();
        let make = |starts: u64, ends: u64| FactoryEntry {
            id: EntryId::new(),
            player_id: PlayerId(1),
            item_id: ItemId(202),
            starts: add_secs(t0(), starts),
            ends: add_secs(t0(), ends),
        };
        let done = make(0, 100);
        let busy = make(100, 200);
        let plan = plan_collect(&[busy, done.clone()], &catalog, add_secs(t0(), 150)).unwrap();
        assert_eq!(plan.deletes, vec![done.id]);
        assert_eq!(plan.yields, BTreeMap::from([(ItemId(202), 1)]));
    }
}
