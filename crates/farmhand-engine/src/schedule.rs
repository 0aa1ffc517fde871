//! Scheduled production: state derivation and planning of new entries.
//!
//! Entry states are never stored. They are derived from the entry's
//! timestamps and the caller's `now`:
//!
//! ```text
//! farm:    Growing  [starts, ends)  Collectable  [ends, dies)  Rotten
//! factory: Queued   [.., starts)    Producing    [starts, ends)  Ready
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use farmhand_catalog::{Catalog, GrowableInfo, ItemDefinition};
use farmhand_types::{
    EntryId, FactoryEntry, FactoryState, FarmEntry, FarmState, InventoryLine, ItemId,
    ModifierLevels, Notification, NotificationKind, PlayerAccount, PlayerId,
};

use crate::checks;
use crate::error::{GameError, Resource};
use crate::modifiers;

/// Highest factory worker level; each level cuts production time by 5%.
pub const MAX_FACTORY_WORKERS: u32 = 10;

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// `at + secs`, saturating at the latest representable instant.
pub fn add_secs(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whole seconds from `from` until `to`, zero if `to` has passed.
pub fn secs_until(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from(to.signed_duration_since(from).num_seconds()).unwrap_or(0)
}

/// Resolve the item a ledger row points at.
///
/// A miss here is a catalog/ledger desynchronisation, not a player error.
pub fn ledger_item(catalog: &Catalog, item_id: ItemId) -> Result<&ItemDefinition, GameError> {
    match catalog.find_by_id(item_id) {
        Ok(item) => Ok(item),
        Err(err) => {
            tracing::error!(%item_id, error = %err, "Ledger entry references unknown item");
            Err(GameError::CatalogDesync(item_id))
        }
    }
}

/// Growth parameters of a ledger row's item.
pub fn ledger_growable(catalog: &Catalog, item_id: ItemId) -> Result<&GrowableInfo, GameError> {
    let item = ledger_item(catalog, item_id)?;
    item.growable().ok_or_else(|| {
        tracing::error!(%item_id, "Farm entry references a non-growable item");
        GameError::CatalogDesync(item_id)
    })
}

// ---------------------------------------------------------------------------
// State derivation
// ---------------------------------------------------------------------------

/// Derived state of a farm entry at `now`.
pub fn farm_state(entry: &FarmEntry, now: DateTime<Utc>) -> FarmState {
    if now < entry.ends {
        FarmState::Growing
    } else if now < entry.dies {
        FarmState::Collectable
    } else {
        FarmState::Rotten
    }
}

/// Derived state of a factory entry at `now`.
pub fn factory_state(entry: &FactoryEntry, now: DateTime<Utc>) -> FactoryState {
    if now < entry.starts {
        FactoryState::Queued
    } else if now < entry.ends {
        FactoryState::Producing
    } else {
        FactoryState::Ready
    }
}

/// Whether a farm entry yields output if harvested at `now`.
///
/// Rotten entries still count when the entry carries the cat boost or the
/// global field guard is active.
pub fn is_harvestable(entry: &FarmEntry, now: DateTime<Utc>, guard_active: bool) -> bool {
    match farm_state(entry, now) {
        FarmState::Growing => false,
        FarmState::Collectable => true,
        FarmState::Rotten => entry.cat_boost || guard_active,
    }
}

/// Sort farm entries into stable display and processing order.
pub fn sort_farm_entries(entries: &mut [FarmEntry]) {
    entries.sort_by(|a, b| {
        a.item_id
            .cmp(&b.item_id)
            .then(a.starts.cmp(&b.starts))
            .then(a.id.cmp(&b.id))
    });
}

/// Fields currently occupied by `entries`.
pub fn used_fields(entries: &[FarmEntry]) -> u32 {
    entries
        .iter()
        .fold(0_u32, |acc, e| acc.saturating_add(e.fields_used))
}

// ---------------------------------------------------------------------------
// Planting
// ---------------------------------------------------------------------------

/// Growth window of one cycle starting at `now`.
pub fn cycle_window(
    info: &GrowableInfo,
    levels: ModifierLevels,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let grow = modifiers::effective_grow_time(info.grow_time, levels.grow_time);
    let window = modifiers::effective_collect_window(info.collect_window, levels.collect_window);
    let ends = add_secs(now, u64::from(grow));
    let dies = add_secs(ends, u64::from(window.max(1)));
    (ends, dies)
}

/// Yield of a single field for one cycle.
pub fn field_yield(info: &GrowableInfo, levels: ModifierLevels) -> u32 {
    modifiers::effective_yield(info.amount, levels.volume)
}

/// Total yield of `fields` fields for one cycle.
pub fn cycle_amount(info: &GrowableInfo, levels: ModifierLevels, fields: u32) -> u32 {
    field_yield(info, levels).saturating_mul(fields)
}

/// Player facts needed to plan a planting.
#[derive(Debug, Clone, Copy)]
pub struct PlantContext {
    /// Player planting.
    pub player_id: PlayerId,
    /// Player level.
    pub player_level: u32,
    /// Player's modifier levels for the planted item.
    pub levels: ModifierLevels,
    /// Fields already occupied.
    pub used_fields: u32,
    /// Effective farm capacity including boosts.
    pub capacity: u32,
    /// Whether a cat boost is active.
    pub cat_active: bool,
    /// Current time.
    pub now: DateTime<Utc>,
}

/// A new farm entry plus its price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantQuote {
    /// Entry to insert.
    pub entry: FarmEntry,
    /// Gold to debit.
    pub cost: i64,
}

/// Plan planting `fields` fields of a growable item.
pub fn plan_planting(
    item: &ItemDefinition,
    fields: u32,
    ctx: &PlantContext,
) -> Result<PlantQuote, GameError> {
    let info = item.growable().ok_or(GameError::WrongItem {
        item: item.id,
        reason: "only seeds, trees, and animals can be planted",
    })?;
    checks::ensure_level(item.level, ctx.player_level)?;

    let free = ctx.capacity.saturating_sub(ctx.used_fields);
    checks::ensure(Resource::FarmFields, u64::from(fields), u64::from(free))?;

    let price = item.purchase.map_or(0, |p| p.gold_price);
    let cost = i64::from(price).saturating_mul(i64::from(fields));
    let (ends, dies) = cycle_window(info, ctx.levels, ctx.now);

    Ok(PlantQuote {
        entry: FarmEntry {
            id: EntryId::new(),
            player_id: ctx.player_id,
            item_id: item.id,
            amount: cycle_amount(info, ctx.levels, fields),
            field_yield: field_yield(info, ctx.levels),
            fields_used: fields,
            iterations: info.iterations,
            starts: ctx.now,
            ends,
            dies,
            robbed_fields: 0,
            cat_boost: ctx.cat_active,
        },
        cost,
    })
}

/// Reminder for when a freshly planted entry becomes collectable.
///
/// `None` when the player opted out of notifications.
pub fn harvest_reminder(entry: &FarmEntry, account: &PlayerAccount) -> Option<Notification> {
    account.notifications.then(|| Notification {
        player_id: entry.player_id,
        channel_id: account.channel_id,
        item_id: entry.item_id,
        amount: entry.amount,
        fire_at: entry.ends,
        kind: NotificationKind::HarvestReady,
    })
}

// ---------------------------------------------------------------------------
// Factory queue
// ---------------------------------------------------------------------------

/// Production time of one unit after the worker discount.
pub fn production_time(craft_time: u32, worker_level: u32) -> u32 {
    let level = u64::from(worker_level.min(MAX_FACTORY_WORKERS));
    let discount = u64::from(craft_time).saturating_mul(level).saturating_mul(5) / 100;
    u32::try_from(u64::from(craft_time).saturating_sub(discount)).unwrap_or(craft_time)
}

/// Player facts needed to plan a factory order.
#[derive(Debug, Clone, Copy)]
pub struct QueueContext {
    /// Player ordering.
    pub player_id: PlayerId,
    /// Player level.
    pub player_level: u32,
    /// Factory worker level.
    pub worker_level: u32,
    /// Effective factory slots including boosts.
    pub slots: u32,
    /// Current time.
    pub now: DateTime<Utc>,
}

/// New queue entries and the ingredients they consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionPlan {
    /// One entry per unit, chained back to back.
    pub entries: Vec<FactoryEntry>,
    /// Ingredients to remove from inventory.
    pub consumed: Vec<InventoryLine>,
}

/// Plan producing `amount` units of a crafted item.
///
/// Every ingredient line is checked before anything is consumed.
pub fn plan_production(
    item: &ItemDefinition,
    amount: u32,
    queue: &[FactoryEntry],
    inventory: &BTreeMap<ItemId, u32>,
    ctx: &QueueContext,
) -> Result<ProductionPlan, GameError> {
    let craft = item.craft().ok_or(GameError::WrongItem {
        item: item.id,
        reason: "only crafted goods can be produced",
    })?;
    checks::ensure_level(item.level, ctx.player_level)?;

    let occupied = u32::try_from(queue.len()).unwrap_or(u32::MAX);
    let free = ctx.slots.saturating_sub(occupied);
    checks::ensure(Resource::FactorySlots, u64::from(amount), u64::from(free))?;

    let mut consumed = Vec::with_capacity(craft.ingredients.len());
    for ingredient in &craft.ingredients {
        let required = ingredient.amount.saturating_mul(amount);
        let available = inventory.get(&ingredient.item_id).copied().unwrap_or(0);
        checks::ensure(
            Resource::Item(ingredient.item_id),
            u64::from(required),
            u64::from(available),
        )?;
        consumed.push(InventoryLine {
            item_id: ingredient.item_id,
            amount: required,
        });
    }

    let per_unit = u64::from(production_time(craft.craft_time, ctx.worker_level));
    let mut cursor = queue
        .iter()
        .map(|e| e.ends)
        .max()
        .map_or(ctx.now, |last| last.max(ctx.now));

    let mut entries = Vec::new();
    for _ in 0..amount {
        let ends = add_secs(cursor, per_unit);
        entries.push(FactoryEntry {
            id: EntryId::new(),
            player_id: ctx.player_id,
            item_id: item.id,
            starts: cursor,
            ends,
        });
        cursor = ends;
    }

    Ok(ProductionPlan { entries, consumed })
}

/// Reminder for when the last unit of a freshly queued order is done.
///
/// `None` when the player opted out or nothing was queued.
pub fn production_reminder(plan: &ProductionPlan, account: &PlayerAccount) -> Option<Notification> {
    let last = plan.entries.last()?;
    account.notifications.then(|| Notification {
        player_id: last.player_id,
        channel_id: account.channel_id,
        item_id: last.item_id,
        amount: u32::try_from(plan.entries.len()).unwrap_or(u32::MAX),
        fire_at: last.ends,
        kind: NotificationKind::FactoryReady,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use farmhand_types::ChannelId;

    use super::*;

    const DATA: &str = include_str!("../../../data/catalog.json");

    fn catalog() -> Catalog {
        Catalog::from_json(DATA).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn plant_ctx(capacity: u32, used: u32) -> PlantContext {
        PlantContext {
            player_id: PlayerId(1),
            player_level: 10,
            levels: ModifierLevels::ZERO,
            used_fields: used,
            capacity,
            cat_active: false,
            now: t0(),
        }
    }

    fn queue_ctx(worker_level: u32) -> QueueContext {
        QueueContext {
            player_id: PlayerId(1),
            player_level: 10,
            worker_level,
            slots: 10,
            now: t0(),
        }
    }

    #[test]
    fn crop_lifecycle_states() {
        let catalog = catalog();
        let lettuce = catalog.find_by_id(ItemId(1)).unwrap();
        let quote = plan_planting(lettuce, 1, &plant_ctx(6, 0)).unwrap();
        let entry = quote.entry;

        assert_eq!(entry.ends, add_secs(entry.starts, 600));
        assert_eq!(entry.dies, add_secs(entry.ends, 900));
        assert_eq!(farm_state(&entry, add_secs(t0(), 599)), FarmState::Growing);
        assert_eq!(farm_state(&entry, add_secs(t0(), 601)), FarmState::Collectable);
        assert_eq!(farm_state(&entry, add_secs(t0(), 1_501)), FarmState::Rotten);
        assert_eq!(quote.cost, 10);
    }

    #[test]
    fn state_derivation_is_pure() {
        let catalog = catalog();
        let lettuce = catalog.find_by_id(ItemId(1)).unwrap();
        let entry = plan_planting(lettuce, 2, &plant_ctx(6, 0)).unwrap().entry;
        let before = entry.clone();
        let at = add_secs(t0(), 700);
        assert_eq!(farm_state(&entry, at), farm_state(&entry, at));
        assert_eq!(entry, before);
    }

    #[test]
    fn rotten_is_harvestable_only_when_guarded() {
        let catalog = catalog();
        let lettuce = catalog.find_by_id(ItemId(1)).unwrap();
        let mut entry = plan_planting(lettuce, 1, &plant_ctx(6, 0)).unwrap().entry;
        let late = add_secs(t0(), 5_000);
        assert!(!is_harvestable(&entry, late, false));
        assert!(is_harvestable(&entry, late, true));
        entry.cat_boost = true;
        assert!(is_harvestable(&entry, late, false));
        assert!(!is_harvestable(&entry, t0(), true));
    }

    #[test]
    fn planting_respects_capacity() {
        let catalog = catalog();
        let lettuce = catalog.find_by_id(ItemId(1)).unwrap();
        assert!(plan_planting(lettuce, 2, &plant_ctx(6, 4)).is_ok());
        assert_eq!(
            plan_planting(lettuce, 3, &plant_ctx(6, 4)),
            Err(GameError::InsufficientResource {
                resource: Resource::FarmFields,
                required: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn planting_checks_category_and_level() {
        let catalog = catalog();
        let wheat = catalog.find_by_id(ItemId(103)).unwrap();
        assert!(matches!(
            plan_planting(wheat, 1, &plant_ctx(6, 0)),
            Err(GameError::WrongItem { .. })
        ));
        let pumpkin = catalog.find_by_id(ItemId(5)).unwrap();
        let mut ctx = plant_ctx(6, 0);
        ctx.player_level = 2;
        assert!(matches!(
            plan_planting(pumpkin, 1, &ctx),
            Err(GameError::InsufficientResource {
                resource: Resource::Level,
                ..
            })
        ));
    }

    #[test]
    fn amount_counts_volume_modifier() {
        let catalog = catalog();
        let cow = catalog.find_by_id(ItemId(31)).unwrap();
        let mut ctx = plant_ctx(6, 0);
        ctx.levels = ModifierLevels::ZERO.with_level(farmhand_types::ModifierTrack::Volume, 10);
        let entry = plan_planting(cow, 2, &ctx).unwrap().entry;
        assert_eq!(entry.amount, 12);
        assert_eq!(entry.iterations, 4);
    }

    #[test]
    fn worker_discount() {
        assert_eq!(production_time(7_200, 4), 5_760);
        assert_eq!(production_time(7_200, 0), 7_200);
        assert_eq!(production_time(100, 99), 50);
    }

    #[test]
    fn factory_queue_chains_back_to_back() {
        let catalog = catalog();
        let cheese = catalog.find_by_id(ItemId(202)).unwrap();
        let inventory = BTreeMap::from([(ItemId(131), 20)]);
        let first = plan_production(cheese, 3, &[], &inventory, &queue_ctx(0)).unwrap();
        assert_eq!(first.entries.len(), 3);
        for pair in first.entries.windows(2) {
            assert_eq!(pair[0].ends, pair[1].starts);
        }
        assert_eq!(first.entries[0].starts, t0());
        assert_eq!(first.entries[2].ends, add_secs(t0(), 16_200));
        assert_eq!(
            first.consumed,
            vec![InventoryLine {
                item_id: ItemId(131),
                amount: 6,
            }]
        );

        let second = plan_production(cheese, 3, &first.entries, &inventory, &queue_ctx(0)).unwrap();
        assert_eq!(second.entries[0].starts, first.entries[2].ends);
    }

    #[test]
    fn factory_checks_every_ingredient_first() {
        let catalog = catalog();
        let bread = catalog.find_by_id(ItemId(200)).unwrap();
        let inventory = BTreeMap::from([(ItemId(103), 30)]);
        assert_eq!(
            plan_production(bread, 2, &[], &inventory, &queue_ctx(0)),
            Err(GameError::InsufficientResource {
                resource: Resource::Item(ItemId(130)),
                required: 2,
                available: 0,
            })
        );
    }

    #[test]
    fn factory_respects_slots() {
        let catalog = catalog();
        let cheese = catalog.find_by_id(ItemId(202)).unwrap();
        let inventory = BTreeMap::from([(ItemId(131), 100)]);
        let mut ctx = queue_ctx(0);
        ctx.slots = 2;
        assert!(matches!(
            plan_production(cheese, 3, &[], &inventory, &ctx),
            Err(GameError::InsufficientResource {
                resource: Resource::FactorySlots,
                ..
            })
        ));
    }

    #[test]
    fn reminder_follows_preference() {
        let catalog = catalog();
        let lettuce = catalog.find_by_id(ItemId(1)).unwrap();
        let entry = plan_planting(lettuce, 1, &plant_ctx(6, 0)).unwrap().entry;
        let mut account = PlayerAccount {
            player_id: PlayerId(1),
            gold: 0,
            gems: 0,
            xp: 0,
            farm_slots: 6,
            factory_slots: 3,
            factory_level: 0,
            store_slots: 2,
            notifications: false,
            channel_id: Some(ChannelId(9)),
            registered_at: t0(),
        };
        assert!(harvest_reminder(&entry, &account).is_none());
        account.notifications = true;
        let note = harvest_reminder(&entry, &account).unwrap();
        assert_eq!(note.fire_at, entry.ends);
        assert_eq!(note.channel_id, Some(ChannelId(9)));
    }

    #[test]
    fn production_reminder_fires_at_last_unit() {
        let catalog = catalog();
        let cheese = catalog.find_by_id(ItemId(202)).unwrap();
        let inventory = BTreeMap::from([(ItemId(131), 100)]);
        let plan = plan_production(cheese, 2, &[], &inventory, &queue_ctx(0)).unwrap();
        let account = PlayerAccount {
            player_id: PlayerId(1),
            gold: 0,
            gems: 0,
            xp: 0,
            farm_slots: 6,
            factory_slots: 3,
            factory_level: 0,
            store_slots: 2,
            notifications: true,
            channel_id: None,
            registered_at: t0(),
        };
        let note = production_reminder(&plan, &account).unwrap();
        assert_eq!(note.amount, 2);
        assert_eq!(note.fire_at, plan.entries[1].ends);
        assert_eq!(note.kind, NotificationKind::FactoryReady);
    }
}
