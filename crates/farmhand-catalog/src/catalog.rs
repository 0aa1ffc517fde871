//! The process-wide item catalog.
//!
//! A [`Catalog`] is an immutable snapshot built once from the game-data
//! file. Building happens in passes:
//!
//! 1. Instantiate every primitive item (growables, specials, chests) and
//!    reject duplicate ids.
//! 2. Resolve each product against the growable that expands to it and
//!    derive the product's price band from that growable's economics.
//! 3. Resolve crafted recipes against the items from passes 1-2 and derive
//!    crafted price bands bottom-up, since crafted goods may themselves be
//!    ingredients.
//!
//! Market re-rolls never mutate a snapshot; they produce a new one with a
//! higher [`Revision`]. Revisions are totally ordered across processes:
//! two processes that roll from the same version at once draw different
//! tags, and every process keeps the roll with the larger tag.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use farmhand_types::{BoostKind, ItemId};

use crate::error::CatalogError;
use crate::fuzzy;
use crate::item::{
    BoostDefinition, CraftInfo, GrowableInfo, ItemDefinition, ItemKind, MarketInfo, PriceBand,
    PurchaseInfo,
};
use crate::pricing;
use crate::raw::{RawCatalog, RawCrafted, RawGrowable};

/// Tag reserved for snapshots produced by reloading the game-data file.
///
/// Rolls draw their tag below it, so a reload wins against a market roll
/// that raced it to the same version.
pub const RELOAD_TAG: u64 = u64::MAX;

/// Position of a snapshot in the process-wide history.
///
/// Ordered by `version`, then by `tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Bumped by every roll or reload.
    pub version: u64,
    /// Breaks ties between snapshots made concurrently at one version.
    pub tag: u64,
}

impl Revision {
    /// Revision of a freshly built catalog.
    pub const INITIAL: Self = Self { version: 1, tag: 0 };

    /// Revision of a reload following `self`.
    #[must_use]
    pub const fn next_reload(self) -> Self {
        Self {
            version: self.version.saturating_add(1),
            tag: RELOAD_TAG,
        }
    }
}

/// Immutable, versioned set of item and boost definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    revision: Revision,
    items: BTreeMap<ItemId, ItemDefinition>,
    boosts: BTreeMap<BoostKind, BoostDefinition>,
    names: Vec<(String, ItemId)>,
}

/// Which growable list a raw entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowableList {
    Seeds,
    Trees,
    Animals,
}

impl Catalog {
    /// Parse and build a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed JSON and the validation
    /// variants of [`CatalogError`] for inconsistent game data.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Read, parse, and build a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`Catalog::from_json`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.display(),
            items = catalog.items.len(),
            boosts = catalog.boosts.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-parsed game data.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of [`CatalogError`] for duplicate ids,
    /// dangling references, recipe cycles, or nonsensical values.
    #[allow(clippy::too_many_lines)]
    pub fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let mut items: BTreeMap<ItemId, ItemDefinition> = BTreeMap::new();
        let mut seen: BTreeSet<ItemId> = BTreeSet::new();

        // Pass 1: primitives.
        let growables = raw
            .seeds
            .iter()
            .map(|g| (GrowableList::Seeds, g))
            .chain(raw.trees.iter().map(|g| (GrowableList::Trees, g)))
            .chain(raw.animals.iter().map(|g| (GrowableList::Animals, g)));
        for (list, growable) in growables {
            claim_id(&mut seen, growable.id)?;
            let definition = build_growable(list, growable)?;
            items.insert(definition.id, definition);
        }

        for special in &raw.specials {
            claim_id(&mut seen, special.id)?;
            let min = special.min_price.max(1);
            let max = special.max_price.max(min);
            let band = PriceBand { min, max };
            items.insert(
                special.id,
                ItemDefinition {
                    id: special.id,
                    name: special.name.clone(),
                    level: special.level,
                    kind: ItemKind::Special,
                    xp: 0,
                    purchase: None,
                    market: Some(initial_market(band)),
                },
            );
        }

        for chest in &raw.chests {
            claim_id(&mut seen, chest.id)?;
            items.insert(
                chest.id,
                ItemDefinition {
                    id: chest.id,
                    name: chest.name.clone(),
                    level: 1,
                    kind: ItemKind::Chest {
                        weight: chest.weight,
                    },
                    xp: 0,
                    purchase: None,
                    market: None,
                },
            );
        }

        for id in raw.products.iter().map(|p| p.id).chain(raw.crafted.iter().map(|c| c.id)) {
            claim_id(&mut seen, id)?;
        }

        // Pass 2: products resolved against their growables.
        let product_ids: BTreeSet<ItemId> = raw.products.iter().map(|p| p.id).collect();
        for definition in items.values() {
            let Some(info) = definition.growable() else {
                continue;
            };
            if !product_ids.contains(&info.expands_to) {
                return Err(CatalogError::UnresolvedReference {
                    item: definition.id,
                    reference: info.expands_to,
                });
            }
        }

        for product in &raw.products {
            let definition = build_product(&items, product.id, &product.name)?;
            items.insert(product.id, definition);
        }

        // Pass 3: crafted goods, bands computed bottom-up.
        let crafted: BTreeMap<ItemId, &RawCrafted> = raw
            .crafted
            .iter()
            .map(|c| (c.id, c))
            .collect();

        let mut bands: BTreeMap<ItemId, PriceBand> = BTreeMap::new();
        for id in crafted.keys() {
            let mut visiting = BTreeSet::new();
            crafted_band(*id, &crafted, &items, &mut bands, &mut visiting)?;
        }

        for (id, recipe) in &crafted {
            let band = bands
                .get(id)
                .copied()
                .ok_or(CatalogError::CyclicRecipe(*id))?;
            items.insert(
                *id,
                ItemDefinition {
                    id: *id,
                    name: recipe.name.clone(),
                    level: recipe.level,
                    kind: ItemKind::Crafted(CraftInfo {
                        craft_time: recipe.craft_time,
                        ingredients: recipe.ingredients.clone(),
                    }),
                    xp: pricing::crafted_xp(recipe.craft_time),
                    purchase: None,
                    market: Some(initial_market(band)),
                },
            );
        }

        let boosts = raw
            .boosts
            .iter()
            .map(|b| {
                (
                    b.kind,
                    BoostDefinition {
                        kind: b.kind,
                        level: b.level,
                        price_per_hour: b.price_per_hour,
                    },
                )
            })
            .collect();

        let names = items
            .values()
            .map(|item| (fuzzy::normalize(&item.name), item.id))
            .collect();

        Ok(Self {
            revision: Revision::INITIAL,
            items,
            boosts,
            names,
        })
    }

    /// Snapshot version; increases with every market re-roll.
    pub const fn version(&self) -> u64 {
        self.revision.version
    }

    /// Full ordering key of the snapshot.
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Look up an item by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ItemNotFound`] if no such item exists.
    pub fn find_by_id(&self, id: ItemId) -> Result<&ItemDefinition, CatalogError> {
        self.items.get(&id).ok_or(CatalogError::ItemNotFound(id))
    }

    /// Look up an item by approximate name.
    ///
    /// An exact normalized match wins; otherwise the most similar name at
    /// or above [`fuzzy::MATCH_THRESHOLD`] is returned, lowest id first on
    /// ties.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NameNotFound`] if nothing is similar enough.
    pub fn find_by_name(&self, text: &str) -> Result<&ItemDefinition, CatalogError> {
        let query = fuzzy::normalize(text);
        if query.is_empty() {
            return Err(CatalogError::NameNotFound(text.to_owned()));
        }

        let mut best: Option<(f64, ItemId)> = None;
        for (name, id) in &self.names {
            if *name == query {
                return self.find_by_id(*id);
            }
            let score = fuzzy::similarity(&query, name);
            if score >= fuzzy::MATCH_THRESHOLD && best.is_none_or(|(top, _)| score > top) {
                best = Some((score, *id));
            }
        }

        match best {
            Some((_, id)) => self.find_by_id(id),
            None => Err(CatalogError::NameNotFound(text.to_owned())),
        }
    }

    /// All items in id order.
    pub fn items(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    /// Items sellable on the market, in id order.
    pub fn market_items(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values().filter(|item| item.market.is_some())
    }

    /// Chest items with their draw weights, in id order.
    pub fn chests(&self) -> impl Iterator<Item = (&ItemDefinition, u32)> {
        self.items.values().filter_map(|item| match item.kind {
            ItemKind::Chest { weight } => Some((item, weight)),
            _ => None,
        })
    }

    /// Purchase terms of a boost.
    pub fn boost(&self, kind: BoostKind) -> Option<&BoostDefinition> {
        self.boosts.get(&kind)
    }

    /// Plantable and craftable items that unlock exactly at `level`.
    pub fn unlocked_at(&self, level: u32) -> Vec<&ItemDefinition> {
        self.items
            .values()
            .filter(|item| item.level == level)
            .filter(|item| item.growable().is_some() || item.craft().is_some())
            .collect()
    }

    /// Current per-unit market prices of every market item.
    pub fn market_prices(&self) -> BTreeMap<ItemId, u32> {
        self.market_items()
            .filter_map(|item| item.gold_reward().map(|price| (item.id, price)))
            .collect()
    }

    /// Produce the next snapshot with every market price re-rolled
    /// uniformly inside its band.
    #[must_use]
    pub fn regenerate_market_prices<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut next = self.clone();
        for item in next.items.values_mut() {
            if let Some(market) = item.market.as_mut() {
                market.gold_reward = rng.random_range(market.band.min..=market.band.max);
            }
        }
        next.revision = Revision {
            version: self.revision.version.saturating_add(1),
            tag: rng.random_range(0..RELOAD_TAG),
        };
        next
    }

    /// Produce a snapshot at `revision` with prices rolled elsewhere.
    ///
    /// Prices are clamped into each item's band; unknown ids are ignored.
    /// Used to apply a re-roll broadcast by another process.
    #[must_use]
    pub fn with_market_prices(&self, revision: Revision, prices: &BTreeMap<ItemId, u32>) -> Self {
        let mut next = self.clone();
        for (id, price) in prices {
            if let Some(market) = next.items.get_mut(id).and_then(|item| item.market.as_mut()) {
                market.gold_reward = (*price).clamp(market.band.min, market.band.max);
            }
        }
        next.revision = revision;
        next
    }
}

// ---------------------------------------------------------------------------
// Build helpers
// ---------------------------------------------------------------------------

fn claim_id(seen: &mut BTreeSet<ItemId>, id: ItemId) -> Result<(), CatalogError> {
    if seen.insert(id) {
        Ok(())
    } else {
        Err(CatalogError::DuplicateId(id))
    }
}

const fn initial_market(band: PriceBand) -> MarketInfo {
    let spread = band.max.saturating_sub(band.min);
    MarketInfo {
        band,
        gold_reward: band.min.saturating_add(spread / 2),
    }
}

fn invalid(item: ItemId, reason: &str) -> CatalogError {
    CatalogError::InvalidDefinition {
        item,
        reason: reason.to_owned(),
    }
}

fn build_growable(list: GrowableList, raw: &RawGrowable) -> Result<ItemDefinition, CatalogError> {
    if raw.grow_time == 0 {
        return Err(invalid(raw.id, "grow_time must be positive"));
    }
    if raw.amount == 0 {
        return Err(invalid(raw.id, "amount must be positive"));
    }

    let iterations = match list {
        GrowableList::Seeds => 1,
        GrowableList::Trees | GrowableList::Animals => raw.iterations.unwrap_or(0),
    };
    if iterations < 1 || (list != GrowableList::Seeds && iterations < 2) {
        return Err(invalid(raw.id, "replantables need at least 2 iterations"));
    }

    let collect_window = raw
        .collect_window
        .unwrap_or_else(|| raw.grow_time.saturating_mul(3) / 2)
        .max(1);

    let info = GrowableInfo {
        grow_time: raw.grow_time,
        collect_window,
        amount: raw.amount,
        iterations,
        expands_to: raw.expands_to,
    };
    let kind = match list {
        GrowableList::Seeds => ItemKind::Seed(info),
        GrowableList::Trees => ItemKind::Tree(info),
        GrowableList::Animals => ItemKind::Animal(info),
    };

    Ok(ItemDefinition {
        id: raw.id,
        name: raw.name.clone(),
        level: raw.level,
        kind,
        xp: pricing::growable_xp(raw.grow_time, raw.amount),
        purchase: Some(PurchaseInfo {
            gold_price: raw.gold_price,
        }),
        market: None,
    })
}

fn build_product(
    items: &BTreeMap<ItemId, ItemDefinition>,
    id: ItemId,
    name: &str,
) -> Result<ItemDefinition, CatalogError> {
    let sources: Vec<&ItemDefinition> = items
        .values()
        .filter(|item| item.growable().is_some_and(|g| g.expands_to == id))
        .collect();

    let Some(source) = sources.first() else {
        return Err(invalid(id, "product is not yielded by any growable"));
    };
    let info = source
        .growable()
        .ok_or_else(|| invalid(id, "product source is not growable"))?;
    let cost = source.purchase.map_or(0, |p| p.gold_price);
    let band = pricing::growable_band(cost, info.amount, info.grow_time, source.is_replantable());
    let level = sources.iter().map(|s| s.level).min().unwrap_or(source.level);

    Ok(ItemDefinition {
        id,
        name: name.to_owned(),
        level,
        kind: ItemKind::Product { source: source.id },
        xp: 0,
        purchase: None,
        market: Some(initial_market(band)),
    })
}

/// Resolve the band of crafted item `id`, recursing into crafted
/// ingredients first.
fn crafted_band(
    id: ItemId,
    crafted: &BTreeMap<ItemId, &RawCrafted>,
    items: &BTreeMap<ItemId, ItemDefinition>,
    bands: &mut BTreeMap<ItemId, PriceBand>,
    visiting: &mut BTreeSet<ItemId>,
) -> Result<PriceBand, CatalogError> {
    if let Some(band) = bands.get(&id) {
        return Ok(*band);
    }
    if !visiting.insert(id) {
        return Err(CatalogError::CyclicRecipe(id));
    }
    let recipe = crafted.get(&id).ok_or(CatalogError::ItemNotFound(id))?;
    if recipe.craft_time == 0 {
        return Err(invalid(id, "craft_time must be positive"));
    }
    if recipe.ingredients.is_empty() {
        return Err(invalid(id, "recipe has no ingredients"));
    }

    let mut value: u64 = 0;
    for ingredient in &recipe.ingredients {
        if ingredient.amount == 0 {
            return Err(invalid(id, "ingredient amount must be positive"));
        }
        let max_price = if crafted.contains_key(&ingredient.item_id) {
            crafted_band(ingredient.item_id, crafted, items, bands, visiting)?.max
        } else {
            items
                .get(&ingredient.item_id)
                .and_then(|item| item.market)
                .map(|m| m.band.max)
                .ok_or(CatalogError::UnresolvedReference {
                    item: id,
                    reference: ingredient.item_id,
                })?
        };
        value = value.saturating_add(u64::from(max_price).saturating_mul(u64::from(ingredient.amount)));
    }

    let band = pricing::crafted_band(value, recipe.craft_time);
    visiting.remove(&id);
    bands.insert(id, band);
    Ok(band)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
