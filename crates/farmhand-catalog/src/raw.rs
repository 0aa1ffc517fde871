//! On-disk catalog schema.
//!
//! These structs mirror the JSON game-data file one to one. They are only
//! used during loading; [`Catalog`](crate::Catalog) converts them into
//! [`ItemDefinition`](crate::ItemDefinition)s.

use serde::Deserialize;

use farmhand_types::{BoostKind, ItemId};

use crate::item::Ingredient;

/// The whole game-data file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCatalog {
    /// Single-harvest seeds.
    #[serde(default)]
    pub seeds: Vec<RawGrowable>,
    /// Replantable trees.
    #[serde(default)]
    pub trees: Vec<RawGrowable>,
    /// Replantable animals.
    #[serde(default)]
    pub animals: Vec<RawGrowable>,
    /// Harvested products.
    #[serde(default)]
    pub products: Vec<RawProduct>,
    /// Factory goods.
    #[serde(default)]
    pub crafted: Vec<RawCrafted>,
    /// Ungrowable specials.
    #[serde(default)]
    pub specials: Vec<RawSpecial>,
    /// Reward chests.
    #[serde(default)]
    pub chests: Vec<RawChest>,
    /// Boost purchase terms.
    #[serde(default)]
    pub boosts: Vec<RawBoost>,
}

/// A seed, tree, or animal entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGrowable {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Required level.
    pub level: u32,
    /// Gold per field.
    pub gold_price: u32,
    /// Seconds until collectable.
    pub grow_time: u32,
    /// Seconds collectable; defaults to 1.5x `grow_time`.
    #[serde(default)]
    pub collect_window: Option<u32>,
    /// Units yielded per field per cycle.
    pub amount: u32,
    /// Harvest cycles per planting; seeds always use 1.
    #[serde(default)]
    pub iterations: Option<u32>,
    /// Yielded product id.
    pub expands_to: ItemId,
}

/// A harvested product entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
}

/// A crafted item entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCrafted {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Required level.
    pub level: u32,
    /// Seconds to produce one unit.
    pub craft_time: u32,
    /// Recipe.
    pub ingredients: Vec<Ingredient>,
}

/// An ungrowable special entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpecial {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Required level.
    pub level: u32,
    /// Lowest market price.
    pub min_price: u32,
    /// Highest market price.
    pub max_price: u32,
}

/// A chest entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChest {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Relative draw weight.
    pub weight: u32,
}

/// A boost entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBoost {
    /// Which boost.
    pub kind: BoostKind,
    /// Required level.
    pub level: u32,
    /// Gold per hour.
    pub price_per_hour: u32,
}
