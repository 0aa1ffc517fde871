//! Item definitions.
//!
//! An [`ItemDefinition`] is immutable once the catalog is built. The item's
//! category is an explicit [`ItemKind`] variant carrying exactly the data
//! that category needs; economic attributes live in optional sub-records
//! populated according to the variant.

use serde::{Deserialize, Serialize};

use farmhand_types::{BoostKind, ItemCategory, ItemId};

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Growth parameters of a seed, tree, or animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowableInfo {
    /// Base seconds from planting until collectable.
    pub grow_time: u32,
    /// Base seconds the cycle stays collectable before rotting.
    pub collect_window: u32,
    /// Units of product yielded per field per cycle.
    pub amount: u32,
    /// Harvest cycles per planting (1 for seeds).
    pub iterations: u32,
    /// The product this growable yields.
    pub expands_to: ItemId,
}

/// One ingredient line of a factory recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient item.
    pub item_id: ItemId,
    /// Units consumed per crafted unit.
    pub amount: u32,
}

/// Factory recipe of a crafted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftInfo {
    /// Base seconds to produce one unit.
    pub craft_time: u32,
    /// Items consumed per unit.
    pub ingredients: Vec<Ingredient>,
}

/// Category tag plus the category-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "category")]
pub enum ItemKind {
    /// Single-harvest crop seed.
    Seed(GrowableInfo),
    /// Replantable tree.
    Tree(GrowableInfo),
    /// Replantable animal.
    Animal(GrowableInfo),
    /// Harvested product.
    Product {
        /// The growable that yields this product.
        source: ItemId,
    },
    /// Factory good.
    Crafted(CraftInfo),
    /// Ungrowable special with a fixed price band.
    Special,
    /// Reward chest.
    Chest {
        /// Relative weight in reward chest draws.
        weight: u32,
    },
}

impl ItemKind {
    /// The plain category tag of this variant.
    pub const fn category(&self) -> ItemCategory {
        match self {
            Self::Seed(_) => ItemCategory::Seed,
            Self::Tree(_) => ItemCategory::Tree,
            Self::Animal(_) => ItemCategory::Animal,
            Self::Product { .. } => ItemCategory::Product,
            Self::Crafted(_) => ItemCategory::Crafted,
            Self::Special => ItemCategory::Special,
            Self::Chest { .. } => ItemCategory::Chest,
        }
    }
}

// ---------------------------------------------------------------------------
// Economic sub-records
// ---------------------------------------------------------------------------

/// Min/max market sell price per unit. Both bounds are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    /// Lowest roll.
    pub min: u32,
    /// Highest roll.
    pub max: u32,
}

/// Purchase information for items bought with gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfo {
    /// Gold cost per unit (per field for growables).
    pub gold_price: u32,
}

/// Market information for sellable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Price band derived at load time.
    pub band: PriceBand,
    /// Current per-unit price, re-rolled inside `band`.
    pub gold_reward: u32,
}

// ---------------------------------------------------------------------------
// ItemDefinition
// ---------------------------------------------------------------------------

/// An immutable item definition owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Player level required to use this item.
    pub level: u32,
    /// Category and category data.
    pub kind: ItemKind,
    /// Experience per harvested or crafted unit (0 if not producible).
    pub xp: u32,
    /// Present for items bought with gold.
    pub purchase: Option<PurchaseInfo>,
    /// Present for items sellable on the market.
    pub market: Option<MarketInfo>,
}

impl ItemDefinition {
    /// The category tag.
    pub const fn category(&self) -> ItemCategory {
        self.kind.category()
    }

    /// Growth parameters if this item can be planted.
    pub const fn growable(&self) -> Option<&GrowableInfo> {
        match &self.kind {
            ItemKind::Seed(info) | ItemKind::Tree(info) | ItemKind::Animal(info) => Some(info),
            _ => None,
        }
    }

    /// Recipe if this item is produced in the factory.
    pub const fn craft(&self) -> Option<&CraftInfo> {
        match &self.kind {
            ItemKind::Crafted(info) => Some(info),
            _ => None,
        }
    }

    /// Whether the item regrows after harvest.
    pub const fn is_replantable(&self) -> bool {
        self.category().is_replantable()
    }

    /// Upper market price, or 0 for items without a market.
    pub fn max_price(&self) -> u32 {
        self.market.map_or(0, |m| m.band.max)
    }

    /// Current market price, or `None` for items without a market.
    pub fn gold_reward(&self) -> Option<u32> {
        self.market.map(|m| m.gold_reward)
    }
}

// ---------------------------------------------------------------------------
// Boosts
// ---------------------------------------------------------------------------

/// Purchase terms of a boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostDefinition {
    /// Which boost.
    pub kind: BoostKind,
    /// Player level required.
    pub level: u32,
    /// Gold per hour of activation.
    pub price_per_hour: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ItemDefinition {
        ItemDefinition {
            id: ItemId(20),
            name: "Apple Tree".to_owned(),
            level: 4,
            kind: ItemKind::Tree(GrowableInfo {
                grow_time: 7200,
                collect_window: 10800,
                amount: 4,
                iterations: 3,
                expands_to: ItemId(120),
            }),
            xp: 60,
            purchase: Some(PurchaseInfo { gold_price: 300 }),
            market: None,
        }
    }

    #[test]
    fn capabilities_follow_variant() {
        let item = tree();
        assert_eq!(item.category(), ItemCategory::Tree);
        assert!(item.is_replantable());
        assert!(item.growable().is_some());
        assert!(item.craft().is_none());
        assert_eq!(item.max_price(), 0);
        assert_eq!(item.gold_reward(), None);
    }
}
