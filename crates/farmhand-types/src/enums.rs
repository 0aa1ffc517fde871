//! Enumeration types for the Farmhand game backend.
//!
//! Item categories, modifier tracks, boosts, capacity upgrades, and the
//! time-derived states of farm and factory entries.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item categories
// ---------------------------------------------------------------------------

/// The category tag of an item definition.
///
/// The tag decides which capabilities an item has: whether it can be
/// planted, harvested, crafted, sold on the market, or opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Single-harvest crop seed.
    Seed,
    /// Replantable tree, harvested several times per planting.
    Tree,
    /// Replantable animal, collected several times per planting.
    Animal,
    /// Product yielded by a seed, tree, or animal.
    Product,
    /// Good produced in the factory from other items.
    Crafted,
    /// Item that cannot be grown or crafted (event drops, specials).
    Special,
    /// Loot chest granted as a reward.
    Chest,
}

impl ItemCategory {
    /// Whether items of this category occupy farm fields.
    pub const fn is_growable(self) -> bool {
        matches!(self, Self::Seed | Self::Tree | Self::Animal)
    }

    /// Whether items of this category regrow after a harvest.
    pub const fn is_replantable(self) -> bool {
        matches!(self, Self::Tree | Self::Animal)
    }

    /// Whether items of this category can be sold on the market.
    pub const fn is_marketable(self) -> bool {
        matches!(self, Self::Product | Self::Crafted | Self::Special)
    }
}

// ---------------------------------------------------------------------------
// Modifier tracks
// ---------------------------------------------------------------------------

/// One of the three independent per-item upgrade tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTrack {
    /// Reduces grow time by 5% per level.
    GrowTime,
    /// Extends the collect window by 10% per level.
    CollectWindow,
    /// Increases yield volume by 10% per level.
    Volume,
}

impl ModifierTrack {
    /// All tracks in a stable order.
    pub const ALL: [Self; 3] = [Self::GrowTime, Self::CollectWindow, Self::Volume];

    /// Stable identifier used for cooldown keys.
    pub const fn key(self) -> &'static str {
        match self {
            Self::GrowTime => "grow_time",
            Self::CollectWindow => "collect_window",
            Self::Volume => "volume",
        }
    }
}

// ---------------------------------------------------------------------------
// Boosts
// ---------------------------------------------------------------------------

/// A time-boxed player boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostKind {
    /// Weakest guard dog: catches a thief on 1 of 8 draws.
    Dog1,
    /// Guard dog: catches a thief on 1 of 6 draws.
    Dog2,
    /// Guard dog: catches a thief on 1 of 4 draws.
    Dog3,
    /// Strongest guard dog: catches a thief on 1 of 3 draws.
    Dog4,
    /// Fence around the farm: theft is impossible.
    Fence,
    /// Farm cat: entries planted while active never rot.
    Cat,
    /// Two extra farm fields.
    FarmSlots,
    /// Two extra factory queue slots.
    FactorySlots,
}

impl BoostKind {
    /// All boosts in a stable order.
    pub const ALL: [Self; 8] = [
        Self::Dog1,
        Self::Dog2,
        Self::Dog3,
        Self::Dog4,
        Self::Fence,
        Self::Cat,
        Self::FarmSlots,
        Self::FactorySlots,
    ];

    /// Catch odds (1 in N per drawn unit) for the lesser guard dogs.
    pub const fn catch_one_in(self) -> Option<u32> {
        match self {
            Self::Dog1 => Some(8),
            Self::Dog2 => Some(6),
            Self::Dog3 => Some(4),
            Self::Dog4 => Some(3),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Capacity upgrades
// ---------------------------------------------------------------------------

/// A purchasable player capacity counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityKind {
    /// Number of farm fields.
    FarmSlots,
    /// Number of factory queue slots.
    FactorySlots,
    /// Factory worker level (production time reduction).
    FactoryWorkers,
    /// Number of trade store slots.
    StoreSlots,
}

// ---------------------------------------------------------------------------
// Derived entry states
// ---------------------------------------------------------------------------

/// Time-derived state of a farm entry. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmState {
    /// Still growing (`now < ends`).
    Growing,
    /// Ready to harvest (`ends <= now < dies`).
    Collectable,
    /// Past the collect window (`now >= dies`).
    Rotten,
}

/// Time-derived state of a factory entry. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryState {
    /// Waiting for earlier queue entries (`now < starts`).
    Queued,
    /// In production (`starts <= now < ends`).
    Producing,
    /// Finished and collectable (`now >= ends`).
    Ready,
}

/// What an asynchronous player notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NotificationKind {
    /// A farm entry becomes collectable.
    HarvestReady,
    /// A factory entry finishes production.
    FactoryReady,
    /// Another player skimmed the farm.
    Robbed {
        /// The player who stole.
        by: crate::PlayerId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_capabilities() {
        assert!(ItemCategory::Seed.is_growable());
        assert!(!ItemCategory::Seed.is_replantable());
        assert!(ItemCategory::Tree.is_replantable());
        assert!(ItemCategory::Animal.is_replantable());
        assert!(!ItemCategory::Product.is_growable());
        assert!(ItemCategory::Crafted.is_marketable());
        assert!(!ItemCategory::Chest.is_marketable());
    }

    #[test]
    fn only_dogs_have_catch_odds() {
        let odds: Vec<u32> = BoostKind::ALL
            .iter()
            .filter_map(|b| b.catch_one_in())
            .collect();
        assert_eq!(odds, vec![8, 6, 4, 3]);
        assert_eq!(BoostKind::Fence.catch_one_in(), None);
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ItemCategory::Crafted).ok();
        assert_eq!(json.as_deref(), Some("\"crafted\""));
    }
}
