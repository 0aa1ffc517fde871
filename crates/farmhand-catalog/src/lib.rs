//! Item catalog for the Farmhand game backend.
//!
//! Loads game data once at startup, validates cross-references, derives
//! market price bands and experience values, and serves lookups by id and
//! approximate name. Market prices are re-rolled by swapping in a new
//! immutable snapshot through [`CatalogHandle`].

pub mod catalog;
pub mod error;
pub mod fuzzy;
pub mod handle;
pub mod item;
pub mod pricing;
pub mod raw;

pub use catalog::{Catalog, RELOAD_TAG, Revision};
pub use error::CatalogError;
pub use handle::CatalogHandle;
pub use item::{
    BoostDefinition, CraftInfo, GrowableInfo, Ingredient, ItemDefinition, ItemKind, MarketInfo,
    PriceBand, PurchaseInfo,
};
pub use raw::RawCatalog;
