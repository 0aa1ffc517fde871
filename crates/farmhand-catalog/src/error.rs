//! Error types for the `farmhand-catalog` crate.
//!
//! Load and validation failures are fatal at startup; lookup failures are
//! ordinary "not found" outcomes surfaced to the player.

use farmhand_types::ItemId;

/// Errors that can occur while loading or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Reading a catalog file failed.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog JSON is malformed.
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two definitions share an id.
    #[error("duplicate item id: {0}")]
    DuplicateId(ItemId),

    /// A definition references an id that does not exist or has the wrong
    /// category.
    #[error("item {item} references unknown or invalid item {reference}")]
    UnresolvedReference {
        /// The referencing item.
        item: ItemId,
        /// The missing reference.
        reference: ItemId,
    },

    /// Crafted recipes reference each other in a loop.
    #[error("recipe cycle detected at item {0}")]
    CyclicRecipe(ItemId),

    /// A definition has values that make no sense (zero durations etc.).
    #[error("invalid definition for item {item}: {reason}")]
    InvalidDefinition {
        /// The offending item.
        item: ItemId,
        /// What is wrong with it.
        reason: String,
    },

    /// No item with this id exists.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// No item name is similar enough to the query.
    #[error("no item matches \"{0}\"")]
    NameNotFound(String),
}
