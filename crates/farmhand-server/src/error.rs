//! Error types for the server binary.
//!
//! [`ServerError`] wraps every failure mode of startup and shutdown so
//! `main` can propagate with `?`.

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: farmhand_core::config::ConfigError,
    },

    /// The item catalog could not be loaded.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: farmhand_catalog::CatalogError,
    },

    /// `PostgreSQL` or the cache could not be reached.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: farmhand_db::DbError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
