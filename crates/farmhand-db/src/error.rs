//! Data-layer errors.
//!
//! [`DbError`] wraps driver errors from [`sqlx`] and [`fred`] and adds the
//! one failure the stores detect themselves: a stored value outside the
//! range of its domain type.

/// Errors returned by stores and pools.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A query or transaction failed.
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A cache command failed.
    #[error("cache: {0}")]
    Cache(#[from] fred::error::Error),

    /// A cached or JSON column value did not round-trip.
    #[error("json: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value is outside the range its domain type allows.
    #[error("corrupt {column} value in {table}: {value}")]
    Corrupt {
        /// Table holding the value.
        table: &'static str,
        /// Column holding the value.
        column: &'static str,
        /// The offending value.
        value: i64,
    },

    /// Connection settings were unusable.
    #[error("config: {0}")]
    Config(String),
}
