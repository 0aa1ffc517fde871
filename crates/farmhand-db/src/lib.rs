//! Data layer for the Farmhand game backend (`PostgreSQL` + cache).
//!
//! `PostgreSQL` is authoritative for every balance, ledger row and offer.
//! The Redis-compatible cache holds read-through account copies and the
//! time-boxed state whose lifetime is its TTL (cooldowns, export
//! contracts, boosts).
//!
//! # Architecture
//!
//! ```text
//! Game operation
//!     |
//!     +-- One transaction ------> PostgreSQL (PostgresPool::begin)
//!     |   |-- ProfileStore     (balances, capacities; row lock)
//!     |   |-- FarmStore        (planted ledger)
//!     |   |-- FactoryStore     (production queue)
//!     |   |-- InventoryStore   (held items)
//!     |   |-- ModifierStore    (per-item upgrade levels)
//!     |   +-- MissionStore     (open mission offers)
//!     |
//!     +-- After commit ---------> Cache (CachePool)
//! ```
//!
//! Stores borrow a `&mut PgConnection`, so they run equally against a
//! pooled connection or an open transaction.
//!
//! # Modules
//!
//! - [`cache`] -- Redis-compatible cache operations
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`rows`] -- Raw row shapes and checked conversions
//! - [`error`] -- Shared error types

pub mod cache;
pub mod error;
pub mod factory_store;
pub mod farm_store;
pub mod inventory_store;
pub mod mission_store;
pub mod modifier_store;
pub mod postgres;
pub mod profile_store;
pub mod rows;

// Re-export primary types for convenience.
pub use cache::CachePool;
pub use error::DbError;
pub use factory_store::FactoryStore;
pub use farm_store::FarmStore;
pub use inventory_store::InventoryStore;
pub use mission_store::MissionStore;
pub use modifier_store::ModifierStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use profile_store::ProfileStore;
