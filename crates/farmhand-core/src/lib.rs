//! Transaction coordination and process plumbing for the Farmhand game.
//!
//! Every player-facing operation lives here. Each one loads what it needs,
//! asks `farmhand-engine` for a plan, and persists the plan through the
//! `farmhand-db` stores inside a single transaction. Operations preceded by
//! an interactive prompt come in two halves: a read-only `quote_*` call and
//! a commit call that re-checks every precondition under the player's
//! profile lock.
//!
//! # Modules
//!
//! - [`account`] -- Registration, deletion, cached account reads.
//! - [`boosts`] -- Boost purchases held in the cache.
//! - [`bus`] -- NATS fan-out of market rolls, catalog reloads and the guard.
//! - [`config`] -- Configuration loading from `farmhand-config.yaml`.
//! - [`confirm`] -- Waiting for a player's answer to a prompt.
//! - [`context`] -- [`GameContext`], the handles every operation needs.
//! - [`error`] -- [`ServiceError`].
//! - [`exports`] -- Export contracts and shipments.
//! - [`factory`] -- Production queue and collection.
//! - [`farm`] -- Planting, harvesting, clearing fields.
//! - [`guard`] -- Process-wide field guard.
//! - [`market`] -- Sales and the periodic price roll.
//! - [`missions`] -- Mission board.
//! - [`notify`] -- [`Notifier`] seam for the reminder dispatcher.
//! - [`steal`] -- Theft between players.
//! - [`upgrades`] -- Modifier levels and capacity counters.
//!
//! [`GameContext`]: context::GameContext
//! [`ServiceError`]: error::ServiceError
//! [`Notifier`]: notify::Notifier

pub mod account;
pub mod boosts;
pub mod bus;
pub mod config;
pub mod confirm;
pub mod context;
pub mod error;
pub mod exports;
pub mod factory;
pub mod farm;
pub mod guard;
pub mod market;
pub mod missions;
pub mod notify;
mod settle;
pub mod steal;
pub mod upgrades;

pub use context::GameContext;
pub use error::ServiceError;
