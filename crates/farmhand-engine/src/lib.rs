//! Game rules for the Farmhand backend.
//!
//! Everything in this crate is a pure function of its inputs: ledger rows,
//! account state, the catalog snapshot, `now`, and an injected random
//! number generator. Persistence and transactions live in `farmhand-db` and
//! `farmhand-core`; this crate only decides what should change.
//!
//! # Modules
//!
//! - [`modifiers`] -- per-item upgrade effects and upgrade pricing
//! - [`schedule`] -- entry state derivation, planting, factory queueing
//! - [`cycle`] -- harvest and collect planning, multi-cycle advancement
//! - [`levels`] / [`settlement`] -- experience, levels, reward settlement
//! - [`missions`] / [`exports`] -- procedural rewards
//! - [`theft`] -- steal resolution under guard checks
//! - [`boosts`] / [`capacity`] / [`market`] -- purchases and sales
//! - [`confirmation`] -- pending confirmation state machine
//! - [`checks`] / [`error`] -- shared preconditions and the error taxonomy

pub mod boosts;
pub mod capacity;
pub mod checks;
pub mod confirmation;
pub mod cycle;
pub mod error;
pub mod exports;
pub mod levels;
pub mod market;
pub mod missions;
pub mod modifiers;
pub mod schedule;
pub mod settlement;
pub mod theft;

pub use boosts::Guard;
pub use confirmation::{ConfirmationInput, ConfirmationState, PendingConfirmation};
pub use cycle::{CollectPlan, CycleOutcome, HarvestPlan};
pub use error::{GameError, Limit, Missing, Resource, TheftBlock};
pub use levels::LevelProgress;
pub use settlement::Settlement;
pub use theft::StealOutcome;
