//! Game outcome errors.
//!
//! Every variant except [`GameError::CatalogDesync`] is an ordinary,
//! recoverable player-facing outcome carrying the numbers a front-end needs
//! to render it. `CatalogDesync` means a ledger row references an item the
//! catalog does not know, which is a data-integrity bug.

use std::fmt;

use farmhand_catalog::CatalogError;
use farmhand_types::{BoostKind, CapacityKind, ItemId, MissionId, ModifierTrack, PlayerId};
use serde::Serialize;

/// A countable resource a player can run short of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "item_id")]
pub enum Resource {
    /// Gold currency.
    Gold,
    /// Premium currency.
    Gems,
    /// Units of an inventory item.
    Item(ItemId),
    /// Free farm fields.
    FarmFields,
    /// Free factory queue slots.
    FactorySlots,
    /// Free trade store slots.
    StoreSlots,
    /// Player level.
    Level,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gold => write!(f, "gold"),
            Self::Gems => write!(f, "gems"),
            Self::Item(id) => write!(f, "item {id}"),
            Self::FarmFields => write!(f, "farm fields"),
            Self::FactorySlots => write!(f, "factory slots"),
            Self::StoreSlots => write!(f, "store slots"),
            Self::Level => write!(f, "level"),
        }
    }
}

/// What a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "key")]
pub enum Missing {
    /// Item by id.
    Item(ItemId),
    /// Item by approximate name.
    Name(String),
    /// Boost purchase terms.
    Boost(BoostKind),
    /// Open mission offer.
    Mission(MissionId),
    /// Active export contract.
    Export,
    /// Registered player account.
    Account(PlayerId),
    /// Anything unlocked for mission or export generation.
    Candidates,
    /// Entries ready to harvest or collect.
    ReadyEntries,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(id) => write!(f, "item {id}"),
            Self::Name(name) => write!(f, "item named \"{name}\""),
            Self::Boost(kind) => write!(f, "boost {kind:?}"),
            Self::Mission(id) => write!(f, "mission {id}"),
            Self::Export => write!(f, "active export"),
            Self::Account(id) => write!(f, "account {id}"),
            Self::Candidates => write!(f, "unlocked items"),
            Self::ReadyEntries => write!(f, "ready entries"),
        }
    }
}

/// A maximum that an upgrade or delivery has already reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "key")]
pub enum Limit {
    /// A modifier track is at its top level.
    Modifier(ModifierTrack),
    /// A capacity counter is at its maximum.
    Capacity(CapacityKind),
    /// The export contract has shipped every shipment.
    ExportShipments,
    /// An export contract is already running.
    ActiveExport,
    /// The player already holds the maximum number of mission offers.
    Missions,
    /// The player is already registered.
    Registration,
}

/// Why a steal attempt could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TheftBlock {
    /// The target has the strongest guard active.
    Fence,
    /// The target has nothing collectable left to take.
    NothingEligible,
    /// Players cannot rob themselves.
    SelfTarget,
}

/// Errors returned by game rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// A lookup found nothing.
    #[error("not found: {0}")]
    NotFound(Missing),

    /// Not enough of a resource for the requested action.
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResource {
        /// The resource that ran short.
        resource: Resource,
        /// Amount the action needs.
        required: u64,
        /// Amount the player has.
        available: u64,
    },

    /// An upgrade or delivery counter is already at its maximum.
    #[error("already at limit: {0:?}")]
    AlreadyAtLimit(Limit),

    /// The action is on cooldown.
    #[error("on cooldown for another {remaining_secs}s")]
    OnCooldown {
        /// Seconds until the action is available again.
        remaining_secs: u64,
    },

    /// The requested quantity is zero or above the sanity ceiling.
    #[error("invalid quantity {requested} (allowed 1..={max})")]
    InvalidQuantity {
        /// Quantity asked for.
        requested: i64,
        /// Highest quantity accepted.
        max: u32,
    },

    /// The item cannot be used for the requested action.
    #[error("item {item} cannot be used here: {reason}")]
    WrongItem {
        /// The offending item.
        item: ItemId,
        /// What the action needed.
        reason: &'static str,
    },

    /// A precondition that held when the player confirmed no longer holds.
    #[error("{resource} changed during confirmation: need {required}, have {available}")]
    StaleConfirmation {
        /// The resource that changed.
        resource: Resource,
        /// Amount the action needs.
        required: u64,
        /// Amount the player has now.
        available: u64,
    },

    /// The target row was already changed by a competing request.
    #[error("lost a concurrent modification: {0}")]
    ConcurrentModificationLost(String),

    /// A steal attempt cannot start.
    #[error("theft blocked: {0:?}")]
    TheftBlocked(TheftBlock),

    /// A ledger row references an item missing from the catalog.
    #[error("catalog desync: ledger references unknown item {0}")]
    CatalogDesync(ItemId),
}

impl GameError {
    /// Whether the error is a normal game outcome to show the player.
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::CatalogDesync(_))
    }

    /// Map a catalog lookup failure for player-supplied input.
    pub fn from_lookup(error: CatalogError) -> Self {
        match error {
            CatalogError::ItemNotFound(id) => Self::NotFound(Missing::Item(id)),
            CatalogError::NameNotFound(name) => Self::NotFound(Missing::Name(name)),
            other => Self::NotFound(Missing::Name(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_desync_is_internal() {
        assert!(GameError::OnCooldown { remaining_secs: 5 }.is_user_facing());
        assert!(GameError::TheftBlocked(TheftBlock::Fence).is_user_facing());
        assert!(!GameError::CatalogDesync(ItemId(7)).is_user_facing());
    }

    #[test]
    fn lookup_errors_become_not_found() {
        let err = GameError::from_lookup(CatalogError::ItemNotFound(ItemId(3)));
        assert_eq!(err, GameError::NotFound(Missing::Item(ItemId(3))));
        let err = GameError::from_lookup(CatalogError::NameNotFound("zz".to_owned()));
        assert_eq!(err, GameError::NotFound(Missing::Name("zz".to_owned())));
    }

    #[test]
    fn messages_carry_numbers() {
        let err = GameError::InsufficientResource {
            resource: Resource::Gold,
            required: 50,
            available: 20,
        };
        assert_eq!(err.to_string(), "insufficient gold: need 50, have 20");
    }
}
