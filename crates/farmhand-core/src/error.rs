//! Error types for game operations.
//!
//! A [`ServiceError`] is either a game outcome the front-end shows to the
//! player ([`GameError`]) or an infrastructure failure the operator has to
//! look at.

use farmhand_catalog::CatalogError;
use farmhand_db::DbError;
use farmhand_engine::GameError;

/// Errors returned by transaction coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A game rule refused the operation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The persistent store or cache failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Loading a catalog file failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Publishing to or reading from the message bus failed.
    #[error("bus error: {0}")]
    Bus(String),

    /// Stored data contradicts itself.
    #[error("integrity error: {0}")]
    Integrity(String),
}

impl ServiceError {
    /// Whether the error is a normal game outcome to show the player.
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::Game(err) => err.is_user_facing(),
            Self::Db(_) | Self::Catalog(_) | Self::Bus(_) | Self::Integrity(_) => false,
        }
    }

    /// The game outcome, if this is one.
    pub const fn game(&self) -> Option<&GameError> {
        match self {
            Self::Game(err) => Some(err),
            Self::Db(_) | Self::Catalog(_) | Self::Bus(_) | Self::Integrity(_) => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::Postgres(err))
    }
}

/// Turn a shortfall found while re-validating after a confirmation into
/// [`GameError::StaleConfirmation`].
pub(crate) fn stale(err: GameError) -> GameError {
    match err {
        GameError::InsufficientResource {
            resource,
            required,
            available,
        } => GameError::StaleConfirmation {
            resource,
            required,
            available,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use farmhand_engine::{Resource, TheftBlock};
    use farmhand_types::ItemId;

    use super::*;

    #[test]
    fn shortfall_after_confirmation_is_stale() {
        let err = stale(GameError::InsufficientResource {
            resource: Resource::Gold,
            required: 300,
            available: 120,
        });
        assert_eq!(
            err,
            GameError::StaleConfirmation {
                resource: Resource::Gold,
                required: 300,
                available: 120,
            }
        );
        let other = stale(GameError::TheftBlocked(TheftBlock::Fence));
        assert_eq!(other, GameError::TheftBlocked(TheftBlock::Fence));
    }

    #[test]
    fn desync_and_infrastructure_are_not_user_facing() {
        assert!(ServiceError::from(GameError::OnCooldown { remaining_secs: 3 }).is_user_facing());
        assert!(!ServiceError::from(GameError::CatalogDesync(ItemId(9))).is_user_facing());
        assert!(!ServiceError::Bus("down".to_owned()).is_user_facing());
    }
}
