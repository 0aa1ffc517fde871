//! Precondition checks shared by every operation.

use crate::error::{GameError, Resource};

/// Default sanity ceiling on any single requested quantity.
pub const DEFAULT_QUANTITY_CEILING: u32 = 1_000;

/// Validate a player-supplied quantity against `1..=ceiling`.
pub fn validate_quantity(requested: i64, ceiling: u32) -> Result<u32, GameError> {
    u32::try_from(requested)
        .ok()
        .filter(|amount| (1..=ceiling).contains(amount))
        .ok_or(GameError::InvalidQuantity {
            requested,
            max: ceiling,
        })
}

/// Require `available >= required` of a resource.
pub const fn ensure(resource: Resource, required: u64, available: u64) -> Result<(), GameError> {
    if available < required {
        return Err(GameError::InsufficientResource {
            resource,
            required,
            available,
        });
    }
    Ok(())
}

/// Require a non-negative currency balance of at least `required`.
pub fn ensure_balance(resource: Resource, required: i64, balance: i64) -> Result<(), GameError> {
    ensure(resource, non_negative(required), non_negative(balance))
}

/// Require the player to have reached `required` level.
pub fn ensure_level(required: u32, level: u32) -> Result<(), GameError> {
    ensure(Resource::Level, u64::from(required), u64::from(level))
}

/// Clamp a signed balance into `u64`, treating negatives as zero.
pub fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
