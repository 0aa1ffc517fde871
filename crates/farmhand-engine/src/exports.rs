//! Export contracts: time-boxed repeat deliveries with escalating rewards.
//!
//! Shipment `n` (1-based) pays `base_gold * n` gold and
//! `floor(base_xp * (1 + 0.4 * n))` experience. Shipments 3, 7, and 10 also
//! award a chest. A contract ends after ten shipments or when its time box
//! elapses, whichever comes first.

use chrono::{DateTime, Utc};
use rand::Rng;

use farmhand_catalog::{Catalog, ItemDefinition};
use farmhand_types::{ExportContract, ItemCategory, PlayerId};

use crate::error::{GameError, Limit, Missing};
use crate::schedule::add_secs;

/// Shipments per contract.
pub const MAX_SHIPMENTS: u32 = 10;

/// Shipment numbers that award a chest.
pub const CHEST_SHIPMENTS: [u32; 3] = [3, 7, 10];

/// Default contract lifetime in seconds.
pub const DEFAULT_EXPORT_SECS: u64 = 21_600;

/// Reward of one shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ShipmentReward {
    /// 1-based shipment number.
    pub number: u32,
    /// Gold paid.
    pub gold: i64,
    /// Experience paid.
    pub xp: i64,
    /// Whether a chest is due with this shipment.
    pub chest_due: bool,
}

/// Reward for shipment `number` of a contract.
pub fn shipment_reward(base_gold: i64, base_xp: i64, number: u32) -> ShipmentReward {
    let n = i64::from(number);
    let gold = base_gold.saturating_mul(n).max(1);
    let xp = (base_xp.saturating_mul(n.saturating_mul(4).saturating_add(10)) / 10).max(1);
    ShipmentReward {
        number,
        gold,
        xp,
        chest_due: CHEST_SHIPMENTS.contains(&number),
    }
}

/// Whether every shipment of a contract has been delivered.
pub const fn is_fulfilled(contract: &ExportContract) -> bool {
    contract.shipments >= MAX_SHIPMENTS
}

/// Reward of the next shipment of an active contract.
pub fn next_shipment(contract: &ExportContract, now: DateTime<Utc>) -> Result<ShipmentReward, GameError> {
    if now >= contract.expires_at {
        return Err(GameError::NotFound(Missing::Export));
    }
    if is_fulfilled(contract) {
        return Err(GameError::AlreadyAtLimit(Limit::ExportShipments));
    }
    let number = contract.shipments.saturating_add(1);
    Ok(shipment_reward(contract.base_gold, contract.base_xp, number))
}

/// Generate a new contract for a player at `level`.
pub fn generate(
    catalog: &Catalog,
    player_id: PlayerId,
    level: u32,
    duration_secs: u64,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<ExportContract, GameError> {
    let pool: Vec<&ItemDefinition> = catalog
        .market_items()
        .filter(|item| item.level <= level)
        .filter(|item| {
            matches!(
                item.category(),
                ItemCategory::Product | ItemCategory::Crafted
            )
        })
        .collect();
    if pool.is_empty() {
        return Err(GameError::NotFound(Missing::Candidates));
    }
    let index = rng.random_range(0..pool.len());
    let item = pool
        .get(index)
        .ok_or(GameError::NotFound(Missing::Candidates))?;

    let amount_per_shipment = if item.category() == ItemCategory::Crafted {
        rng.random_range(1..=3)
    } else {
        rng.random_range(5..=10_u32.saturating_add(level))
    };
    let value = i64::from(item.max_price()).saturating_mul(i64::from(amount_per_shipment));
    let base_gold = (value / 4).max(1);
    let base_xp = (base_gold / 10).max(1);

    Ok(ExportContract {
        player_id,
        item_id: item.id,
        amount_per_shipment,
        base_gold,
        base_xp,
        shipments: 0,
        started_at: now,
        expires_at: add_secs(now, duration_secs),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmhand_types::ItemId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn contract(shipments: u32) -> ExportContract {
        let now = Utc::now();
        ExportContract {
            player_id: PlayerId(1),
            item_id: ItemId(101),
            amount_per_shipment: 8,
            base_gold: 50,
            base_xp: 7,
            shipments,
            started_at: now,
            expires_at: add_secs(now, DEFAULT_EXPORT_SECS),
        }
    }

    #[test]
    fn third_shipment_escalates() {
        let reward = next_shipment(&contract(2), Utc::now()).unwrap();
        assert_eq!(reward.number, 3);
        assert_eq!(reward.gold, 150);
        // floor(7 * 2.2) = 15
        assert_eq!(reward.xp, 15);
        assert!(reward.chest_due);
    }

    #[test]
    fn chests_only_at_milestones() {
        let due: Vec<u32> = (1..=MAX_SHIPMENTS)
            .filter(|n| shipment_reward(10, 10, *n).chest_due)
            .collect();
        assert_eq!(due, vec![3, 7, 10]);
    }

    #[test]
    fn fulfilled_after_last_shipment() {
        assert!(!is_fulfilled(&contract(MAX_SHIPMENTS - 1)));
        assert!(is_fulfilled(&contract(MAX_SHIPMENTS)));
    }

    #[test]
    fn capped_and_expiring() {
        assert_eq!(
            next_shipment(&contract(MAX_SHIPMENTS), Utc::now()),
            Err(GameError::AlreadyAtLimit(Limit::ExportShipments))
        );
        let late = add_secs(Utc::now(), DEFAULT_EXPORT_SECS.saturating_add(5));
        assert_eq!(
            next_shipment(&contract(0), late),
            Err(GameError::NotFound(Missing::Export))
        );
    }

    #[test]
    fn rewards_never_below_one() {
        let reward = shipment_reward(0, 0, 1);
        assert_eq!(reward.gold, 1);
        assert_eq!(reward.xp, 1);
    }

    #[test]
    fn generated_contract_uses_unlocked_goods() {
        let catalog = Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let now = Utc::now();
        for _ in 0..30 {
            let c = generate(&catalog, PlayerId(1), 4, DEFAULT_EXPORT_SECS, now, &mut rng).unwrap();
            let item = catalog.find_by_id(c.item_id).unwrap();
            assert!(item.level <= 4);
            assert!(c.base_gold >= 1 && c.base_xp >= 1);
            assert_eq!(c.shipments, 0);
            assert!(c.expires_at > now);
        }
    }
}
