//! Market sales at the current snapshot price.

use farmhand_catalog::ItemDefinition;
use farmhand_types::ItemId;

use crate::checks;
use crate::error::{GameError, Resource};

/// A priced sale of inventory to the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SaleQuote {
    /// Item sold.
    pub item_id: ItemId,
    /// Units sold.
    pub amount: u32,
    /// Price per unit at quote time.
    pub unit_price: u32,
    /// Gold to credit.
    pub gold: i64,
}

/// Price selling `amount` units of `item` while holding `held`.
pub fn quote_sale(item: &ItemDefinition, amount: u32, held: u32) -> Result<SaleQuote, GameError> {
    let unit_price = item.gold_reward().ok_or(GameError::WrongItem {
        item: item.id,
        reason: "the market does not buy this item",
    })?;
    checks::ensure(Resource::Item(item.id), u64::from(amount), u64::from(held))?;
    Ok(SaleQuote {
        item_id: item.id,
        amount,
        unit_price,
        gold: i64::from(unit_price).saturating_mul(i64::from(amount)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmhand_catalog::Catalog;

    use super::*;

    #[test]
    fn sale_uses_current_price() {
        let catalog = Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap();
        let lettuce = catalog.find_by_id(ItemId(101)).unwrap();
        let price = lettuce.gold_reward().unwrap();
        let quote = quote_sale(lettuce, 3, 5).unwrap();
        assert_eq!(quote.gold, i64::from(price).saturating_mul(3));
        assert!(quote_sale(lettuce, 6, 5).is_err());

        let seeds = catalog.find_by_id(ItemId(1)).unwrap();
        assert!(matches!(
            quote_sale(seeds, 1, 5),
            Err(GameError::WrongItem { .. })
        ));
    }
}
