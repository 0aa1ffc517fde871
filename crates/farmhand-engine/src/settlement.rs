//! Reward settlement: turn yields and experience into account changes.
//!
//! Settlement is computed here and applied by the caller in the same
//! transaction as the ledger mutation that produced the yields.

use std::collections::BTreeMap;

use farmhand_catalog::Catalog;
use farmhand_types::{ItemId, PlayerAccount};

use crate::levels;

/// Account and inventory changes of one economic action.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Settlement {
    /// Inventory credits by item id.
    pub items: BTreeMap<ItemId, u32>,
    /// Experience gained.
    pub xp: u64,
    /// Gold gained.
    pub gold: i64,
    /// Level before settling.
    pub old_level: u32,
    /// Level after settling.
    pub new_level: u32,
    /// Gems granted for level-ups, one per level gained.
    pub gems_bonus: i64,
    /// Items that unlock exactly at the new level.
    pub unlocked: Vec<ItemId>,
}

impl Settlement {
    /// Whether the player gained at least one level.
    pub const fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }

    /// Apply the currency and experience part to an account.
    ///
    /// Inventory credits are applied separately by the store.
    pub fn apply(&self, account: &mut PlayerAccount) {
        account.xp = account
            .xp
            .saturating_add(i64::try_from(self.xp).unwrap_or(i64::MAX));
        account.gold = account.gold.saturating_add(self.gold);
        account.gems = account.gems.saturating_add(self.gems_bonus);
    }
}

/// Compute the settlement of `items`, `xp`, and `gold` for an account.
pub fn settle(
    account: &PlayerAccount,
    items: BTreeMap<ItemId, u32>,
    xp: u64,
    gold: i64,
    catalog: &Catalog,
) -> Settlement {
    let old_level = levels::level_for_xp(account.xp);
    let new_xp = account
        .xp
        .saturating_add(i64::try_from(xp).unwrap_or(i64::MAX));
    let new_level = levels::level_for_xp(new_xp);

    let gained = new_level.saturating_sub(old_level);
    let unlocked = if gained > 0 {
        catalog
            .unlocked_at(new_level)
            .into_iter()
            .map(|item| item.id)
            .collect()
    } else {
        Vec::new()
    };

    Settlement {
        items: items.into_iter().filter(|(_, amount)| *amount > 0).collect(),
        xp,
        gold,
        old_level,
        new_level,
        gems_bonus: i64::from(gained),
        unlocked,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use farmhand_types::PlayerId;

    use super::*;

    fn account(xp: i64) -> PlayerAccount {
        PlayerAccount {
            player_id: PlayerId(1),
            gold: 100,
            gems: 0,
            xp,
            farm_slots: 6,
            factory_slots: 3,
            factory_level: 0,
            store_slots: 2,
            notifications: false,
            channel_id: None,
            registered_at: Utc::now(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap()
    }

    #[test]
    fn no_level_change() {
        let catalog = catalog();
        let s = settle(&account(0), BTreeMap::from([(ItemId(101), 4)]), 40, 0, &catalog);
        assert!(!s.leveled_up());
        assert_eq!(s.gems_bonus, 0);
        assert!(s.unlocked.is_empty());
    }

    #[test]
    fn multi_level_jump_grants_one_gem_per_level() {
        let catalog = catalog();
        let mut acc = account(0);
        // 0 xp is level 1; 450 xp is level 4.
        let s = settle(&acc, BTreeMap::new(), 450, 25, &catalog);
        assert_eq!(s.old_level, 1);
        assert_eq!(s.new_level, 4);
        assert_eq!(s.gems_bonus, 3);
        assert_eq!(s.unlocked, vec![ItemId(20), ItemId(200)]);

        s.apply(&mut acc);
        assert_eq!(acc.xp, 450);
        assert_eq!(acc.gold, 125);
        assert_eq!(acc.gems, 3);
    }

    #[test]
    fn zero_lines_are_dropped() {
        let catalog = catalog();
        let s = settle(
            &account(0),
            BTreeMap::from([(ItemId(101), 0), (ItemId(102), 2)]),
            0,
            0,
            &catalog,
        );
        assert_eq!(s.items, BTreeMap::from([(ItemId(102), 2)]));
    }
}
