//! Redis-compatible fast cache.
//!
//! The cache is never authoritative for balances or ledgers. It holds
//! short-lived copies and time-boxed state whose lifetime *is* the TTL.
//!
//! # Key Patterns
//!
//! | Pattern | Type | TTL | Description |
//! |---------|------|-----|-------------|
//! | `account:{player}` | JSON | 600 s | Read-through copy of the profile row |
//! | `cooldown:{player}:{action}` | String | cooldown | Present while the action is on cooldown |
//! | `export:{player}` | JSON | contract time left | Export contract, kept after the last shipment |
//! | `boosts:{player}` | JSON | longest boost left | Active boosts |
//! | `market:roll:{period}` | String | one period | Process that rolls prices this period |

use fred::prelude::*;
use fred::types::{Expiration, SetOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;

use farmhand_types::{ActiveBoost, ExportContract, PlayerAccount, PlayerId};

use crate::error::DbError;

/// Default lifetime of a cached account copy, in seconds.
pub const DEFAULT_ACCOUNT_TTL_SECS: u64 = 600;

/// Connection handle to a Redis-compatible cache.
#[derive(Clone)]
pub struct CachePool {
    client: Client,
    account_ttl_secs: u64,
}

impl std::fmt::Debug for CachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePool")
            .field("account_ttl_secs", &self.account_ttl_secs)
            .finish_non_exhaustive()
    }
}

fn account_key(player: PlayerId) -> String {
    format!("account:{player}")
}

fn cooldown_key(player: PlayerId, action: &str) -> String {
    format!("cooldown:{player}:{action}")
}

fn export_key(player: PlayerId) -> String {
    format!("export:{player}")
}

fn boosts_key(player: PlayerId) -> String {
    format!("boosts:{player}")
}

fn market_roll_key(period: u64) -> String {
    format!("market:roll:{period}")
}

fn expiration(ttl_secs: u64) -> Expiration {
    Expiration::EX(i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX))
}

impl CachePool {
    /// Connect to the cache at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Cache`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid cache URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to cache");
        Ok(Self {
            client,
            account_ttl_secs: DEFAULT_ACCOUNT_TTL_SECS,
        })
    }

    /// Set the lifetime of cached account copies.
    #[must_use]
    pub const fn with_account_ttl(mut self, secs: u64) -> Self {
        self.account_ttl_secs = secs;
        self
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the quit command fails.
    pub async fn close(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        Ok(())
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key` for `ttl_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Cache`] if the write fails.
    pub async fn set_json_ex<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self
            .client
            .set(key, json.as_str(), Some(expiration(ttl_secs)), None, false)
            .await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize from JSON.
    ///
    /// Returns `None` if the key does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Cache`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or(Ok(None), |s| Ok(Some(serde_json::from_str(&s)?)))
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    /// Seconds until `key` expires, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the read fails.
    pub async fn ttl_secs(&self, key: &str) -> Result<Option<u64>, DbError> {
        let ttl: i64 = self.client.ttl(key).await?;
        Ok(u64::try_from(ttl).ok())
    }

    // =========================================================================
    // Accounts -- account:{player}
    // =========================================================================

    /// Cached copy of an account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    pub async fn get_account(&self, player: PlayerId) -> Result<Option<PlayerAccount>, DbError> {
        self.get_json(&account_key(player)).await
    }

    /// Cache a copy of an account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn put_account(&self, account: &PlayerAccount) -> Result<(), DbError> {
        self.set_json_ex(&account_key(account.player_id), account, self.account_ttl_secs)
            .await
    }

    /// Drop the cached copy of an account. Called after every write.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the delete fails.
    pub async fn invalidate_account(&self, player: PlayerId) -> Result<(), DbError> {
        self.delete(&account_key(player)).await
    }

    // =========================================================================
    // Cooldowns -- cooldown:{player}:{action}
    // =========================================================================

    /// Put `action` on cooldown for `secs`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the write fails.
    pub async fn start_cooldown(&self, player: PlayerId, action: &str, secs: u64) -> Result<(), DbError> {
        let _: () = self
            .client
            .set(cooldown_key(player, action), "1", Some(expiration(secs)), None, false)
            .await?;
        Ok(())
    }

    /// Remaining cooldown of `action`, `None` if it is available.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the read fails.
    pub async fn cooldown_remaining(&self, player: PlayerId, action: &str) -> Result<Option<u64>, DbError> {
        let remaining = self.ttl_secs(&cooldown_key(player, action)).await?;
        Ok(remaining.filter(|secs| *secs > 0))
    }

    // =========================================================================
    // Market roll lease -- market:roll:{period}
    // =========================================================================

    /// Claim the right to roll market prices for `period`.
    ///
    /// Exactly one caller per period gets `true`; the key lapses after
    /// `ttl_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if the write fails.
    pub async fn claim_market_roll(&self, period: u64, holder: &str, ttl_secs: u64) -> Result<bool, DbError> {
        let reply: Option<String> = self
            .client
            .set(
                market_roll_key(period),
                holder,
                Some(expiration(ttl_secs)),
                Some(SetOptions::NX),
                false,
            )
            .await?;
        Ok(reply.is_some())
    }

    // =========================================================================
    // Export contracts -- export:{player}
    // =========================================================================

    /// The active export contract, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    pub async fn get_export(&self, player: PlayerId) -> Result<Option<ExportContract>, DbError> {
        self.get_json(&export_key(player)).await
    }

    /// Store an export contract until it expires.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn put_export(&self, contract: &ExportContract, ttl_secs: u64) -> Result<(), DbError> {
        self.set_json_ex(&export_key(contract.player_id), contract, ttl_secs)
            .await
    }

    // =========================================================================
    // Boosts -- boosts:{player}
    // =========================================================================

    /// Active boosts of a player; empty if none were stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    pub async fn get_boosts(&self, player: PlayerId) -> Result<Vec<ActiveBoost>, DbError> {
        Ok(self
            .get_json(&boosts_key(player))
            .await?
            .unwrap_or_default())
    }

    /// Store a player's boosts until the longest one expires.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn put_boosts(
        &self,
        player: PlayerId,
        boosts: &[ActiveBoost],
        ttl_secs: u64,
    ) -> Result<(), DbError> {
        self.set_json_ex(&boosts_key(player), &boosts, ttl_secs).await
    }

    /// Remove every cache key owned by a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cache`] if a delete fails.
    pub async fn purge_player(&self, player: PlayerId) -> Result<(), DbError> {
        self.delete(&account_key(player)).await?;
        self.delete(&export_key(player)).await?;
        self.delete(&boosts_key(player)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_patterns() {
        assert_eq!(account_key(PlayerId(7)), "account:7");
        assert_eq!(cooldown_key(PlayerId(7), "steal"), "cooldown:7:steal");
        assert_eq!(export_key(PlayerId(7)), "export:7");
        assert_eq!(boosts_key(PlayerId(7)), "boosts:7");
        assert_eq!(market_roll_key(493_112), "market:roll:493112");
    }

    #[test]
    fn expiration_is_at_least_one_second() {
        assert!(matches!(expiration(0), Expiration::EX(1)));
        assert!(matches!(expiration(600), Expiration::EX(600)));
    }
}
