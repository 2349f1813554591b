//! Farmer and pool reward targets, kept in sync with persisted configuration

#[cfg(test)]
mod tests;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::keychain::Keychain;
use crate::protocol::Bytes32;
use crate::utils::bech32m::{Bech32mError, decode_puzzle_hash, encode_puzzle_hash, parse_prefix};
use bech32::Hrp;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Reason address could not be turned into a puzzle hash
#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error(transparent)]
    Bech32m(#[from] Bech32mError),
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Puzzle hash must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Errors happening when reading or updating reward targets
#[derive(Debug, Error)]
pub enum RewardTargetError {
    /// Address doesn't decode into a 32-byte puzzle hash
    #[error("Invalid address {address}: {error}")]
    InvalidAddress {
        address: String,
        #[source]
        error: AddressError,
    },
    /// Configuration could not be read or written
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Address prefix of the selected network is not usable
    #[error("Invalid address prefix {prefix}: {error}")]
    InvalidPrefix {
        prefix: String,
        #[source]
        error: Bech32mError,
    },
}

/// Decode address of the network with `prefix`, enforcing puzzle hash length
pub fn decode_address(address: &str, prefix: Hrp) -> Result<Bytes32, RewardTargetError> {
    let invalid_address = |error: AddressError| RewardTargetError::InvalidAddress {
        address: address.to_string(),
        error,
    };
    let bytes =
        decode_puzzle_hash(address, prefix).map_err(|error| invalid_address(error.into()))?;
    Bytes32::try_from_slice(&bytes).ok_or_else(|| {
        invalid_address(AddressError::WrongLength {
            expected: Bytes32::SIZE,
            actual: bytes.len(),
        })
    })
}

/// Reward targets in both decoded and encoded forms
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RewardTargets {
    pub farmer_target: Bytes32,
    pub farmer_target_encoded: String,
    pub pool_target: Bytes32,
    pub pool_target_encoded: String,
    /// Target the pool expects pool rewards to be paid to, equals `pool_target` when not pooling
    pub pool_reward_target: Bytes32,
}

/// Reward targets as reported to the UI
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RewardTargetsInfo {
    pub farmer_target: String,
    pub pool_target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub have_farmer_sk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub have_pool_sk: Option<bool>,
}

/// Owns reward targets, every change is persisted to configuration
#[derive(Debug)]
pub struct RewardTargetManager {
    targets: Mutex<RewardTargets>,
    update_lock: Mutex<()>,
    address_prefix: Hrp,
    wallet_key_search_depth: u32,
    keychain: Arc<dyn Keychain>,
    config_store: Arc<dyn ConfigStore>,
}

impl RewardTargetManager {
    /// Create new instance, fails if configured addresses are not valid puzzle hash addresses of
    /// the selected network
    pub fn new(
        config: &Config,
        keychain: Arc<dyn Keychain>,
        config_store: Arc<dyn ConfigStore>,
    ) -> Result<Self, RewardTargetError> {
        let prefix = config.address_prefix()?;
        let address_prefix =
            parse_prefix(prefix).map_err(|error| RewardTargetError::InvalidPrefix {
                prefix: prefix.to_string(),
                error,
            })?;
        let farmer_target = decode_address(&config.farmer.xcc_target_address, address_prefix)?;
        let pool_target = decode_address(&config.pool.xcc_target_address, address_prefix)?;

        Ok(Self {
            targets: Mutex::new(RewardTargets {
                farmer_target,
                farmer_target_encoded: encode_puzzle_hash(&farmer_target, address_prefix),
                pool_target,
                pool_target_encoded: encode_puzzle_hash(&pool_target, address_prefix),
                pool_reward_target: pool_target,
            }),
            update_lock: Mutex::default(),
            address_prefix,
            wallet_key_search_depth: config.farmer.wallet_key_search_depth,
            keychain,
            config_store,
        })
    }

    /// Address prefix of the active network
    pub fn address_prefix(&self) -> Hrp {
        self.address_prefix
    }

    /// Encode puzzle hash for the active network
    pub fn encode(&self, puzzle_hash: &Bytes32) -> String {
        encode_puzzle_hash(puzzle_hash, self.address_prefix)
    }

    /// Snapshot of current targets
    pub fn targets(&self) -> RewardTargets {
        self.targets.lock().clone()
    }

    pub fn farmer_target(&self) -> Bytes32 {
        self.targets.lock().farmer_target
    }

    pub fn pool_target(&self) -> Bytes32 {
        self.targets.lock().pool_target
    }

    pub fn pool_target_encoded(&self) -> String {
        self.targets.lock().pool_target_encoded.clone()
    }

    pub fn pool_reward_target(&self) -> Bytes32 {
        self.targets.lock().pool_reward_target
    }

    pub(crate) fn set_pool_reward_target(&self, pool_reward_target: Bytes32) {
        self.targets.lock().pool_reward_target = pool_reward_target;
    }

    /// Current encoded targets, optionally checking whether they belong to local keys.
    ///
    /// Searching derives wallet puzzle hashes for every index up to the configured search depth
    /// of every master key until both targets are found, which might be slow.
    pub fn reward_targets(&self, search_for_private_key: bool) -> RewardTargetsInfo {
        let targets = self.targets();

        let (have_farmer_sk, have_pool_sk) = if search_for_private_key {
            let (have_farmer_sk, have_pool_sk) =
                self.search_private_keys(&targets.farmer_target, &targets.pool_target);
            (Some(have_farmer_sk), Some(have_pool_sk))
        } else {
            (None, None)
        };

        RewardTargetsInfo {
            farmer_target: targets.farmer_target_encoded,
            pool_target: targets.pool_target_encoded,
            have_farmer_sk,
            have_pool_sk,
        }
    }

    fn search_private_keys(&self, farmer_target: &Bytes32, pool_target: &Bytes32) -> (bool, bool) {
        let master_keys = self.keychain.master_keys();
        let mut found_farmer = false;
        let mut found_pool = false;

        for index in 0..self.wallet_key_search_depth {
            if found_farmer && found_pool {
                break;
            }
            for master_key in &master_keys {
                let puzzle_hash = master_key.wallet_puzzle_hash(index);
                if puzzle_hash == *farmer_target {
                    found_farmer = true;
                }
                if puzzle_hash == *pool_target {
                    found_pool = true;
                }
            }
        }

        debug!(%found_farmer, %found_pool, "Searched local keys for reward targets");

        (found_farmer, found_pool)
    }

    /// Update provided targets and persist both farmer and pool sections of configuration in a
    /// single write.
    ///
    /// Addresses must belong to the active network, they are stored re-encoded in canonical
    /// lower case form. Nothing is changed if any of the addresses is invalid or configuration
    /// can't be written.
    pub fn set_reward_targets(
        &self,
        farmer_target_encoded: Option<&str>,
        pool_target_encoded: Option<&str>,
    ) -> Result<(), RewardTargetError> {
        let decode = |address: &str| {
            decode_address(address, self.address_prefix)
                .map(|target| (self.encode(&target), target))
        };
        let farmer_target = farmer_target_encoded.map(decode).transpose()?;
        let pool_target = pool_target_encoded.map(decode).transpose()?;

        // Held across load and save, concurrent updates are applied one after another
        let _update_guard = self.update_lock.lock();
        let mut config = self.config_store.load()?;
        if let Some((address, _)) = &farmer_target {
            config.farmer.xcc_target_address = address.clone();
        }
        if let Some((address, _)) = &pool_target {
            config.pool.xcc_target_address = address.clone();
        }
        self.config_store.save(&config)?;

        let mut targets = self.targets.lock();
        if let Some((address, target)) = farmer_target {
            info!(%address, "Farmer reward target updated");
            targets.farmer_target = target;
            targets.farmer_target_encoded = address;
        }
        if let Some((address, target)) = pool_target {
            info!(%address, "Pool reward target updated");
            targets.pool_target = target;
            targets.pool_target_encoded = address;
        }

        Ok(())
    }
}
