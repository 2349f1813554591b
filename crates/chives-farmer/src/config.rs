//! Farmer configuration and its persistence


use crate::utils::write_atomically;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};
use thiserror::Error;

/// Default number of wallet key indices checked when searching for reward target keys
pub const DEFAULT_WALLET_KEY_SEARCH_DEPTH: u32 = 500;

const fn default_wallet_key_search_depth() -> u32 {
    DEFAULT_WALLET_KEY_SEARCH_DEPTH
}

/// Errors happening when loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error occurred
    #[error("Config I/O error: {0}")]
    Io(#[from] io::Error),
    /// Configuration is not valid JSON or doesn't match expected structure
    #[error("Config serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Selected network has no entry in `networks`
    #[error("Selected network {0} is not configured")]
    UnknownNetwork(String),
}

/// Network specific settings
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human-readable prefix of addresses on this network
    pub address_prefix: String,
}

/// Farmer section
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FarmerConfig {
    /// Address farmer rewards are paid to
    pub xcc_target_address: String,
    /// Hex-encoded pool public keys harvesters should farm plots for
    #[serde(default)]
    pub pool_public_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_payout_address: Option<String>,
    /// How many wallet key indices to derive per key when looking for reward target keys
    #[serde(default = "default_wallet_key_search_depth")]
    pub wallet_key_search_depth: u32,
}

/// Pool section
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Address pool rewards are paid to
    pub xcc_target_address: String,
}

/// Whole configuration file
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub selected_network: String,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub farmer: FarmerConfig,
    pub pool: PoolConfig,
}

impl Config {
    /// Address prefix of the selected network
    pub fn address_prefix(&self) -> Result<&str, ConfigError> {
        self.networks
            .get(&self.selected_network)
            .map(|network| network.address_prefix.as_str())
            .ok_or_else(|| ConfigError::UnknownNetwork(self.selected_network.clone()))
    }
}

/// Durable storage of the configuration
pub trait ConfigStore: fmt::Debug + Send + Sync + 'static {
    fn load(&self) -> Result<Config, ConfigError>;

    fn save(&self, config: &Config) -> Result<(), ConfigError>;
}

/// Configuration stored as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub const FILE_NAME: &'static str = "config.json";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(config)?;
        write_atomically(&self.path, &bytes)?;
        Ok(())
    }
}
