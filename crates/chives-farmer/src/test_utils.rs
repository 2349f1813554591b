use crate::config::{
    Config, DEFAULT_WALLET_KEY_SEARCH_DEPTH, FarmerConfig, JsonConfigStore, NetworkConfig,
    PoolConfig,
};
use crate::harvester::{NodeType, Peer};
use crate::keychain::MasterKey;
use crate::pool::pool_client::PoolClient;
use crate::protocol::{Bytes32, HarvesterMessage, PoolInfo, SubmitPartial, SubmitPartialResponse};
use crate::utils::bech32m::{encode_puzzle_hash, parse_prefix};
use anyhow::anyhow;
use async_trait::async_trait;
use bech32::Hrp;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub(crate) const ADDRESS_PREFIX: &str = "xcc";

pub(crate) fn master_key(byte: u8) -> MasterKey {
    MasterKey::from_entropy(&[byte; 32]).unwrap()
}

pub(crate) fn address_prefix() -> Hrp {
    parse_prefix(ADDRESS_PREFIX).unwrap()
}

pub(crate) fn address(puzzle_hash: &Bytes32) -> String {
    encode_puzzle_hash(puzzle_hash, address_prefix())
}

pub(crate) fn config(farmer_target: &Bytes32, pool_target: &Bytes32) -> Config {
    Config {
        selected_network: "mainnet".to_string(),
        networks: BTreeMap::from([(
            "mainnet".to_string(),
            NetworkConfig {
                address_prefix: ADDRESS_PREFIX.to_string(),
            },
        )]),
        farmer: FarmerConfig {
            xcc_target_address: address(farmer_target),
            pool_public_keys: Vec::new(),
            pool_url: None,
            pool_payout_address: None,
            wallet_key_search_depth: DEFAULT_WALLET_KEY_SEARCH_DEPTH,
        },
        pool: PoolConfig {
            xcc_target_address: address(pool_target),
        },
    }
}

/// Writes configuration into a fresh temporary directory
pub(crate) fn config_store(config: &Config) -> (TempDir, Arc<JsonConfigStore>) {
    let directory = TempDir::new().unwrap();
    let store = JsonConfigStore::new(directory.path().join(JsonConfigStore::FILE_NAME));
    crate::config::ConfigStore::save(&store, config).unwrap();
    (directory, Arc::new(store))
}

pub(crate) fn pool_info(target_puzzle_hash: &Bytes32) -> PoolInfo {
    PoolInfo {
        name: "Test pool".to_string(),
        var_diff_target_in_seconds: 60,
        minimum_difficulty: 5,
        target_puzzle_hash: format!("0x{target_puzzle_hash}"),
    }
}

/// Pool that fails the first `failures` pool info requests and accepts every partial
#[derive(Debug)]
pub(crate) struct MockPoolClient {
    pool_info: PoolInfo,
    failures_left: AtomicUsize,
    pub(crate) pool_info_requests: AtomicUsize,
    pub(crate) current_difficulty: u64,
    pub(crate) submitted_partials: Mutex<Vec<SubmitPartial>>,
}

impl MockPoolClient {
    pub(crate) fn new(pool_info: PoolInfo, failures: usize) -> Self {
        Self {
            pool_info,
            failures_left: AtomicUsize::new(failures),
            pool_info_requests: AtomicUsize::new(0),
            current_difficulty: 7,
            submitted_partials: Mutex::default(),
        }
    }
}

#[async_trait]
impl PoolClient for MockPoolClient {
    async fn pool_info(&self) -> anyhow::Result<PoolInfo> {
        self.pool_info_requests.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures_left| {
                failures_left.checked_sub(1)
            })
            .is_ok();
        if failed {
            return Err(anyhow!("Pool is unavailable"));
        }

        Ok(self.pool_info.clone())
    }

    async fn submit_partial(
        &self,
        submit_partial: &SubmitPartial,
    ) -> anyhow::Result<SubmitPartialResponse> {
        self.submitted_partials.lock().push(submit_partial.clone());

        Ok(SubmitPartialResponse {
            current_difficulty: self.current_difficulty,
        })
    }
}

/// Peer recording every message sent to it
pub(crate) struct MockPeer {
    node_type: NodeType,
    pub(crate) sent: Mutex<Vec<HarvesterMessage>>,
}

impl MockPeer {
    pub(crate) fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            sent: Mutex::default(),
        }
    }
}

#[async_trait]
impl Peer for MockPeer {
    fn node_type(&self) -> NodeType {
        self.node_type
    }

    fn peer_info(&self) -> String {
        format!("mock {:?}", self.node_type)
    }

    async fn send_message(&self, message: HarvesterMessage) -> anyhow::Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }
}
