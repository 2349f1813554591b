//! Farmer orchestrator.
//!
//! [`Farmer`] owns the signage point cache, harvester coordination, reward targets and pool state,
//! and runs background tasks maintaining them. Message handlers of the networking layer work with
//! the farmer exclusively through its public methods.


use crate::config::{Config, ConfigStore};
use crate::consensus::ConsensusConstants;
use crate::harvester::{HandlerFn, HarvesterCoordinator, Peer, StateChange, StateChangeNotifier};
use crate::keychain::Keychain;
use crate::pool::bootstrap::initialize_pooling;
use crate::pool::difficulty::adjust_pool_difficulty;
use crate::pool::pool_client::{HttpPoolClient, PoolClient};
use crate::pool::reward_reconciliation::reconcile_pool_reward_target_periodically;
use crate::pool::{OgPoolState, PoolError, PoolState};
use crate::protocol::{PartialPayload, PublicKey, SubmitPartial, SubmitPartialResponse};
use crate::reward_targets::{RewardTargetError, RewardTargetManager, RewardTargetsInfo};
use crate::signage_point_cache::{SignagePointCache, clear_cache_and_refresh};
use crate::utils::{ShutdownFlag, unix_timestamp};
use event_listener_primitives::HandlerId;
use parking_lot::Mutex;
use schnorrkel::Keypair;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors happening during farmer construction
#[derive(Debug, Error)]
pub enum FarmerError {
    /// Keychain has no keys
    #[error("No keys exist, generate keys with `chives-farmer keys generate` first")]
    NoKeys,
    /// Reward target is invalid or configuration can't be accessed
    #[error("Reward target error: {0}")]
    RewardTarget(#[from] RewardTargetError),
    /// Configured pool public key is not valid hex of correct length
    #[error("Invalid pool public key {public_key}: {error}")]
    InvalidPoolPublicKey {
        public_key: String,
        #[source]
        error: hex::FromHexError,
    },
    /// Pool client could not be created
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Everything needed to create a [`Farmer`]
#[derive(Debug)]
pub struct FarmerOptions {
    pub config: Config,
    pub config_store: Arc<dyn ConfigStore>,
    pub keychain: Arc<dyn Keychain>,
    pub constants: ConsensusConstants,
    /// Client of the configured pool, HTTP client for `pool_url` is created if not provided
    pub pool_client: Option<Arc<dyn PoolClient>>,
}

/// Pool the farmer submits partials to
#[derive(Debug)]
struct Pooling {
    client: Arc<dyn PoolClient>,
    payout_address: String,
}

pub struct Farmer {
    constants: ConsensusConstants,
    signage_point_cache: Arc<SignagePointCache>,
    state_change_notifier: Arc<StateChangeNotifier>,
    harvester_coordinator: HarvesterCoordinator,
    reward_target_manager: Arc<RewardTargetManager>,
    pool_state: Arc<PoolState>,
    pooling: Option<Pooling>,
    public_keys: Vec<PublicKey>,
    pool_public_keys: Vec<PublicKey>,
    keypairs: HashMap<PublicKey, Keypair>,
    iters_limit: u64,
    shutdown: ShutdownFlag,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for Farmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Farmer")
            .field("public_keys", &self.public_keys)
            .field("pool_public_keys", &self.pool_public_keys)
            .field("pooling", &self.pooling)
            .field("iters_limit", &self.iters_limit)
            .finish_non_exhaustive()
    }
}

impl Farmer {
    /// Create new farmer, no background tasks are started until [`Self::start`] is called
    pub fn new(options: FarmerOptions) -> Result<Self, FarmerError> {
        let FarmerOptions {
            config,
            config_store,
            keychain,
            constants,
            pool_client,
        } = options;

        let master_keys = keychain.master_keys();
        if master_keys.is_empty() {
            return Err(FarmerError::NoKeys);
        }

        // Farmer keys of all master keys followed by their pool keys
        let keypairs_list = master_keys
            .iter()
            .map(|master_key| master_key.farmer_keypair())
            .chain(master_keys.iter().map(|master_key| master_key.pool_keypair()))
            .collect::<Vec<_>>();
        let public_keys = keypairs_list
            .iter()
            .map(|keypair| PublicKey::from(keypair.public.to_bytes()))
            .collect::<Vec<_>>();
        let keypairs = public_keys
            .iter()
            .copied()
            .zip(keypairs_list)
            .collect::<HashMap<_, _>>();

        let pool_public_keys = config
            .farmer
            .pool_public_keys
            .iter()
            .map(|public_key| {
                PublicKey::from_hex(public_key).map_err(|error| {
                    FarmerError::InvalidPoolPublicKey {
                        public_key: public_key.clone(),
                        error,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reward_target_manager = Arc::new(RewardTargetManager::new(
            &config,
            keychain,
            config_store,
        )?);

        let pooling = match (&config.farmer.pool_url, &config.farmer.pool_payout_address) {
            (Some(pool_url), Some(payout_address)) => {
                let client = match pool_client {
                    Some(client) => client,
                    None => Arc::new(HttpPoolClient::new(pool_url)?),
                };

                Some(Pooling {
                    client,
                    payout_address: payout_address.clone(),
                })
            }
            _ => None,
        };

        let state_change_notifier = Arc::new(StateChangeNotifier::default());
        let harvester_coordinator = HarvesterCoordinator::new(
            public_keys.clone(),
            pool_public_keys.clone(),
            Arc::clone(&state_change_notifier),
        );

        Ok(Self {
            constants,
            signage_point_cache: Arc::default(),
            state_change_notifier,
            harvester_coordinator,
            reward_target_manager,
            pool_state: Arc::new(PoolState::new(unix_timestamp())),
            pooling,
            public_keys,
            pool_public_keys,
            keypairs,
            iters_limit: constants.sp_interval_iters(constants.pool_sub_slot_iters),
            shutdown: ShutdownFlag::default(),
            tasks: Mutex::default(),
        })
    }

    /// Start background tasks: signage point cache maintenance and, when enabled, pooling
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            warn!("Farmer is already started");
            return;
        }

        tasks.push(tokio::spawn(clear_cache_and_refresh(
            Arc::clone(&self.signage_point_cache),
            Arc::clone(&self.state_change_notifier),
            self.constants.sub_slot_time_target,
            self.shutdown.clone(),
        )));

        let Some(pooling) = &self.pooling else {
            info!("Not pooling as `pool_payout_address` and/or `pool_url` are missing in config");
            return;
        };

        let pool_client = Arc::clone(&pooling.client);
        let pool_state = Arc::clone(&self.pool_state);
        let reward_target_manager = Arc::clone(&self.reward_target_manager);
        let shutdown = self.shutdown.clone();

        tasks.push(tokio::spawn(async move {
            if !initialize_pooling(&*pool_client, &pool_state, &reward_target_manager, &shutdown)
                .await
            {
                return;
            }

            futures::join!(
                adjust_pool_difficulty(pool_state, shutdown.clone()),
                reconcile_pool_reward_target_periodically(reward_target_manager, shutdown)
            );
        }));
    }

    /// Request background tasks to stop, they stop within one tick
    pub fn close(&self) {
        self.shutdown.shut_down();
    }

    /// Wait for all background tasks to stop
    pub async fn await_closed(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());

        for task in tasks {
            if let Err(error) = task.await {
                error!(%error, "Farmer background task failed");
            }
        }
    }

    pub fn constants(&self) -> &ConsensusConstants {
        &self.constants
    }

    pub fn signage_point_cache(&self) -> &Arc<SignagePointCache> {
        &self.signage_point_cache
    }

    pub fn reward_target_manager(&self) -> &Arc<RewardTargetManager> {
        &self.reward_target_manager
    }

    /// Notify about new connection and send handshake if the peer is a harvester
    pub async fn on_connect(&self, peer: &dyn Peer) -> anyhow::Result<()> {
        self.harvester_coordinator.on_connect(peer).await
    }

    pub fn on_disconnect(&self, peer: &dyn Peer) {
        self.harvester_coordinator.on_disconnect(peer);
    }

    /// Subscribe to state changes, handler is removed once returned [`HandlerId`] is dropped
    pub fn on_state_change(&self, callback: HandlerFn<StateChange>) -> HandlerId {
        self.state_change_notifier.on_state_change(callback)
    }

    /// Public keys of farmer and pool keys derived from every master key
    pub fn public_keys(&self) -> &[PublicKey] {
        &self.public_keys
    }

    /// Configured pool public keys plots may be farmed for
    pub fn pool_public_keys(&self) -> &[PublicKey] {
        &self.pool_public_keys
    }

    /// Signing keypair for one of [`Self::public_keys`]
    pub fn pool_keypair(&self, public_key: &PublicKey) -> Option<&Keypair> {
        self.keypairs.get(public_key)
    }

    /// Reward targets, see [`RewardTargetManager::reward_targets`]
    pub fn reward_targets(&self, search_for_private_key: bool) -> RewardTargetsInfo {
        self.reward_target_manager.reward_targets(search_for_private_key)
    }

    /// Update and persist reward targets, see [`RewardTargetManager::set_reward_targets`]
    pub fn set_reward_targets(
        &self,
        farmer_target_encoded: Option<&str>,
        pool_target_encoded: Option<&str>,
    ) -> Result<(), RewardTargetError> {
        self.reward_target_manager
            .set_reward_targets(farmer_target_encoded, pool_target_encoded)
    }

    pub fn og_pool_state(&self) -> OgPoolState {
        self.pool_state.og_pool_state()
    }

    pub fn pool_minimum_difficulty(&self) -> u64 {
        self.pool_state.minimum_difficulty()
    }

    /// Record partial accepted by the pool along with difficulty the pool expects from now on
    pub fn record_accepted_partial(&self, new_difficulty: u64, timestamp: u64) {
        self.pool_state.record_accepted_partial(new_difficulty, timestamp);
    }

    pub fn is_pooling_enabled(&self) -> bool {
        self.pooling.is_some()
    }

    /// Address pool rewards of partials are paid to when pooling
    pub fn pool_payout_address(&self) -> Option<&str> {
        self.pooling
            .as_ref()
            .map(|pooling| pooling.payout_address.as_str())
    }

    /// Maximum number of iterations a proof of space may require to qualify as a partial
    pub fn iters_limit(&self) -> u64 {
        self.iters_limit
    }

    /// Submit partial at current difficulty, accepted partial updates pool state
    pub async fn submit_partial(
        &self,
        payload: PartialPayload,
        partial_aggregate_signature: Vec<u8>,
    ) -> Result<SubmitPartialResponse, PoolError> {
        let pooling = self.pooling.as_ref().ok_or(PoolError::NotConfigured)?;

        let submit_partial = SubmitPartial {
            payload,
            partial_aggregate_signature,
            difficulty: self.pool_state.og_pool_state().difficulty,
        };
        let response = pooling.client.submit_partial(&submit_partial).await?;

        self.pool_state
            .record_accepted_partial(response.current_difficulty, unix_timestamp());

        Ok(response)
    }
}
