//! One-time initialization against the pool's info endpoint

use crate::pool::PoolState;
use crate::pool::pool_client::PoolClient;
use crate::protocol::{Bytes32, PoolInfo};
use crate::reward_targets::{AddressError, RewardTargetError, RewardTargetManager};
use crate::utils::ShutdownFlag;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, info};

/// Ticks to wait before retrying failed pool info request
pub(crate) const RETRY_INTERVAL_TICKS: u64 = 5;
/// Length of the `0x` prefix of pool's target puzzle hash
const TARGET_PUZZLE_HASH_PREFIX_LENGTH: usize = 2;

/// Decode `0x`-prefixed hex puzzle hash pool wants rewards to be paid to
pub fn decode_target_puzzle_hash(target_puzzle_hash: &str) -> Result<Bytes32, RewardTargetError> {
    let invalid_address = |error: AddressError| RewardTargetError::InvalidAddress {
        address: target_puzzle_hash.to_string(),
        error,
    };
    let hex_part = target_puzzle_hash
        .get(TARGET_PUZZLE_HASH_PREFIX_LENGTH..)
        .unwrap_or_default();
    let bytes = hex::decode(hex_part).map_err(|error| invalid_address(error.into()))?;

    Bytes32::try_from_slice(&bytes).ok_or_else(|| {
        invalid_address(AddressError::WrongLength {
            expected: Bytes32::SIZE,
            actual: bytes.len(),
        })
    })
}

/// Requests pool info until it succeeds, waiting [`RETRY_INTERVAL_TICKS`] between attempts.
///
/// Returns `None` if shutdown was requested before pool info was received.
pub(crate) async fn fetch_pool_info(
    pool_client: &dyn PoolClient,
    shutdown: &ShutdownFlag,
) -> Option<PoolInfo> {
    while !shutdown.is_shut_down() {
        match pool_client.pool_info().await {
            Ok(pool_info) => {
                return Some(pool_info);
            }
            Err(error) => {
                error!(%error, "Error retrieving pool info");

                if !shutdown.sleep_ticks(RETRY_INTERVAL_TICKS).await {
                    break;
                }
            }
        }
    }

    None
}

/// Seeds pool state and pool reward target from pool info.
///
/// Difficulty parameters are applied even when target puzzle hash turns out to be invalid, in
/// which case reward targets are left untouched.
pub(crate) fn apply_pool_info(
    pool_info: &PoolInfo,
    pool_state: &PoolState,
    reward_target_manager: &RewardTargetManager,
) -> Result<(), RewardTargetError> {
    info!(pool_name = %pool_info.name, "Connected to pool");

    pool_state.set_pool_parameters(
        pool_info.minimum_difficulty,
        pool_info.var_diff_target_in_seconds,
    );

    let pool_reward_target = decode_target_puzzle_hash(&pool_info.target_puzzle_hash)?;
    reward_target_manager.set_pool_reward_target(pool_reward_target);

    let pool_target_encoded = reward_target_manager.encode(&pool_reward_target);
    let targets = reward_target_manager.targets();
    if targets.pool_target != pool_reward_target
        || targets.pool_target_encoded != pool_target_encoded
    {
        reward_target_manager.set_reward_targets(None, Some(&pool_target_encoded))?;
    }

    Ok(())
}

/// Fetches pool info and applies it, returns `false` if shutdown was requested in the meantime.
///
/// Applying pool info may write configuration to disk, so it runs on the blocking thread pool.
pub(crate) async fn initialize_pooling(
    pool_client: &dyn PoolClient,
    pool_state: &Arc<PoolState>,
    reward_target_manager: &Arc<RewardTargetManager>,
    shutdown: &ShutdownFlag,
) -> bool {
    let Some(pool_info) = fetch_pool_info(pool_client, shutdown).await else {
        debug!("Shut down before pool info was received");
        return false;
    };

    let pool_state = Arc::clone(pool_state);
    let reward_target_manager = Arc::clone(reward_target_manager);
    let apply_result = task::spawn_blocking(move || {
        apply_pool_info(&pool_info, &pool_state, &reward_target_manager)
    })
    .await;

    match apply_result {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            error!(%error, "Failed to apply pool reward target");
        }
        Err(error) => {
            error!(%error, "Applying pool info panicked");
        }
    }

    true
}
