//! Keeps configured pool target in line with the target assigned by the pool

use crate::reward_targets::{RewardTargetError, RewardTargetManager};
use crate::utils::{Cadence, ShutdownFlag};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, info};

/// Pool reward target is checked once per this many ticks
pub(crate) const RECONCILIATION_INTERVAL_TICKS: u64 = 5 * 60;

/// Re-applies pool reward target if configured pool target drifted from it.
///
/// Returns `true` if pool target was updated.
pub fn reconcile_pool_reward_target(
    reward_target_manager: &RewardTargetManager,
) -> Result<bool, RewardTargetError> {
    let targets = reward_target_manager.targets();
    if targets.pool_target == targets.pool_reward_target {
        return Ok(false);
    }

    let pool_target_encoded = reward_target_manager.encode(&targets.pool_reward_target);
    reward_target_manager.set_reward_targets(None, Some(&pool_target_encoded))?;

    info!(%pool_target_encoded, "Pool target reset to pool reward target");

    Ok(true)
}

/// Reconciles pool target every [`RECONCILIATION_INTERVAL_TICKS`] ticks on the blocking thread
/// pool, failures are retried on the next check
pub(crate) async fn reconcile_pool_reward_target_periodically(
    reward_target_manager: Arc<RewardTargetManager>,
    shutdown: ShutdownFlag,
) {
    let mut check = Cadence::new(RECONCILIATION_INTERVAL_TICKS);

    while shutdown.sleep_ticks(1).await {
        if !check.tick() {
            continue;
        }

        let reconcile_result = task::spawn_blocking({
            let reward_target_manager = Arc::clone(&reward_target_manager);

            move || reconcile_pool_reward_target(&reward_target_manager)
        })
        .await;

        match reconcile_result {
            Ok(Ok(_updated)) => {}
            Ok(Err(error)) => {
                error!(%error, "Failed to reconcile pool reward target");
            }
            Err(error) => {
                error!(%error, "Pool reward target reconciliation panicked");
            }
        }
    }

    debug!("Pool reward target reconciliation stopped");
}
