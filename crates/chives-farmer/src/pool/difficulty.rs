//! Pool difficulty feedback loop

use crate::pool::PoolState;
use crate::utils::{Cadence, ShutdownFlag, unix_timestamp};
use std::sync::Arc;
use tracing::{debug, info};

/// Difficulty is checked once per this many ticks
pub(crate) const DIFFICULTY_CHECK_INTERVAL_TICKS: u64 = 60;
/// How much difficulty is lowered for every missed partial
const DIFFICULTY_DECREASE_PER_MISSED_PARTIAL: u64 = 2;

/// Difficulty change applied by the feedback loop
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DifficultyAdjustment {
    pub old_difficulty: u64,
    pub new_difficulty: u64,
    /// Seconds since last accepted partial
    pub elapsed: u64,
}

/// Difficulty after `elapsed` seconds without accepted partials.
///
/// Every full `var_diff_target_in_seconds` without a partial counts as a missed partial and lowers
/// difficulty by 2, but never below `minimum_difficulty`. Returns `None` when difficulty stays the
/// same; difficulty is never raised here.
pub fn adjusted_difficulty(
    difficulty: u64,
    minimum_difficulty: u64,
    var_diff_target_in_seconds: u64,
    elapsed: u64,
) -> Option<u64> {
    if elapsed < var_diff_target_in_seconds {
        return None;
    }

    let missed_partials = elapsed.checked_div(var_diff_target_in_seconds)?;
    let new_difficulty = difficulty
        .saturating_sub(missed_partials.saturating_mul(DIFFICULTY_DECREASE_PER_MISSED_PARTIAL))
        .max(minimum_difficulty);

    (new_difficulty < difficulty).then_some(new_difficulty)
}

/// Checks every [`DIFFICULTY_CHECK_INTERVAL_TICKS`] ticks whether difficulty needs to be lowered
pub(crate) async fn adjust_pool_difficulty(pool_state: Arc<PoolState>, shutdown: ShutdownFlag) {
    let mut check = Cadence::new(DIFFICULTY_CHECK_INTERVAL_TICKS);

    while shutdown.sleep_ticks(1).await {
        if !check.tick() {
            continue;
        }

        if let Some(adjustment) = pool_state.lower_difficulty(unix_timestamp()) {
            info!(
                old_difficulty = %adjustment.old_difficulty,
                new_difficulty = %adjustment.new_difficulty,
                seconds_since_last_partial = %adjustment.elapsed,
                "Lowered pool difficulty due to no partial submits"
            );
        }
    }

    debug!("Pool difficulty adjustment stopped");
}
