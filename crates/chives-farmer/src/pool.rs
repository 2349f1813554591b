//! OG pooling support.
//!
//! When both pool URL and payout address are configured, the farmer fetches pool parameters once
//! at startup (see [`bootstrap`]) and then runs two periodic loops: one that lowers submission
//! difficulty when partials stop being accepted ([`difficulty`]) and one that keeps the pool
//! reward target in sync with what the pool expects ([`reward_reconciliation`]).

pub mod bootstrap;
pub mod difficulty;
pub mod pool_client;
pub mod reward_reconciliation;

use crate::pool::difficulty::{DifficultyAdjustment, adjusted_difficulty};
use parking_lot::Mutex;
use thiserror::Error;

/// Difficulty used until the pool tells otherwise
pub const DEFAULT_MINIMUM_DIFFICULTY: u64 = 1;
/// Expected interval between accepted partials until the pool tells otherwise
pub const DEFAULT_VAR_DIFF_TARGET_IN_SECONDS: u64 = 5 * 60;

/// Errors happening when talking to the pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pooling is not configured
    #[error("Pooling is not configured, pool_url and pool_payout_address are required")]
    NotConfigured,
    /// HTTP client could not be created
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    /// Request to the pool failed
    #[error("Pool request failed: {0}")]
    Request(#[from] anyhow::Error),
}

/// Submission difficulty and time of the last partial accepted by the pool
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OgPoolState {
    pub difficulty: u64,
    /// Unix timestamp in seconds
    pub last_partial_submit_timestamp: u64,
}

#[derive(Debug)]
struct PoolStateInner {
    og_pool_state: OgPoolState,
    minimum_difficulty: u64,
    var_diff_target_in_seconds: u64,
}

/// Pool parameters learned from the pool together with [`OgPoolState`]
#[derive(Debug)]
pub struct PoolState {
    inner: Mutex<PoolStateInner>,
}

impl PoolState {
    /// Create state with default parameters, `now` counts as the time of the last partial
    pub fn new(now: u64) -> Self {
        Self {
            inner: Mutex::new(PoolStateInner {
                og_pool_state: OgPoolState {
                    difficulty: DEFAULT_MINIMUM_DIFFICULTY,
                    last_partial_submit_timestamp: now,
                },
                minimum_difficulty: DEFAULT_MINIMUM_DIFFICULTY,
                var_diff_target_in_seconds: DEFAULT_VAR_DIFF_TARGET_IN_SECONDS,
            }),
        }
    }

    pub fn og_pool_state(&self) -> OgPoolState {
        self.inner.lock().og_pool_state
    }

    pub fn minimum_difficulty(&self) -> u64 {
        self.inner.lock().minimum_difficulty
    }

    pub fn var_diff_target_in_seconds(&self) -> u64 {
        self.inner.lock().var_diff_target_in_seconds
    }

    /// Apply parameters received from the pool, difficulty starts over from the minimum
    pub(crate) fn set_pool_parameters(
        &self,
        minimum_difficulty: u64,
        var_diff_target_in_seconds: u64,
    ) {
        let mut inner = self.inner.lock();
        inner.minimum_difficulty = minimum_difficulty;
        inner.var_diff_target_in_seconds = var_diff_target_in_seconds;
        inner.og_pool_state.difficulty = minimum_difficulty;
    }

    /// Record partial accepted by the pool together with difficulty the pool asked for
    pub fn record_accepted_partial(&self, new_difficulty: u64, timestamp: u64) {
        let mut inner = self.inner.lock();
        inner.og_pool_state.difficulty = new_difficulty;
        inner.og_pool_state.last_partial_submit_timestamp = timestamp;
    }

    /// Lower difficulty if no partial was accepted for too long, returns applied adjustment
    pub(crate) fn lower_difficulty(&self, now: u64) -> Option<DifficultyAdjustment> {
        let mut inner = self.inner.lock();
        let elapsed = now.saturating_sub(inner.og_pool_state.last_partial_submit_timestamp);
        let old_difficulty = inner.og_pool_state.difficulty;
        let new_difficulty = adjusted_difficulty(
            old_difficulty,
            inner.minimum_difficulty,
            inner.var_diff_target_in_seconds,
            elapsed,
        )?;
        inner.og_pool_state.difficulty = new_difficulty;

        Some(DifficultyAdjustment {
            old_difficulty,
            new_difficulty,
            elapsed,
        })
    }
}
