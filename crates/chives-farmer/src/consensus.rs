//! Consensus constants the farmer depends on

/// Subset of consensus constants used by the farmer
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ConsensusConstants {
    /// Target duration of one sub slot in seconds
    pub sub_slot_time_target: u64,
    /// Number of signage points in a sub slot
    pub num_sps_sub_slot: u64,
    /// Sub slot iterations assumed when checking proofs of space for pool partials
    pub pool_sub_slot_iters: u64,
}

impl Default for ConsensusConstants {
    fn default() -> Self {
        Self {
            sub_slot_time_target: 600,
            num_sps_sub_slot: 64,
            pool_sub_slot_iters: 37_600_000_000,
        }
    }
}

impl ConsensusConstants {
    /// Number of iterations between two signage points for given sub slot iterations
    pub fn sp_interval_iters(&self, sub_slot_iters: u64) -> u64 {
        sub_slot_iters / self.num_sps_sub_slot.max(1)
    }
}
