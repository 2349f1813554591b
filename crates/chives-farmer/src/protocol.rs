//! Messages and data structures exchanged with the full node, harvesters and pools

use derive_more::{Deref, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte hash, used for challenges, signage points, quality strings and puzzle hashes
#[derive(
    Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, Into, Deref, Serialize, Deserialize,
)]
pub struct Bytes32(#[serde(with = "hex")] [u8; Bytes32::SIZE]);

impl fmt::Debug for Bytes32 {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for Bytes32 {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Bytes32 {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Bytes32 {
    /// Size in bytes
    pub const SIZE: usize = 32;

    /// Create from a slice, returns `None` unless the slice is exactly [`Self::SIZE`] bytes long
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; Self::SIZE]>::try_from(bytes).ok().map(Self)
    }
}

/// Identifies one signage point round, all signage point cache tables are keyed by it
pub type SignagePointKey = Bytes32;

/// Public key of the farmer, pool or plot
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, Into, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex")] [u8; PublicKey::SIZE]);

impl fmt::Debug for PublicKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for PublicKey {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PublicKey {
    /// Size in bytes
    pub const SIZE: usize = 32;

    /// Parse hex-encoded public key, optionally prefixed with `0x`
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        <[u8; Self::SIZE] as hex::FromHex>::from_hex(s).map(Self)
    }
}

/// New signage point announced by the full node
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewSignagePoint {
    pub challenge_hash: Bytes32,
    pub challenge_chain_sp: Bytes32,
    pub reward_chain_sp: Bytes32,
    pub difficulty: u64,
    pub sub_slot_iters: u64,
    pub signage_point_index: u8,
}

/// Proof of space produced by a harvester, opaque to the farmer apart from its challenge
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProofOfSpace {
    pub challenge: Bytes32,
    pub pool_public_key: Option<PublicKey>,
    pub plot_public_key: PublicKey,
    pub size: u8,
    #[serde(with = "hex")]
    pub proof: Vec<u8>,
}

/// Everything needed to ask a harvester for signatures without resending the proof of space
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct QualityIdentifiers {
    pub plot_identifier: String,
    pub challenge_hash: Bytes32,
    pub challenge_chain_sp_hash: Bytes32,
    pub reward_chain_sp_hash: Bytes32,
}

/// Handshake sent to every harvester right after it connects
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HarvesterHandshake {
    pub farmer_public_keys: Vec<PublicKey>,
    pub pool_public_keys: Vec<PublicKey>,
}

/// Messages the farmer sends to harvesters
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvesterMessage {
    HarvesterHandshake(HarvesterHandshake),
}

/// Response of the pool's info endpoint
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub name: String,
    pub var_diff_target_in_seconds: u64,
    pub minimum_difficulty: u64,
    /// `0x`-prefixed hex of the 32-byte puzzle hash rewards are paid to
    pub target_puzzle_hash: String,
}

/// Part of the partial that is covered by the aggregate signature
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PartialPayload {
    pub proof_of_space: ProofOfSpace,
    pub sp_hash: Bytes32,
    pub end_of_sub_slot: bool,
    /// The farmer can choose where to send the rewards, this can take a few minutes to apply
    pub payout_address: String,
}

/// Partial submitted to the pool
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmitPartial {
    pub payload: PartialPayload,
    /// Signature of the payload by plot key and pool key
    #[serde(with = "hex")]
    pub partial_aggregate_signature: Vec<u8>,
    pub difficulty: u64,
}

/// Pool's answer to an accepted partial
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmitPartialResponse {
    pub current_difficulty: u64,
}
