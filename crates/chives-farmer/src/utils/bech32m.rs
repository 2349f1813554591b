//! Puzzle hash addresses, bech32m encoded under the network's address prefix

use crate::protocol::Bytes32;
use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::primitives::hrp;
use bech32::{Bech32m, Hrp};
use thiserror::Error;

/// An error type for puzzle hash address decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Bech32mError {
    /// Address prefix is not a valid bech32 human-readable part
    #[error("Invalid address prefix: {0}")]
    InvalidPrefix(#[from] hrp::Error),
    /// String is not a valid bech32m string
    #[error("Invalid bech32m string: {0}")]
    Decoding(#[from] CheckedHrpstringError),
    /// Address belongs to a different network
    #[error("Address prefix {actual} doesn't match network prefix {expected}")]
    WrongPrefix { expected: String, actual: String },
}

/// Parse address prefix of a network
pub fn parse_prefix(prefix: &str) -> Result<Hrp, Bech32mError> {
    Ok(Hrp::parse(prefix)?)
}

/// Encode puzzle hash as an address with the network's `prefix`
pub fn encode_puzzle_hash(puzzle_hash: &Bytes32, prefix: Hrp) -> String {
    bech32::encode::<Bech32m>(prefix, puzzle_hash.as_ref())
        .expect("Puzzle hash under any valid prefix fits into bech32m code length; qed")
}

/// Decode address into its raw bytes, length is not checked here since callers report wrong
/// length as an error of their own.
///
/// Prefix comparison is case-insensitive, as is the rest of bech32m.
pub fn decode_puzzle_hash(address: &str, prefix: Hrp) -> Result<Vec<u8>, Bech32mError> {
    let checked = CheckedHrpstring::new::<Bech32m>(address)?;
    if checked.hrp() != prefix {
        return Err(Bech32mError::WrongPrefix {
            expected: prefix.to_lowercase(),
            actual: checked.hrp().to_lowercase(),
        });
    }

    Ok(checked.byte_iter().collect())
}
