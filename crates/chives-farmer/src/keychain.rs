//! Master keys and keys derived from them

#[cfg(test)]
mod tests;

use crate::protocol::{Bytes32, PublicKey};
use crate::utils::write_atomically;
use parity_scale_codec::{Decode, Encode};
use schnorrkel::{ExpansionMode, Keypair, MiniSecretKey};
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};
use substrate_bip39::mini_secret_from_entropy;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

/// Entropy used for master key generation.
const ENTROPY_LENGTH: usize = 32;
const FARMER_DERIVATION_PATH: &[u8] = b"farmer";
const POOL_DERIVATION_PATH: &[u8] = b"pool";
const WALLET_DERIVATION_PATH: &[u8] = b"wallet";

#[derive(Debug, Default, Encode, Decode)]
struct KeysFileContents {
    entropies: Vec<Vec<u8>>,
}

/// Errors happening when loading or storing keys
#[derive(Debug, Error)]
pub enum KeychainError {
    /// I/O error occurred
    #[error("Keychain I/O error: {0}")]
    Io(#[from] io::Error),
    /// Invalid contents
    #[error("Invalid key entropy length {0}")]
    InvalidEntropyLength(usize),
    /// Decoding error
    #[error("Decoding error: {0}")]
    Decoding(#[from] parity_scale_codec::Error),
}

/// Root key all farmer, pool and wallet keys are derived from
#[derive(Clone)]
pub struct MasterKey {
    entropy: Zeroizing<Vec<u8>>,
    mini_secret: MiniSecretKey,
}

impl fmt::Debug for MasterKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("farmer_public_key", &self.farmer_public_key())
            .finish_non_exhaustive()
    }
}

impl MasterKey {
    pub fn from_entropy(entropy: &[u8]) -> Result<Self, KeychainError> {
        if entropy.len() != ENTROPY_LENGTH {
            return Err(KeychainError::InvalidEntropyLength(entropy.len()));
        }

        let mini_secret = mini_secret_from_entropy(entropy, "")
            .expect("32 bytes can always build a key; qed");

        Ok(Self {
            entropy: Zeroizing::new(entropy.to_vec()),
            mini_secret,
        })
    }

    /// Generate new random master key
    pub fn generate() -> Self {
        let entropy = Zeroizing::new(rand::random::<[u8; ENTROPY_LENGTH]>());
        Self::from_entropy(&entropy[..]).expect("Entropy has correct length; qed")
    }

    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }

    fn derive_keypair(&self, path: &[u8]) -> Keypair {
        let (mini_secret, _chain_code) = self
            .mini_secret
            .hard_derive_mini_secret_key(None, path, ExpansionMode::Ed25519);
        mini_secret.expand_to_keypair(ExpansionMode::Ed25519)
    }

    /// Key used to sign blocks and as the farmer's identity towards harvesters
    pub fn farmer_keypair(&self) -> Keypair {
        self.derive_keypair(FARMER_DERIVATION_PATH)
    }

    pub fn farmer_public_key(&self) -> PublicKey {
        PublicKey::from(self.farmer_keypair().public.to_bytes())
    }

    /// Key plots are farmed for when solo farming
    pub fn pool_keypair(&self) -> Keypair {
        self.derive_keypair(POOL_DERIVATION_PATH)
    }

    pub fn wallet_keypair(&self, index: u32) -> Keypair {
        let path = [WALLET_DERIVATION_PATH, &index.to_le_bytes()[..]].concat();
        self.derive_keypair(&path)
    }

    /// Puzzle hash of wallet key at `index`
    pub fn wallet_puzzle_hash(&self, index: u32) -> Bytes32 {
        puzzle_hash_for_public_key(&self.wallet_keypair(index).public)
    }
}

/// Puzzle hash paying to the given public key
pub fn puzzle_hash_for_public_key(public_key: &schnorrkel::PublicKey) -> Bytes32 {
    Bytes32::from(*blake3::hash(&public_key.to_bytes()).as_bytes())
}

/// Source of master keys available to the farmer
pub trait Keychain: fmt::Debug + Send + Sync + 'static {
    fn master_keys(&self) -> Vec<MasterKey>;
}

impl Keychain for Vec<MasterKey> {
    fn master_keys(&self) -> Vec<MasterKey> {
        self.clone()
    }
}

/// Keychain stored in a file in the base directory
#[derive(Debug)]
pub struct FileKeychain {
    path: PathBuf,
    master_keys: Vec<MasterKey>,
}

impl Keychain for FileKeychain {
    fn master_keys(&self) -> Vec<MasterKey> {
        self.master_keys.clone()
    }
}

impl FileKeychain {
    pub const FILE_NAME: &'static str = "keys.bin";

    /// Opens keychain in `base_directory`, missing file results in an empty keychain
    pub fn open<B: AsRef<Path>>(base_directory: B) -> Result<Self, KeychainError> {
        let path = base_directory.as_ref().join(Self::FILE_NAME);
        if !path.exists() {
            debug!(path = %path.display(), "Keys file not found");
            return Ok(Self {
                path,
                master_keys: Vec::new(),
            });
        }

        let bytes = Zeroizing::new(fs::read(&path)?);
        let KeysFileContents { entropies } = KeysFileContents::decode(&mut bytes.as_slice())?;
        let master_keys = entropies
            .into_iter()
            .map(|entropy| MasterKey::from_entropy(&Zeroizing::new(entropy)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(path = %path.display(), keys = %master_keys.len(), "Opened keys file");

        Ok(Self { path, master_keys })
    }

    /// Generates new master key and persists it alongside existing ones, keys file is replaced
    /// atomically
    pub fn generate_key(&mut self) -> Result<MasterKey, KeychainError> {
        let master_key = MasterKey::generate();
        self.master_keys.push(master_key.clone());

        let contents = KeysFileContents {
            entropies: self
                .master_keys
                .iter()
                .map(|master_key| master_key.entropy().to_vec())
                .collect(),
        };
        let encoded = Zeroizing::new(contents.encode());
        write_atomically(&self.path, encoded.as_slice())?;

        Ok(master_key)
    }
}
