//! Master key management commands.

use chives_farmer::config::{ConfigStore, JsonConfigStore};
use chives_farmer::keychain::FileKeychain;
use chives_farmer::utils::bech32m::{encode_puzzle_hash, parse_prefix};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Generates new master key, prints its public keys and first wallet address
pub(crate) fn generate(base_path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(base_path)?;

    let mut keychain = FileKeychain::open(base_path)?;
    let master_key = keychain.generate_key()?;

    info!(
        farmer_public_key = %hex::encode(master_key.farmer_public_key()),
        pool_public_key = %hex::encode(master_key.pool_keypair().public.to_bytes()),
        "Generated new master key"
    );

    let config_store = JsonConfigStore::new(base_path.join(JsonConfigStore::FILE_NAME));
    match config_store.load() {
        Ok(config) => {
            let address = encode_puzzle_hash(
                &master_key.wallet_puzzle_hash(0),
                parse_prefix(config.address_prefix()?)?,
            );
            info!(%address, "First wallet address");
        }
        Err(error) => {
            warn!(%error, "Config not available, wallet address is not shown");
        }
    }

    Ok(())
}
