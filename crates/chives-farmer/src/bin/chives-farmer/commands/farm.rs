//! Farm command, runs the farmer until shutdown signal is received.

use crate::commands::shutdown_signal;
use anyhow::anyhow;
use chives_farmer::config::{ConfigStore, JsonConfigStore};
use chives_farmer::consensus::ConsensusConstants;
use chives_farmer::keychain::FileKeychain;
use chives_farmer::{Farmer, FarmerOptions};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Options for running a farmer
#[derive(Debug, Parser)]
pub(crate) struct FarmOptions {
    /// Directory with `config.json` and `keys.bin`
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    base_path: PathBuf,
}

pub(crate) async fn farm(farm_options: FarmOptions) -> anyhow::Result<()> {
    let signal = shutdown_signal();

    let FarmOptions { base_path } = farm_options;

    let config_store = JsonConfigStore::new(base_path.join(JsonConfigStore::FILE_NAME));
    let config = config_store.load().map_err(|error| {
        anyhow!(
            "Failed to load config from {}: {error}",
            config_store.path().display()
        )
    })?;
    let keychain = FileKeychain::open(&base_path)?;

    let farmer = Farmer::new(FarmerOptions {
        config,
        config_store: Arc::new(config_store),
        keychain: Arc::new(keychain),
        constants: ConsensusConstants::default(),
        pool_client: None,
    })?;

    info!(
        public_keys = %farmer.public_keys().len(),
        pooling = %farmer.is_pooling_enabled(),
        "Farmer started"
    );

    farmer.start();

    signal.await;

    farmer.close();
    farmer.await_closed().await;

    info!("Farmer stopped");

    Ok(())
}
