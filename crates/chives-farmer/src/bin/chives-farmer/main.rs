//! Chives farmer implementation.

mod commands;

use crate::commands::{Command, KeysCommand, set_exit_on_panic};
use chives_logging::init_logger;
use clap::Parser;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    set_exit_on_panic();
    init_logger();

    info!("Chives Farmer");
    info!("version {}", env!("CARGO_PKG_VERSION"));

    let command = Command::parse();

    match command {
        Command::Farm(farm_options) => {
            commands::farm::farm(farm_options).await?;
        }
        Command::Keys(KeysCommand::Generate { base_path }) => {
            commands::keys::generate(&base_path)?;
        }
    }
    Ok(())
}
