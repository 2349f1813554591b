//! Farmer subcommands.

pub(crate) mod farm;
pub(crate) mod keys;

use crate::commands::farm::FarmOptions;
use clap::{Parser, Subcommand, ValueHint};
use std::panic;
use std::path::PathBuf;
use std::process::exit;
use tokio::signal;

/// Commands for working with a farmer.
#[derive(Debug, Parser)]
#[clap(about, version)]
pub(crate) enum Command {
    /// Run farmer until interrupted
    Farm(FarmOptions),
    /// Manage master keys
    #[clap(subcommand)]
    Keys(KeysCommand),
}

#[derive(Debug, Subcommand)]
pub(crate) enum KeysCommand {
    /// Generate new master key and add it to the keys file
    Generate {
        /// Directory with `config.json` and `keys.bin`
        #[arg(long, value_hint = ValueHint::DirPath)]
        base_path: PathBuf,
    },
}

/// Install a panic handler which exits on panics, rather than unwinding. Unwinding can hang the
/// tokio runtime waiting for stuck tasks or threads.
pub(crate) fn set_exit_on_panic() {
    let default_panic_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        default_panic_hook(panic_info);
        exit(1);
    }));
}

#[cfg(unix)]
pub(crate) async fn shutdown_signal() {
    use futures::FutureExt;
    use std::pin::pin;

    futures::future::select(
        pin!(
            signal::unix::signal(signal::unix::SignalKind::interrupt())
                .expect("Setting signal handlers must never fail")
                .recv()
                .map(|_| {
                    tracing::info!("Received SIGINT, shutting down farmer...");
                }),
        ),
        pin!(
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Setting signal handlers must never fail")
                .recv()
                .map(|_| {
                    tracing::info!("Received SIGTERM, shutting down farmer...");
                }),
        ),
    )
    .await;
}

#[cfg(not(unix))]
pub(crate) async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Setting signal handlers must never fail");

    tracing::info!("Received Ctrl+C, shutting down farmer...");
}
