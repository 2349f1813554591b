use crate::utils::{Cadence, ShutdownFlag, temporary_path, write_atomically};
use std::fs;
use tempfile::TempDir;
use std::time::Duration;
use tokio::time::Instant;

#[test]
fn cadence_fires_on_period() {
    let mut cadence = Cadence::new(3);
    let fired = (0..9).map(|_| cadence.tick()).collect::<Vec<_>>();
    assert_eq!(
        fired,
        vec![false, false, true, false, false, true, false, false, true]
    );
}

#[test]
fn cadence_zero_period_fires_every_tick() {
    let mut cadence = Cadence::new(0);
    assert!(cadence.tick());
    assert!(cadence.tick());
}

#[tokio::test(start_paused = true)]
async fn sleep_ticks_completes() {
    let shutdown = ShutdownFlag::default();
    let start = Instant::now();
    assert!(shutdown.sleep_ticks(5).await);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn sleep_ticks_observes_shutdown_within_a_tick() {
    let shutdown = ShutdownFlag::default();
    let start = Instant::now();

    let sleeper = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.sleep_ticks(60).await }
    });

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    shutdown.shut_down();

    assert!(!sleeper.await.unwrap());
    assert!(start.elapsed() <= Duration::from_secs(3));
}

#[test]
fn atomic_write_replaces_contents() {
    let directory = TempDir::new().unwrap();
    let path = directory.path().join("keys.bin");

    write_atomically(&path, b"first").unwrap();
    write_atomically(&path, b"second").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"second");
    assert_eq!(
        temporary_path(&path),
        directory.path().join("keys.bin.tmp")
    );
    assert!(!temporary_path(&path).exists());
}
