pub mod bech32m;
#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fs, io};

/// Granularity of all periodic farmer loops, also an upper bound on shutdown latency
pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Current wall-clock time as seconds since unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

/// Temporary file `path` is written to before being renamed into place
pub(crate) fn temporary_path(path: &Path) -> PathBuf {
    let mut temporary_path = OsString::from(path.as_os_str());
    temporary_path.push(".tmp");
    PathBuf::from(temporary_path)
}

/// Replace contents of the file at `path`, readers observe either old or new contents, never a
/// partially written file
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temporary_path = temporary_path(path);
    fs::write(&temporary_path, contents)?;
    fs::rename(&temporary_path, path)
}

/// Shutdown flag shared by the farmer and all of its background loops
#[derive(Debug, Default, Clone)]
pub(crate) struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub(crate) fn shut_down(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleeps for `ticks` one second ticks, returns `false` early if shutdown was requested
    pub(crate) async fn sleep_ticks(&self, ticks: u64) -> bool {
        for _ in 0..ticks {
            if self.is_shut_down() {
                return false;
            }
            tokio::time::sleep(TICK_INTERVAL).await;
        }

        !self.is_shut_down()
    }
}

/// Counts one second ticks and fires once every `period` of them, then starts over
#[derive(Debug)]
pub(crate) struct Cadence {
    elapsed: u64,
    period: u64,
}

impl Cadence {
    pub(crate) fn new(period: u64) -> Self {
        Self {
            elapsed: 0,
            period: period.max(1),
        }
    }

    /// Registers one more tick, returns `true` when the period was reached
    pub(crate) fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.period {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }
}
