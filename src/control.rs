use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

// Start/stop bookkeeping shared by every background loop in the crate. Each start opens a new epoch; a loop keeps
// going only while the control is running and still on the epoch it was started with. A loop body runs only while
// holding the turn, so a loop started right after a stop waits for its predecessor to finish whatever it was doing.
#[derive(Debug, Default)]
pub(crate) struct RunControl {
    running: AtomicBool,
    epoch:   AtomicU64,
    turn:    Mutex<()>,
}

impl RunControl {
    /// Returns the epoch for a new loop, or `None` if one is already running.
    pub(crate) fn begin(&self) -> Option<u64> {
        if self.running.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(self.epoch.fetch_add(1, Ordering::AcqRel) + 1)
    }

    #[inline]
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::Acquire) && self.epoch.load(Ordering::Acquire) == epoch
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns `true` if this call actually stopped a running loop.
    pub(crate) fn halt(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if was_running {
            // Retire the epoch so the old loop can't pass `is_current` again even after a quick restart.
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
        was_running
    }

    /// Wait until no other loop body runs and keep it that way while the guard lives. Loops hold the turn for their
    /// whole lifetime; `close()` paths take it to wait for a stopped loop to exit.
    pub(crate) async fn turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }
}
