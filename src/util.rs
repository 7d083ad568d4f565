//! Small shared helpers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Cooperative stop signal shared with driver capture threads.
///
/// Clones share state. Capture loops call [`StopSignal::sleep`] between
/// frames so a pending pacing sleep is cut short the moment the session
/// stops.
#[derive(Debug, Clone)]
pub struct StopSignal {
    shared: Arc<SharedState>,
}

#[derive(Debug)]
struct SharedState {
    stopping: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> StopSignal {
        StopSignal {
            shared: Arc::new(SharedState {
                stopping: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Request stop and wake every sleeping thread.
    pub fn cancel(&self) {
        self.shared.stopping.store(true, Ordering::Relaxed);
        let _guard = self.shared.mutex.lock();
        self.shared.condvar.notify_all();
    }

    pub fn cancelled(&self) -> bool {
        self.shared.stopping.load(Ordering::Relaxed)
    }

    /// Sleep up to `timeout`, returning early if cancelled. Returns true
    /// when the signal fired.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let mut guard = self.shared.mutex.lock();
        if self.cancelled() {
            return true;
        }
        self.shared.condvar.wait_for(&mut guard, timeout);
        self.cancelled()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_across_clones() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.cancelled());
        signal.cancel();
        assert!(clone.cancelled());
    }

    #[test]
    fn test_sleep_cut_short_by_cancel() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        let handle = std::thread::spawn(move || {
            let started = std::time::Instant::now();
            let fired = clone.sleep(Duration::from_secs(10));
            (fired, started.elapsed())
        });
        std::thread::sleep(Duration::from_millis(20));
        signal.cancel();
        let (fired, elapsed) = handle.join().unwrap();
        assert!(fired);
        assert!(elapsed < Duration::from_secs(5));
    }
}
