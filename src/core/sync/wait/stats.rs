/*!
 * Wait Statistics
 *
 * Relaxed atomic counters; snapshots are approximate under contention.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a registry's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitStats {
    /// Waits that passed validation
    pub waits: u64,
    /// Waits resolved without blocking
    pub fast_path: u64,
    /// Waits that had to block
    pub blocked: u64,
    pub timeouts: u64,
    /// Waits resolved through `interrupt`
    pub interrupts: u64,
    /// Waits resolved because a target was failed or removed
    pub teardown_wakes: u64,
    /// Waiters released by `signal`
    pub signal_releases: u64,
}

#[derive(Default)]
pub(crate) struct WaitCounters {
    waits: AtomicU64,
    fast_path: AtomicU64,
    blocked: AtomicU64,
    timeouts: AtomicU64,
    interrupts: AtomicU64,
    teardown_wakes: AtomicU64,
    signal_releases: AtomicU64,
}

macro_rules! bump {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self, n: u64) {
                self.$name.fetch_add(n, Ordering::Relaxed);
            }
        )*
    };
}

impl WaitCounters {
    bump!(
        waits,
        fast_path,
        blocked,
        timeouts,
        interrupts,
        teardown_wakes,
        signal_releases,
    );

    pub(crate) fn snapshot(&self) -> WaitStats {
        WaitStats {
            waits: self.waits.load(Ordering::Relaxed),
            fast_path: self.fast_path.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
            teardown_wakes: self.teardown_wakes.load(Ordering::Relaxed),
            signal_releases: self.signal_releases.load(Ordering::Relaxed),
        }
    }
}
