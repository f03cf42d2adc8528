/*!
 * Semaphore Waitable
 *
 * Counting grant bounded by a maximum. Signaled while the count is above
 * zero; each claim takes one unit, releases saturate at the maximum.
 */

use super::SyncObject;
use crate::core::errors::{WaitError, WaitResult};
use crate::core::limits::MAX_SEMAPHORE_COUNT;
use crate::core::sync::wait::{WaitOutcome, WaitRegistry, Waitable, WaitableHeader, WaitableKind};
use parking_lot::Mutex as StateLock;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use tracing::trace;

pub struct Semaphore {
    header: WaitableHeader,
    registry: Arc<WaitRegistry>,
    max: usize,
    count: StateLock<usize>,
}

impl Semaphore {
    /// Create with `initial` available units out of `max`
    pub fn new(registry: &Arc<WaitRegistry>, initial: usize, max: usize) -> WaitResult<Arc<Self>> {
        if max == 0 || max > MAX_SEMAPHORE_COUNT {
            return Err(WaitError::InvalidConfig(format!(
                "semaphore maximum must be within 1..={MAX_SEMAPHORE_COUNT}, got {max}"
            )));
        }
        if initial > max {
            return Err(WaitError::InvalidConfig(format!(
                "semaphore initial count {initial} exceeds maximum {max}"
            )));
        }

        Ok(Arc::new_cyclic(|this| Self {
            header: WaitableHeader::new(WaitableKind::Semaphore, registry.id(), this),
            registry: registry.clone(),
            max,
            count: StateLock::new(initial),
        }))
    }

    /// Take one unit, blocking up to `timeout`
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        matches!(self.wait(timeout), Ok(WaitOutcome::Index(_)))
    }

    pub fn try_acquire(&self) -> bool {
        self.acquire(Some(Duration::ZERO))
    }

    /// Return `units` to the semaphore and release waiters
    ///
    /// The count saturates at the maximum; units beyond it are dropped.
    /// Returns the count before the release.
    pub fn release(&self, units: usize) -> usize {
        self.registry.transition(|signaler| {
            let (previous, current) = {
                let mut count = self.count.lock();
                let previous = *count;
                *count = previous.saturating_add(units).min(self.max);
                (previous, *count)
            };

            if current > previous {
                let woken = signaler.signal(self);
                trace!(
                    semaphore = %self.header.id(),
                    previous,
                    woken = woken.count(),
                    "semaphore released"
                );
            }
            previous
        })
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Waitable for Semaphore {
    fn header(&self) -> &WaitableHeader {
        &self.header
    }

    fn check_signaled(&self, _ctx: ThreadId) -> bool {
        *self.count.lock() > 0
    }

    fn request_ownership(&self, _ctx: ThreadId) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    fn can_signal_multiple(&self) -> bool {
        true
    }

    fn notify_released(&self, _count: usize) {}
}

impl SyncObject for Semaphore {
    fn registry(&self) -> &WaitRegistry {
        &self.registry
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        self.registry.forget(self.header.id());
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("id", &self.header.id())
            .field("count", &self.count())
            .field("max", &self.max)
            .finish()
    }
}
