/*!
 * Mutex Waitable
 *
 * Exclusive, recursive ownership keyed by thread. Signaled for a thread when
 * unowned or already owned by that thread; one signal grants at most one
 * claim.
 */

use super::SyncObject;
use crate::core::sync::wait::{WaitOutcome, WaitRegistry, Waitable, WaitableHeader, WaitableKind};
use parking_lot::Mutex as StateLock;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct MutexState {
    owner: Option<ThreadId>,
    recursion: u32,
}

impl MutexState {
    #[inline]
    fn available_to(&self, ctx: ThreadId) -> bool {
        match self.owner {
            None => true,
            Some(owner) => owner == ctx && self.recursion < u32::MAX,
        }
    }
}

pub struct Mutex {
    header: WaitableHeader,
    registry: Arc<WaitRegistry>,
    state: StateLock<MutexState>,
}

impl Mutex {
    pub fn new(registry: &Arc<WaitRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            header: WaitableHeader::new(WaitableKind::Mutex, registry.id(), this),
            registry: registry.clone(),
            state: StateLock::new(MutexState::default()),
        })
    }

    /// Acquire, blocking up to `timeout` (`None` = forever)
    ///
    /// Re-entrant: the owner may lock again and must unlock as many times.
    pub fn lock(&self, timeout: Option<Duration>) -> bool {
        matches!(self.wait(timeout), Ok(WaitOutcome::Index(_)))
    }

    pub fn try_lock(&self) -> bool {
        self.lock(Some(Duration::ZERO))
    }

    /// Release one level of ownership held by the calling thread
    ///
    /// Returns `false` if the caller does not own the mutex. The final
    /// release hands the mutex to the first eligible registered waiter.
    pub fn unlock(&self) -> bool {
        let me = thread::current().id();
        self.registry.transition(|signaler| {
            let freed = {
                let mut state = self.state.lock();
                if state.owner != Some(me) {
                    return false;
                }
                state.recursion -= 1;
                if state.recursion == 0 {
                    state.owner = None;
                    true
                } else {
                    false
                }
            };

            if freed {
                let woken = signaler.signal(self);
                trace!(mutex = %self.header.id(), woken = woken.count(), "mutex released");
            }
            true
        })
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.state.lock().owner
    }

    pub fn recursion(&self) -> u32 {
        self.state.lock().recursion
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

impl Waitable for Mutex {
    fn header(&self) -> &WaitableHeader {
        &self.header
    }

    fn check_signaled(&self, ctx: ThreadId) -> bool {
        self.state.lock().available_to(ctx)
    }

    fn request_ownership(&self, ctx: ThreadId) -> bool {
        let mut state = self.state.lock();
        if !state.available_to(ctx) {
            return false;
        }
        state.owner = Some(ctx);
        state.recursion += 1;
        true
    }

    fn can_signal_multiple(&self) -> bool {
        false
    }

    fn notify_released(&self, _count: usize) {}
}

impl SyncObject for Mutex {
    fn registry(&self) -> &WaitRegistry {
        &self.registry
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        self.registry.forget(self.header.id());
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mutex")
            .field("id", &self.header.id())
            .field("owner", &state.owner)
            .field("recursion", &state.recursion)
            .finish()
    }
}
