/*!
 * Event Waitable
 *
 * Broadcastable boolean. A manual-reset event stays signaled until
 * `reset` and releases every waiter it meets; an auto-reset event releases
 * exactly one waiter and then clears itself.
 */

use super::SyncObject;
use crate::core::sync::wait::{
    WaitOutcome, WaitRegistry, Waitable, WaitableHeader, WaitableKind, WakeResult,
};
use parking_lot::Mutex as StateLock;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct EventState {
    signaled: bool,
    /// Claims granted since the last set
    granted: usize,
}

pub struct Event {
    header: WaitableHeader,
    registry: Arc<WaitRegistry>,
    manual_reset: bool,
    state: StateLock<EventState>,
}

impl Event {
    pub fn new(registry: &Arc<WaitRegistry>, manual_reset: bool, initially_set: bool) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            header: WaitableHeader::new(WaitableKind::Event, registry.id(), this),
            registry: registry.clone(),
            manual_reset,
            state: StateLock::new(EventState {
                signaled: initially_set,
                granted: 0,
            }),
        })
    }

    pub fn manual(registry: &Arc<WaitRegistry>) -> Arc<Self> {
        Self::new(registry, true, false)
    }

    pub fn auto(registry: &Arc<WaitRegistry>) -> Arc<Self> {
        Self::new(registry, false, false)
    }

    /// Signal the event and release the waiters it now satisfies
    pub fn set(&self) -> WakeResult {
        self.registry.transition(|signaler| {
            {
                let mut state = self.state.lock();
                state.signaled = true;
                state.granted = 0;
            }
            let woken = signaler.signal(self);
            trace!(event = %self.header.id(), woken = woken.count(), "event set");
            woken
        })
    }

    pub fn reset(&self) {
        self.registry.transition(|_| {
            let mut state = self.state.lock();
            state.signaled = false;
            state.granted = 0;
        });
    }

    /// Release whoever is waiting right now, then leave the event unsignaled
    pub fn pulse(&self) -> WakeResult {
        self.registry.transition(|signaler| {
            {
                let mut state = self.state.lock();
                state.signaled = true;
                state.granted = 0;
            }
            let woken = signaler.signal(self);
            let mut state = self.state.lock();
            state.signaled = false;
            state.granted = 0;
            woken
        })
    }

    pub fn is_set(&self) -> bool {
        self.state.lock().signaled
    }

    /// Wait for the event; `true` if it was signaled within `timeout`
    pub fn wait_signaled(&self, timeout: Option<Duration>) -> bool {
        matches!(self.wait(timeout), Ok(WaitOutcome::Index(_)))
    }

    #[inline]
    fn available(&self, state: &EventState) -> bool {
        state.signaled && (self.manual_reset || state.granted == 0)
    }
}

impl Waitable for Event {
    fn header(&self) -> &WaitableHeader {
        &self.header
    }

    fn check_signaled(&self, _ctx: ThreadId) -> bool {
        self.available(&self.state.lock())
    }

    fn request_ownership(&self, _ctx: ThreadId) -> bool {
        let mut state = self.state.lock();
        if !self.available(&state) {
            return false;
        }
        state.granted = state.granted.saturating_add(1);
        true
    }

    fn can_signal_multiple(&self) -> bool {
        true
    }

    fn notify_released(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        if !self.manual_reset {
            state.signaled = false;
        }
        state.granted = 0;
    }
}

impl SyncObject for Event {
    fn registry(&self) -> &WaitRegistry {
        &self.registry
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        self.registry.forget(self.header.id());
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.header.id())
            .field("manual_reset", &self.manual_reset)
            .field("signaled", &self.is_set())
            .finish()
    }
}
