/*!
 * Waiter
 *
 * Per-call coordinator for one thread's blocking wait: the ordered target
 * list, the match condition, and a private mutex/condvar pair guarding the
 * outcome slot.
 *
 * # Lifecycle
 *
 * Created -> fast path checked -> (resolved | registered -> blocked ->
 * resolved) -> unregistered -> dropped. The outcome slot is write-once:
 * the first resolution wins and later attempts are ignored.
 *
 * # Locking
 *
 * The slot lock is the innermost lock. It is taken while the registry lock
 * (and possibly a waitable's lock) is held, never the other way around; the
 * blocked thread releases it inside the condvar wait.
 */

use super::outcome::{MatchCondition, WaitOutcome};
use super::traits::Waitable;
use crate::core::id::{WaitSessionId, WaitableId};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Instant;
use tracing::error;

pub(crate) struct Waiter {
    session: WaitSessionId,
    owner: ThreadId,
    condition: MatchCondition,
    /// Index-aligned with the caller's list; `None` marks a skipped entry
    targets: Vec<Option<Arc<dyn Waitable>>>,
    slot: Mutex<Option<WaitOutcome>>,
    wake: Condvar,
}

impl Waiter {
    pub(crate) fn new(targets: Vec<Option<Arc<dyn Waitable>>>, condition: MatchCondition) -> Self {
        Self {
            session: WaitSessionId::current(),
            owner: std::thread::current().id(),
            condition,
            targets,
            slot: Mutex::new(None),
            wake: Condvar::new(),
        }
    }

    #[inline]
    pub(crate) fn session(&self) -> WaitSessionId {
        self.session
    }

    #[inline]
    pub(crate) fn owner(&self) -> ThreadId {
        self.owner
    }

    #[inline]
    pub(crate) fn condition(&self) -> MatchCondition {
        self.condition
    }

    /// Live targets with their list index
    pub(crate) fn targets(&self) -> impl Iterator<Item = (usize, &Arc<dyn Waitable>)> + Clone {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(index, target)| target.as_ref().map(|t| (index, t)))
    }

    /// List index of `id`, if this waiter targets it
    pub(crate) fn index_of(&self, id: WaitableId) -> Option<usize> {
        self.targets().find(|(_, t)| t.id() == id).map(|(index, _)| index)
    }

    pub(crate) fn outcome(&self) -> Option<WaitOutcome> {
        *self.slot.lock()
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// First write wins; returns whether this call set the outcome
    pub(crate) fn resolve(&self, outcome: WaitOutcome) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.wake.notify_one();
        true
    }

    /// Block until resolved or `deadline` passes
    ///
    /// Re-checks the slot after every wake, so spurious wakeups are harmless.
    /// Returns whether the waiter is resolved.
    pub(crate) fn block(&self, deadline: Option<Instant>) -> bool {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut slot, deadline).timed_out() {
                        return slot.is_some();
                    }
                }
                None => self.wake.wait(&mut slot),
            }
        }
        true
    }

    /// All-or-nothing claim of every live target
    ///
    /// Claims are only attempted once every target reports signaled. Callers
    /// hold the registry lock, so nothing can change between the checks and
    /// the claims; the caller runs `notify_released` for the claimed objects.
    pub(crate) fn claim_all(&self) -> bool {
        let owner = self.owner;
        if !self.targets().all(|(_, t)| t.check_signaled(owner)) {
            return false;
        }

        for (index, target) in self.targets() {
            if !target.request_ownership(owner) {
                // Only reachable when an implementation's check and claim disagree
                error!(
                    waitable = %target.id(),
                    index,
                    "claim refused after signaled check during all-match claim"
                );
                debug_assert!(false, "inconsistent check_signaled/request_ownership");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_resolve_is_write_once() {
        let waiter = Waiter::new(Vec::new(), MatchCondition::AnyOne);
        assert!(!waiter.is_resolved());

        assert!(waiter.resolve(WaitOutcome::Index(1)));
        assert!(!waiter.resolve(WaitOutcome::Timeout));
        assert_eq!(waiter.outcome(), Some(WaitOutcome::Index(1)));
    }

    #[test]
    fn test_block_times_out_unresolved() {
        let waiter = Waiter::new(Vec::new(), MatchCondition::AnyOne);
        let start = Instant::now();

        assert!(!waiter.block(Some(start + Duration::from_millis(30))));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(waiter.outcome(), None);
    }

    #[test]
    fn test_block_wakes_on_resolve() {
        let waiter = Arc::new(Waiter::new(Vec::new(), MatchCondition::ExactAll));
        let resolver = waiter.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolver.resolve(WaitOutcome::All)
        });

        assert!(waiter.block(None));
        assert!(handle.join().unwrap());
        assert_eq!(waiter.outcome(), Some(WaitOutcome::All));
    }

    #[test]
    fn test_owner_and_session_follow_creating_thread() {
        let waiter = Waiter::new(Vec::new(), MatchCondition::AnyOne);
        assert_eq!(waiter.owner(), thread::current().id());
        assert_eq!(waiter.session(), WaitSessionId::current());
    }
}
