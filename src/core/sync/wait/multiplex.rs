/*!
 * Multi-Object Wait
 *
 * `wait_for_single` / `wait_for_multiple`: block the calling thread until
 * one (`AnyOne`) or all (`ExactAll`) of a heterogeneous set of waitables
 * can be claimed, the timeout elapses, the wait is interrupted, or a target
 * is torn down.
 *
 * # Algorithm
 *
 * 1. Validate the list and take owning handles to every target.
 * 2. Under the registry lock, register and run the fast path. `AnyOne`
 *    registers and probes candidates in list order and stops at the first
 *    claim, so ties resolve to the lowest index. `ExactAll` registers every
 *    target, then claims all of them only if all are signaled.
 * 3. If unresolved, publish the session and block on the waiter's condvar.
 * 4. Cleanup takes the registry lock again, commits `Timeout` only if no
 *    other resolution landed, and unregisters everything. It runs from a
 *    scope guard so early returns and unwinding still unregister.
 */

use super::outcome::{MatchCondition, WaitOutcome};
use super::registry::{RegistryState, WaitRegistry};
use super::traits::Waitable;
use super::waiter::Waiter;
use crate::core::errors::{WaitError, WaitResult};
use crate::core::id::WaitableId;
use crate::monitoring::WaitSpan;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

impl WaitRegistry {
    /// Wait on one object
    ///
    /// `timeout` of `None` waits forever; `Some(Duration::ZERO)` only polls.
    pub fn wait_for_single(
        &self,
        waitable: &dyn Waitable,
        timeout: Option<Duration>,
    ) -> WaitResult<WaitOutcome> {
        let targets = self.resolve_targets(std::slice::from_ref(&waitable))?;
        self.run(Waiter::new(targets, MatchCondition::AnyOne), timeout)
    }

    /// Wait on a list of objects with the given match condition
    ///
    /// # Examples
    ///
    /// ```
    /// use multiwait::core::sync::{Event, MatchCondition, Semaphore, WaitOutcome, WaitRegistry};
    /// use std::time::Duration;
    ///
    /// let registry = WaitRegistry::with_defaults();
    /// let shutdown = Event::new(&registry, true, false);
    /// let inbound = Semaphore::new(&registry, 1, 16).unwrap();
    ///
    /// let outcome = registry
    ///     .wait_for_multiple(
    ///         &[&*shutdown, &*inbound],
    ///         MatchCondition::AnyOne,
    ///         Some(Duration::from_millis(10)),
    ///     )
    ///     .unwrap();
    /// assert_eq!(outcome, WaitOutcome::Index(1));
    /// ```
    pub fn wait_for_multiple(
        &self,
        waitables: &[&dyn Waitable],
        condition: MatchCondition,
        timeout: Option<Duration>,
    ) -> WaitResult<WaitOutcome> {
        match waitables.len() {
            0 => return Err(WaitError::NoObjects),
            1 => return self.wait_for_single(waitables[0], timeout),
            _ => {}
        }

        let targets = self.resolve_targets(waitables)?;
        self.run(Waiter::new(targets, condition), timeout)
    }

    /// Validate the list and take an owning handle to every valid entry
    fn resolve_targets(
        &self,
        waitables: &[&dyn Waitable],
    ) -> WaitResult<Vec<Option<Arc<dyn Waitable>>>> {
        let max = self.config().max_objects;
        if waitables.is_empty() {
            return Err(WaitError::NoObjects);
        }
        if waitables.len() > max {
            return Err(WaitError::TooManyObjects {
                count: waitables.len(),
                max,
            });
        }

        let mut targets: Vec<Option<Arc<dyn Waitable>>> = Vec::new();
        targets.try_reserve_exact(waitables.len())?;
        let mut seen: Vec<WaitableId> = Vec::new();
        seen.try_reserve_exact(waitables.len())?;

        for (index, waitable) in waitables.iter().enumerate() {
            let header = waitable.header();
            let reason = if header.registry_id() != self.id() {
                Some("foreign registry")
            } else if header.is_closed() {
                Some("closed")
            } else if seen.contains(&header.id()) {
                Some("duplicate")
            } else {
                None
            };

            let handle = match reason {
                Some(reason) => Err(reason),
                None => header.upgrade().ok_or("being dropped"),
            };

            match handle {
                Ok(handle) => {
                    seen.push(header.id());
                    targets.push(Some(handle));
                }
                Err(reason) if self.config().strict => {
                    warn!(index, waitable = %header.id(), reason, "rejecting wait list");
                    return Err(WaitError::InvalidIndex(index));
                }
                Err(reason) => {
                    warn!(index, waitable = %header.id(), reason, "skipping wait list entry");
                    targets.push(None);
                }
            }
        }

        if targets.iter().all(Option::is_none) {
            return Err(WaitError::InvalidIndex(0));
        }
        Ok(targets)
    }

    fn run(&self, waiter: Waiter, timeout: Option<Duration>) -> WaitResult<WaitOutcome> {
        // Overflowing deadlines are treated as infinite
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let poll_only = timeout == Some(Duration::ZERO);

        let waiter = Arc::new(waiter);
        let span = WaitSpan::new(
            waiter.session(),
            waiter.targets().count(),
            waiter.condition(),
        );
        self.counters.waits(1);

        let outcome = {
            let _entered = span.enter();
            let registration = Registration::new(self, waiter.clone());

            let resolved = {
                let mut state = self.state.lock();
                let resolved = fast_path(&mut state, &waiter);
                if !resolved && !poll_only {
                    state.register_session(&waiter);
                }
                resolved
            };

            if resolved {
                self.counters.fast_path(1);
            } else if !poll_only {
                self.counters.blocked(1);
                trace!(session = %waiter.session(), "blocking");
                waiter.block(deadline);
            }

            registration.finish()
        };

        span.finish(outcome);
        Ok(outcome)
    }
}

/// Register `waiter` and try to resolve it without blocking
///
/// Runs entirely under the registry lock.
fn fast_path(state: &mut RegistryState, waiter: &Arc<Waiter>) -> bool {
    let owner = waiter.owner();

    let outcome = match waiter.condition() {
        MatchCondition::AnyOne => {
            let mut outcome = None;
            for (index, target) in waiter.targets() {
                state.register(target.id(), waiter);
                if target.header().is_closed() {
                    outcome = Some(WaitOutcome::Interrupted(index));
                    break;
                }
                if target.check_signaled(owner) && target.request_ownership(owner) {
                    target.notify_released(1);
                    outcome = Some(WaitOutcome::Index(index));
                    break;
                }
            }
            outcome
        }
        MatchCondition::ExactAll => {
            let mut closed = None;
            for (index, target) in waiter.targets() {
                state.register(target.id(), waiter);
                if closed.is_none() && target.header().is_closed() {
                    closed = Some(index);
                }
            }

            match closed {
                Some(index) => Some(WaitOutcome::Interrupted(index)),
                None if waiter.claim_all() => {
                    for (_, target) in waiter.targets() {
                        target.notify_released(1);
                    }
                    Some(WaitOutcome::All)
                }
                None => None,
            }
        }
    };

    match outcome {
        Some(outcome) => {
            waiter.resolve(outcome);
            trace!(session = %waiter.session(), %outcome, "resolved on fast path");
            true
        }
        None => false,
    }
}

/// Scope guard that unregisters a waiter exactly once
struct Registration<'r> {
    registry: &'r WaitRegistry,
    waiter: Arc<Waiter>,
    finished: bool,
}

impl<'r> Registration<'r> {
    fn new(registry: &'r WaitRegistry, waiter: Arc<Waiter>) -> Self {
        Self {
            registry,
            waiter,
            finished: false,
        }
    }

    /// Commit the timeout if still unresolved, unregister, and report
    fn finish(mut self) -> WaitOutcome {
        self.finished = true;
        self.release()
    }

    fn release(&self) -> WaitOutcome {
        let mut state = self.registry.state.lock();
        if self.waiter.resolve(WaitOutcome::Timeout) {
            self.registry.counters.timeouts(1);
        }
        state.unregister_all(&self.waiter);
        drop(state);

        let outcome = self.waiter.outcome().unwrap_or(WaitOutcome::Timeout);
        trace!(session = %self.waiter.session(), %outcome, "wait finished");
        outcome
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.release();
        }
    }
}
