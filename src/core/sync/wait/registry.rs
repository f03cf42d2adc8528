/*!
 * Wait Registry
 *
 * Shared map from waitable identity to the waiters interested in it, plus
 * the map from wait session to the active waiter used for interruption.
 *
 * # Lock Ordering
 *
 * 1. Registry lock (this module)
 * 2. A waitable's private state lock
 * 3. A waiter's outcome lock
 *
 * Locks are only ever acquired in this order. Every object state
 * transition that can satisfy a waiter runs under (1), so a signaled check
 * followed by a claim can never be split by another transition.
 */

use super::outcome::{MatchCondition, WaitOutcome};
use super::stats::{WaitCounters, WaitStats};
use super::traits::{Waitable, WakeResult};
use super::waiter::Waiter;
use crate::core::errors::WaitResult;
use crate::core::id::{RegistryId, WaitSessionId, WaitableId};
use crate::core::limits::{REGISTRY_INITIAL_CAPACITY, WAITER_LIST_CAPACITY};
use crate::core::sync::config::SyncConfig;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Registry maps, only reachable through the registry lock
pub(crate) struct RegistryState {
    by_waitable: AHashMap<WaitableId, Vec<Arc<Waiter>>>,
    by_session: AHashMap<WaitSessionId, Arc<Waiter>>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            by_waitable: AHashMap::with_capacity(REGISTRY_INITIAL_CAPACITY),
            by_session: AHashMap::with_capacity(REGISTRY_INITIAL_CAPACITY),
        }
    }

    /// Idempotent append in FIFO order
    pub(crate) fn register(&mut self, id: WaitableId, waiter: &Arc<Waiter>) {
        let list = self
            .by_waitable
            .entry(id)
            .or_insert_with(|| Vec::with_capacity(WAITER_LIST_CAPACITY));
        if !list.iter().any(|w| Arc::ptr_eq(w, waiter)) {
            list.push(waiter.clone());
        }
    }

    /// Remove; drops the map entry once its list is empty
    pub(crate) fn unregister(&mut self, id: WaitableId, waiter: &Arc<Waiter>) {
        if let Some(list) = self.by_waitable.get_mut(&id) {
            list.retain(|w| !Arc::ptr_eq(w, waiter));
            if list.is_empty() {
                self.by_waitable.remove(&id);
            }
        }
    }

    pub(crate) fn register_session(&mut self, waiter: &Arc<Waiter>) {
        let previous = self.by_session.insert(waiter.session(), waiter.clone());
        debug_assert!(
            previous.is_none(),
            "a thread may only have one outstanding wait"
        );
    }

    /// Drop every trace of `waiter` from both maps
    pub(crate) fn unregister_all(&mut self, waiter: &Arc<Waiter>) {
        let ids: Vec<WaitableId> = waiter.targets().map(|(_, t)| t.id()).collect();
        for id in ids {
            self.unregister(id, waiter);
        }

        if self
            .by_session
            .get(&waiter.session())
            .is_some_and(|w| Arc::ptr_eq(w, waiter))
        {
            self.by_session.remove(&waiter.session());
        }
    }

    /// Walk `source`'s waiters in registration order and release those it satisfies
    ///
    /// Returns `(released, claimed_from_source)`.
    fn signal(&self, source: &dyn Waitable) -> (usize, usize) {
        let id = source.id();
        let Some(waiters) = self.by_waitable.get(&id) else {
            return (0, 0);
        };

        let mut released = 0;
        let mut claimed = 0;

        for waiter in waiters {
            if waiter.is_resolved() {
                continue;
            }
            let Some(index) = waiter.index_of(id) else {
                continue;
            };
            let owner = waiter.owner();

            let outcome = match waiter.condition() {
                MatchCondition::AnyOne => {
                    if !(source.check_signaled(owner) && source.request_ownership(owner)) {
                        continue;
                    }
                    claimed += 1;
                    WaitOutcome::Index(index)
                }
                MatchCondition::ExactAll => {
                    if !waiter.claim_all() {
                        continue;
                    }
                    for (_, target) in waiter.targets() {
                        if target.id() == id {
                            claimed += 1;
                        } else {
                            target.notify_released(1);
                        }
                    }
                    WaitOutcome::All
                }
            };

            if waiter.resolve(outcome) {
                trace!(waitable = %id, session = %waiter.session(), %outcome, "signal released waiter");
                released += 1;
            }
        }

        if claimed > 0 {
            source.notify_released(claimed);
        }
        assert!(
            source.can_signal_multiple() || claimed <= 1,
            "exclusive waitable {id} granted {claimed} claims in one signal"
        );

        (released, claimed)
    }

    /// Resolve every unresolved waiter of `source` with `Interrupted(index)`
    fn fail(&self, source: &dyn Waitable) -> usize {
        let id = source.id();
        let Some(waiters) = self.by_waitable.get(&id) else {
            return 0;
        };

        waiters
            .iter()
            .filter(|waiter| match waiter.index_of(id) {
                Some(index) => waiter.resolve(WaitOutcome::Interrupted(index)),
                None => false,
            })
            .count()
    }

    fn waiter_count(&self, id: WaitableId) -> usize {
        self.by_waitable.get(&id).map_or(0, Vec::len)
    }
}

/// Signal access handed to facade transitions while the registry lock is held
pub struct Signaler<'r> {
    state: &'r RegistryState,
    counters: &'r WaitCounters,
}

impl Signaler<'_> {
    /// Release the waiters `source`'s new state satisfies
    pub fn signal(&self, source: &dyn Waitable) -> WakeResult {
        let (released, _) = self.state.signal(source);
        self.counters.signal_releases(released as u64);
        WakeResult::from_count(released)
    }

    /// Number of waiters currently listed against `id`
    pub fn waiter_count(&self, id: WaitableId) -> usize {
        self.state.waiter_count(id)
    }
}

/// Process-wide (or per isolation domain) wait registry
///
/// Constructed once and shared by `Arc` with every object created against
/// it. Objects from different registries cannot be mixed in one wait.
pub struct WaitRegistry {
    id: RegistryId,
    config: SyncConfig,
    pub(crate) state: Mutex<RegistryState>,
    pub(crate) counters: WaitCounters,
}

impl WaitRegistry {
    /// Create a registry with a validated configuration
    pub fn new(config: SyncConfig) -> WaitResult<Arc<Self>> {
        config.validate()?;
        let registry = Arc::new(Self {
            id: RegistryId::next(),
            config,
            state: Mutex::new(RegistryState::new()),
            counters: WaitCounters::default(),
        });
        debug!(registry = %registry.id, config = ?registry.config, "wait registry created");
        Ok(registry)
    }

    /// Create with default configuration
    pub fn with_defaults() -> Arc<Self> {
        Arc::new(Self {
            id: RegistryId::next(),
            config: SyncConfig::default(),
            state: Mutex::new(RegistryState::new()),
            counters: WaitCounters::default(),
        })
    }

    #[inline]
    pub fn id(&self) -> RegistryId {
        self.id
    }

    #[inline]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a state transition under the registry lock
    ///
    /// Facades mutate their object state inside `f` and call
    /// [`Signaler::signal`] when the new state may satisfy waiters. `f` must
    /// not call back into the registry.
    pub fn transition<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Signaler<'_>) -> R,
    {
        let state = self.state.lock();
        let signaler = Signaler {
            state: &*state,
            counters: &self.counters,
        };
        f(&signaler)
    }

    /// Release the waiters `waitable`'s current state satisfies
    ///
    /// Called by an object right after a state change. Waiters are considered
    /// in registration order; a claim refused by the object moves on to the
    /// next candidate.
    pub fn signal(&self, waitable: &dyn Waitable) -> WakeResult {
        self.transition(|signaler| signaler.signal(waitable))
    }

    /// Wake every waiter of `waitable` with `Interrupted(index)`
    ///
    /// The object stays usable; later waits may still succeed.
    pub fn fail(&self, waitable: &dyn Waitable) -> usize {
        let state = self.state.lock();
        let woken = state.fail(waitable);
        self.counters.teardown_wakes(woken as u64);
        if woken > 0 {
            warn!(waitable = %waitable.id(), woken, "waitable failed with waiters attached");
        }
        woken
    }

    /// Permanently invalidate `waitable`
    ///
    /// Marks it closed so new waits reject it, then wakes every remaining
    /// waiter with `Interrupted(index)`. Returns the number of waiters woken.
    pub fn remove(&self, waitable: &dyn Waitable) -> usize {
        let state = self.state.lock();
        if !waitable.header().mark_closed() {
            return 0;
        }
        let woken = state.fail(waitable);
        self.counters.teardown_wakes(woken as u64);
        debug!(waitable = %waitable.id(), kind = %waitable.kind(), woken, "waitable removed");
        woken
    }

    /// Force the wait blocked under `session` to return `AsyncSignal`
    ///
    /// Returns `false` when the session has no unresolved wait; the call then
    /// has no lasting effect.
    pub fn interrupt(&self, session: WaitSessionId) -> bool {
        let state = self.state.lock();
        let interrupted = state
            .by_session
            .get(&session)
            .is_some_and(|waiter| waiter.resolve(WaitOutcome::AsyncSignal));
        if interrupted {
            self.counters.interrupts(1);
            debug!(%session, "wait interrupted");
        }
        interrupted
    }

    /// Number of waiters listed against `id`
    pub fn waiter_count(&self, id: WaitableId) -> usize {
        self.state.lock().waiter_count(id)
    }

    /// Number of sessions currently blocked
    pub fn active_sessions(&self) -> usize {
        self.state.lock().by_session.len()
    }

    pub fn stats(&self) -> WaitStats {
        self.counters.snapshot()
    }

    /// Drop-time check that nobody still waits on `id`
    pub(crate) fn forget(&self, id: WaitableId) {
        let listed = self.waiter_count(id);
        assert!(
            listed == 0,
            "waitable {id} destroyed with {listed} registered waiters"
        );
    }
}

impl std::fmt::Debug for WaitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitRegistry")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
