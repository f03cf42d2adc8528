/*!
 * Synchronization Traits
 *
 * The capability interface every waitable object kind implements, and the
 * identity header the registry uses to key and validate objects.
 *
 * # Contract
 *
 * The four capability operations read or mutate the object's private state
 * and take the object's own lock internally. The registry only calls them
 * while it holds its own lock, which is what makes a check followed by a
 * claim atomic with respect to every other signal, claim and facade
 * operation on the same registry. Implementations must never call back into
 * the registry from these methods.
 */

use crate::core::id::{RegistryId, WaitableId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

/// Result of a signal operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiter could be released
    NoWaiters,
}

impl WakeResult {
    #[inline]
    pub(crate) fn from_count(count: usize) -> Self {
        if count == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(count)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Object-kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitableKind {
    Mutex,
    Event,
    Semaphore,
    Timer,
}

impl fmt::Display for WaitableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitableKind::Mutex => "mutex",
            WaitableKind::Event => "event",
            WaitableKind::Semaphore => "semaphore",
            WaitableKind::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// Identity shared by every waitable object
///
/// Holds a weak self-reference so a borrowed `&dyn Waitable` can be turned
/// into an owning handle for the duration of a wait. A waiter therefore keeps
/// its targets alive, and an object is never dropped while listed.
pub struct WaitableHeader {
    id: WaitableId,
    kind: WaitableKind,
    registry: RegistryId,
    this: Weak<dyn Waitable>,
    closed: AtomicBool,
}

impl WaitableHeader {
    /// Build the header inside `Arc::new_cyclic`
    pub fn new<T>(kind: WaitableKind, registry: RegistryId, this: &Weak<T>) -> Self
    where
        T: Waitable + 'static,
    {
        let this: Weak<dyn Waitable> = this.clone();
        Self {
            id: WaitableId::next(),
            kind,
            registry,
            this,
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> WaitableId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> WaitableKind {
        self.kind
    }

    /// Registry this object signals into
    #[inline]
    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark permanently invalid; returns `false` if it already was
    #[inline]
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Owning handle, `None` once the last strong reference is gone
    #[inline]
    pub(crate) fn upgrade(&self) -> Option<Arc<dyn Waitable>> {
        self.this.upgrade()
    }
}

impl fmt::Debug for WaitableHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitableHeader")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("registry", &self.registry)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One synchronizable object instance
///
/// `ctx` is the thread on whose behalf the check or claim is made; it
/// matters for kinds whose signaled state is thread-relative (a mutex is
/// signaled for its owner).
pub trait Waitable: Send + Sync {
    fn header(&self) -> &WaitableHeader;

    /// Pure state read
    fn check_signaled(&self, ctx: ThreadId) -> bool;

    /// Check-and-set claim on behalf of `ctx`
    ///
    /// This is the race-resolution point: it fails if another party already
    /// took the grant the object was offering.
    fn request_ownership(&self, ctx: ThreadId) -> bool;

    /// Whether one signal may release more than one waiter
    fn can_signal_multiple(&self) -> bool;

    /// Post-release hook, `count` waiters took the grant since the last call
    fn notify_released(&self, count: usize);

    #[inline]
    fn id(&self) -> WaitableId {
        self.header().id()
    }

    #[inline]
    fn kind(&self) -> WaitableKind {
        self.header().kind()
    }
}

impl fmt::Debug for dyn Waitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.id())
    }
}
