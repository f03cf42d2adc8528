/*!
 * ID Generation System
 * Type-safe identifiers for waitables, wait sessions and registries
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Identity of one waitable object (registry map key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaitableId(pub u64);

/// Identity of a thread's wait session, used to interrupt a blocked wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaitSessionId(pub u64);

/// Identity of a wait registry (isolation domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryId(pub u64);

impl fmt::Display for WaitableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl fmt::Display for WaitSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

// ============================================================================
// Atomic Counter Generator
// ============================================================================

/// Lock-free monotonic counter for hot paths
///
/// Cache-line aligned to prevent false sharing between the generators,
/// which all live in statics.
#[repr(C, align(64))]
pub struct AtomicGenerator {
    counter: AtomicU64,
}

impl AtomicGenerator {
    /// Create new generator starting at given value
    #[inline]
    pub const fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }

    /// Generate next ID
    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

static WAITABLE_IDS: AtomicGenerator = AtomicGenerator::new(1);
static SESSION_IDS: AtomicGenerator = AtomicGenerator::new(1);
static REGISTRY_IDS: AtomicGenerator = AtomicGenerator::new(1);

thread_local! {
    static CURRENT_SESSION: WaitSessionId = WaitSessionId(SESSION_IDS.next());
}

impl WaitableId {
    /// Allocate a fresh, never reused waitable identity
    #[inline]
    pub fn next() -> Self {
        Self(WAITABLE_IDS.next())
    }
}

impl WaitSessionId {
    /// Session of the calling thread
    ///
    /// Allocated lazily on first use and stable for the thread's lifetime.
    /// A thread has at most one outstanding wait, so the session uniquely
    /// names that wait while it is blocked.
    #[inline]
    pub fn current() -> Self {
        CURRENT_SESSION.with(|id| *id)
    }
}

impl RegistryId {
    #[inline]
    pub fn next() -> Self {
        Self(REGISTRY_IDS.next())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_generator() {
        let gen = AtomicGenerator::new(100);

        assert_eq!(gen.next(), 100);
        assert_eq!(gen.next(), 101);
        assert_eq!(gen.next(), 102);
    }

    #[test]
    fn test_concurrent_generation() {
        use std::sync::Arc;
        use std::thread;

        let gen = Arc::new(AtomicGenerator::new(1));
        let mut handles = vec![];

        for _ in 0..10 {
            let g = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                let mut ids = vec![];
                for _ in 0..100 {
                    ids.push(g.next());
                }
                ids
            }));
        }

        let mut all_ids = vec![];
        for handle in handles {
            all_ids.extend(handle.join().unwrap());
        }

        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 1000);
    }

    #[test]
    fn test_session_is_stable_per_thread() {
        let here = WaitSessionId::current();
        assert_eq!(here, WaitSessionId::current());

        let there = std::thread::spawn(WaitSessionId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_waitable_ids_unique() {
        assert_ne!(WaitableId::next(), WaitableId::next());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", WaitableId(42)), "w42");
        assert_eq!(format!("{}", WaitSessionId(7)), "s7");
    }
}
