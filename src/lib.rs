/*!
 * Multiwait Library
 * Multi-object wait core: block on any or all of a heterogeneous set of
 * mutexes, events, semaphores and timers
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{WaitError, WaitResult};
pub use crate::core::id::{RegistryId, WaitSessionId, WaitableId};
pub use crate::core::sync::{
    Event, MatchCondition, Mutex, Semaphore, SyncConfig, SyncObject, Timer, WaitOutcome,
    WaitRegistry, WaitStats, Waitable, WaitableKind, WakeResult,
};
pub use monitoring::init_tracing;
