/*!
 * Synchronization Primitives
 *
 * Mutex, event, semaphore and timer objects that can be waited on
 * individually or in any combination:
 * - `AnyOne`: return as soon as one object can be claimed
 * - `ExactAll`: return once every object can be claimed at the same time
 *
 * # Architecture
 *
 * Objects are created against a shared `WaitRegistry`. Every state change
 * that may satisfy a waiter runs under the registry lock and walks the
 * object's waiter list in registration order, handing ownership to the
 * first waiters whose claim the object accepts.
 *
 * # Use Cases
 *
 * - **Receive loops**: wait on "shutdown requested OR inbound queue non-empty"
 * - **Resource pools**: acquire a semaphore unit and a mutex atomically
 * - **Watchdogs**: interrupt a blocked thread from a timer expiry
 */

mod config;
pub mod objects;
pub mod wait;

pub use config::SyncConfig;
pub use objects::{Event, Mutex, Semaphore, SyncObject, Timer};
pub use wait::{
    MatchCondition, Signaler, WaitOutcome, WaitRegistry, WaitStats, Waitable, WaitableHeader,
    WaitableKind, WakeResult,
};
