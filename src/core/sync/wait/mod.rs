/*!
 * Multi-Object Wait Core
 *
 * Lets a thread block until one, all, or a specific member of a
 * heterogeneous set of waitables becomes signaled, with per-kind ownership
 * transfer, timeouts, external interruption and safe teardown.
 *
 * # Architecture
 *
 * - `Waitable`: four-operation capability every object kind implements
 * - `WaitRegistry`: waitable -> waiters and session -> waiter maps
 * - `Waiter`: per-call coordinator with a private mutex/condvar pair
 * - `multiplex`: the `wait_for_single` / `wait_for_multiple` entry points
 */

mod multiplex;
mod outcome;
mod registry;
mod stats;
mod traits;
mod waiter;

// Re-export public API
pub use outcome::{MatchCondition, WaitOutcome};
pub use registry::{Signaler, WaitRegistry};
pub use stats::WaitStats;
pub use traits::{Waitable, WaitableHeader, WaitableKind, WakeResult};
