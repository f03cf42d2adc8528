/*!
 * System Limits and Constants
 *
 * Centralized location for wait-core limits, thresholds, and magic numbers.
 */

use std::time::Duration;

// =============================================================================
// WAIT LIMITS
// =============================================================================

/// Hard capacity of a single multi-object wait
/// Matches the classic 64-handle ceiling of multi-object wait APIs
pub const MAX_WAIT_OBJECTS: usize = 64;

/// Initial capacity of a waitable's waiter list
/// [PERF] Most objects have one or two concurrent waiters
pub const WAITER_LIST_CAPACITY: usize = 4;

/// Initial capacity of the registry maps
pub const REGISTRY_INITIAL_CAPACITY: usize = 64;

// =============================================================================
// TIMER LIMITS
// =============================================================================

/// Smallest accepted timer period
/// Shorter periods would turn the timer thread into a busy loop
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Name prefix for timer worker threads
pub const TIMER_THREAD_PREFIX: &str = "multiwait-timer";

// =============================================================================
// SEMAPHORE LIMITS
// =============================================================================

/// Largest accepted semaphore maximum
pub const MAX_SEMAPHORE_COUNT: usize = i32::MAX as usize;

// =============================================================================
// CONFIGURATION DEFAULTS
// =============================================================================

/// Default per-wait object ceiling (the hard capacity)
pub const DEFAULT_MAX_OBJECTS: usize = MAX_WAIT_OBJECTS;

/// Environment variable overriding the per-wait object ceiling
pub const ENV_MAX_OBJECTS: &str = "MULTIWAIT_MAX_OBJECTS";

/// Environment variable toggling strict list validation
pub const ENV_STRICT: &str = "MULTIWAIT_STRICT";

/// Environment variable holding the default facade timeout in milliseconds
pub const ENV_DEFAULT_TIMEOUT_MS: &str = "MULTIWAIT_DEFAULT_TIMEOUT_MS";

/// Environment variable enabling JSON trace output
pub const ENV_TRACE_JSON: &str = "MULTIWAIT_TRACE_JSON";
