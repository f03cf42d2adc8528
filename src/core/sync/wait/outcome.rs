/*!
 * Wait Outcomes
 *
 * How a started wait was resolved. Every variant is a normal return value;
 * only failures to start a wait are `WaitError`s.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Match condition of a multi-object wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCondition {
    /// Satisfied by the first object that can be claimed
    AnyOne,
    /// Satisfied only when every object can be claimed at once
    ExactAll,
}

/// Resolution of one blocking wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "index", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The object at this list index was claimed (`AnyOne`)
    Index(usize),
    /// Every object was claimed (`ExactAll`)
    All,
    /// The timeout elapsed first
    Timeout,
    /// Woken deliberately through `WaitRegistry::interrupt`
    AsyncSignal,
    /// The object at this index was torn down while waited on; it must not
    /// be used again
    Interrupted(usize),
}

impl WaitOutcome {
    /// True for `Index` and `All`
    #[inline]
    pub fn is_signaled(&self) -> bool {
        matches!(self, WaitOutcome::Index(_) | WaitOutcome::All)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitOutcome::Timeout)
    }

    /// List index carried by the outcome, if any
    #[inline]
    pub fn index(&self) -> Option<usize> {
        match self {
            WaitOutcome::Index(i) | WaitOutcome::Interrupted(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitOutcome::Index(i) => write!(f, "index({i})"),
            WaitOutcome::All => f.write_str("all"),
            WaitOutcome::Timeout => f.write_str("timeout"),
            WaitOutcome::AsyncSignal => f.write_str("async_signal"),
            WaitOutcome::Interrupted(i) => write!(f, "interrupted({i})"),
        }
    }
}
