/*!
 * Waitable Objects
 *
 * Mutex, event, semaphore and timer built on the wait registry. Each is
 * created as an `Arc` against one registry and may be mixed freely with the
 * other kinds in `WaitRegistry::wait_for_multiple`.
 */

mod event;
mod mutex;
mod semaphore;
mod timer;

pub use event::Event;
pub use mutex::Mutex;
pub use semaphore::Semaphore;
pub use timer::Timer;

use crate::core::errors::WaitResult;
use crate::core::sync::wait::{WaitOutcome, WaitRegistry, Waitable};
use std::time::Duration;

/// Facade operations shared by every object kind
pub trait SyncObject: Waitable + Sized {
    fn registry(&self) -> &WaitRegistry;

    /// Wait on this object alone
    fn wait(&self, timeout: Option<Duration>) -> WaitResult<WaitOutcome> {
        self.registry().wait_for_single(self, timeout)
    }

    /// Wait using the registry's configured default timeout
    fn wait_default(&self) -> WaitResult<WaitOutcome> {
        let timeout = self.registry().config().default_timeout;
        self.wait(timeout)
    }

    /// Tear the object down for waiting purposes
    ///
    /// Current waiters return `Interrupted`, later waits are rejected.
    /// Returns the number of waiters woken.
    fn close(&self) -> usize {
        self.registry().remove(self)
    }

    fn is_closed(&self) -> bool {
        self.header().is_closed()
    }
}
