/*!
 * Timer Waitable
 *
 * Becomes signaled when its due time arrives, once or periodically. A
 * manual-reset timer stays signaled until `reset` or the next `set`; an
 * auto-reset timer releases one waiter per expiry.
 *
 * Each timer owns a named worker thread that sleeps on the timer's own
 * schedule lock and condvar. The worker only holds a weak reference, so
 * dropping the last handle stops it.
 */

use super::SyncObject;
use crate::core::errors::{WaitError, WaitResult};
use crate::core::id::WaitSessionId;
use crate::core::limits::{MIN_TIMER_PERIOD, TIMER_THREAD_PREFIX};
use crate::core::sync::wait::{
    WaitOutcome, WaitRegistry, Waitable, WaitableHeader, WaitableKind, WakeResult,
};
use parking_lot::{Condvar, Mutex as StateLock, MutexGuard};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct TimerState {
    signaled: bool,
    granted: usize,
    fired: u64,
    /// Bumped by every re-arm or cancel; expiries of older schedules are dropped
    epoch: u64,
}

#[derive(Debug, Default)]
struct Schedule {
    deadline: Option<Instant>,
    period: Option<Duration>,
    notify: Option<WaitSessionId>,
    epoch: u64,
    shutdown: bool,
}

/// Schedule shared between a timer and its worker thread
#[derive(Default)]
struct Clock {
    schedule: StateLock<Schedule>,
    changed: Condvar,
}

impl Clock {
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Schedule),
    {
        let mut schedule = self.schedule.lock();
        f(&mut schedule);
        self.changed.notify_one();
    }

    fn run(&self, timer: Weak<Timer>) {
        let mut schedule = self.schedule.lock();
        loop {
            if schedule.shutdown {
                break;
            }

            let Some(deadline) = schedule.deadline else {
                self.changed.wait(&mut schedule);
                continue;
            };

            let now = Instant::now();
            if now < deadline {
                self.changed.wait_until(&mut schedule, deadline);
                continue;
            }

            let (notify, epoch) = (schedule.notify, schedule.epoch);
            // An unrepresentable next expiry ends the schedule
            schedule.deadline = schedule.period.and_then(|period| {
                let next = deadline.checked_add(period)?;
                // Skip missed periods instead of firing a burst
                if next <= now {
                    now.checked_add(period)
                } else {
                    Some(next)
                }
            });

            let alive = MutexGuard::unlocked(&mut schedule, || match timer.upgrade() {
                Some(timer) => {
                    timer.fire(notify, epoch);
                    true
                }
                None => false,
            });
            if !alive {
                break;
            }
        }
        trace!("timer worker exiting");
    }
}

pub struct Timer {
    header: WaitableHeader,
    registry: Arc<WaitRegistry>,
    manual_reset: bool,
    state: StateLock<TimerState>,
    clock: Arc<Clock>,
}

impl Timer {
    /// Create an unarmed, unsignaled timer and start its worker thread
    pub fn new(registry: &Arc<WaitRegistry>, manual_reset: bool) -> WaitResult<Arc<Self>> {
        let clock = Arc::new(Clock::default());
        let timer = Arc::new_cyclic(|this| Self {
            header: WaitableHeader::new(WaitableKind::Timer, registry.id(), this),
            registry: registry.clone(),
            manual_reset,
            state: StateLock::new(TimerState::default()),
            clock: clock.clone(),
        });

        let weak = Arc::downgrade(&timer);
        thread::Builder::new()
            .name(format!("{TIMER_THREAD_PREFIX}-{}", timer.header.id()))
            .spawn(move || clock.run(weak))?;

        Ok(timer)
    }

    /// Arm to fire after `due`, then every `period` if given
    ///
    /// Re-arming replaces the previous schedule and clears the signaled state.
    pub fn set(&self, due: Duration, period: Option<Duration>) -> WaitResult<()> {
        self.arm(due, period, None)
    }

    /// Like `set`, and also interrupt the wait of `session` on every expiry
    pub fn set_interrupting(
        &self,
        due: Duration,
        period: Option<Duration>,
        session: WaitSessionId,
    ) -> WaitResult<()> {
        self.arm(due, period, Some(session))
    }

    fn arm(
        &self,
        due: Duration,
        period: Option<Duration>,
        notify: Option<WaitSessionId>,
    ) -> WaitResult<()> {
        if period.is_some_and(|p| p < MIN_TIMER_PERIOD) {
            return Err(WaitError::InvalidConfig(format!(
                "timer period must be at least {MIN_TIMER_PERIOD:?}"
            )));
        }
        let deadline = Instant::now().checked_add(due).ok_or_else(|| {
            WaitError::InvalidConfig(format!("timer due time {due:?} overflows"))
        })?;
        if let Some(period) = period {
            deadline.checked_add(period).ok_or_else(|| {
                WaitError::InvalidConfig(format!("timer period {period:?} overflows"))
            })?;
        }

        let epoch = self.clear();
        self.clock.update(|schedule| {
            schedule.deadline = Some(deadline);
            schedule.period = period;
            schedule.notify = notify;
            schedule.epoch = epoch;
        });
        debug!(timer = %self.header.id(), ?due, ?period, "timer armed");
        Ok(())
    }

    /// Stop future expiries; the signaled state is left as is
    pub fn cancel(&self) {
        let epoch = self.registry.transition(|_| {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.epoch
        });
        self.clock.update(|schedule| {
            schedule.deadline = None;
            schedule.period = None;
            schedule.notify = None;
            schedule.epoch = epoch;
        });
    }

    pub fn reset(&self) {
        self.clear();
    }

    /// Unsignal and retire the current schedule; returns the new epoch
    fn clear(&self) -> u64 {
        self.registry.transition(|_| {
            let mut state = self.state.lock();
            state.signaled = false;
            state.granted = 0;
            state.epoch += 1;
            state.epoch
        })
    }

    pub fn is_armed(&self) -> bool {
        self.clock.schedule.lock().deadline.is_some()
    }

    pub fn is_signaled(&self) -> bool {
        self.state.lock().signaled
    }

    /// Number of expiries so far
    pub fn fire_count(&self) -> u64 {
        self.state.lock().fired
    }

    pub fn wait_fired(&self, timeout: Option<Duration>) -> bool {
        matches!(self.wait(timeout), Ok(WaitOutcome::Index(_)))
    }

    fn fire(&self, notify: Option<WaitSessionId>, epoch: u64) -> WakeResult {
        let woken = self.registry.transition(|signaler| {
            {
                let mut state = self.state.lock();
                if state.epoch != epoch {
                    return None;
                }
                state.signaled = true;
                state.granted = 0;
                state.fired += 1;
            }
            Some(signaler.signal(self))
        });
        let Some(woken) = woken else {
            trace!(timer = %self.header.id(), epoch, "stale expiry dropped");
            return WakeResult::NoWaiters;
        };
        trace!(timer = %self.header.id(), woken = woken.count(), "timer fired");

        if let Some(session) = notify {
            self.registry.interrupt(session);
        }
        woken
    }

    #[inline]
    fn available(&self, state: &TimerState) -> bool {
        state.signaled && (self.manual_reset || state.granted == 0)
    }
}

impl Waitable for Timer {
    fn header(&self) -> &WaitableHeader {
        &self.header
    }

    fn check_signaled(&self, _ctx: ThreadId) -> bool {
        self.available(&self.state.lock())
    }

    fn request_ownership(&self, _ctx: ThreadId) -> bool {
        let mut state = self.state.lock();
        if !self.available(&state) {
            return false;
        }
        state.granted = state.granted.saturating_add(1);
        true
    }

    fn can_signal_multiple(&self) -> bool {
        true
    }

    fn notify_released(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        if !self.manual_reset {
            state.signaled = false;
        }
        state.granted = 0;
    }
}

impl SyncObject for Timer {
    fn registry(&self) -> &WaitRegistry {
        &self.registry
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.clock.update(|schedule| schedule.shutdown = true);
        self.registry.forget(self.header.id());
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.header.id())
            .field("manual_reset", &self.manual_reset)
            .field("signaled", &self.is_signaled())
            .field("armed", &self.is_armed())
            .finish()
    }
}
