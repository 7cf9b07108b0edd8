//! Cancellable one-shot deferred actions.
//!
//! The control core's only concurrency primitive for safety timeouts:
//! [`run_after`] fires a callback exactly once after a delay unless the
//! returned [`TimerHandle`] is cancelled first. Cancellation is idempotent
//! and race-safe against a near-simultaneous fire — whichever side wins the
//! compare-and-transition on the timer word decides, and the loser becomes
//! a no-op.
//!
//! The lift uses this for exactly one thing: arming the motion watchdog
//! when a motor starts. The callback posts a `SafetyTimeout` event onto the
//! control-thread channel, so the state machine still executes the timeout
//! on its own thread.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Lifecycle of a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    /// Armed, callback not yet invoked.
    Pending,
    /// Cancelled before firing; the callback will never run.
    Cancelled,
    /// Fired; the callback ran exactly once.
    Fired,
}

#[derive(Debug)]
struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Handle to a scheduled one-shot action.
///
/// Dropping the handle does *not* cancel the timer; only an explicit
/// `cancel()` does. `cancel()` after the callback has already fired, or a
/// second `cancel()`, is a no-op — never an error.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    /// Cancel the timer if it has not fired yet. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock().expect("timer state lock");
        if *state == TimerState::Pending {
            *state = TimerState::Cancelled;
            self.shared.wake.notify_all();
        }
    }

    /// Whether the timer is still armed.
    pub fn is_pending(&self) -> bool {
        *self.shared.state.lock().expect("timer state lock") == TimerState::Pending
    }

    /// Whether the callback has run.
    pub fn has_fired(&self) -> bool {
        *self.shared.state.lock().expect("timer state lock") == TimerState::Fired
    }
}

/// Schedule `callback` to run once after `delay`, on a dedicated timer
/// thread.
///
/// Returns an error only if the timer thread cannot be spawned; callers
/// that arm a *safety* timer must treat that as "do not start the motion".
///
/// The callback must be cheap and non-blocking — in this workspace it only
/// posts an event onto the control-thread channel.
pub fn run_after<F>(delay: Duration, callback: F) -> std::io::Result<TimerHandle>
where
    F: FnOnce() + Send + 'static,
{
    let shared = Arc::new(TimerShared {
        state: Mutex::new(TimerState::Pending),
        wake: Condvar::new(),
    });
    let thread_shared = Arc::clone(&shared);

    thread::Builder::new()
        .name("lift-timer".into())
        .spawn(move || {
            let deadline = Instant::now() + delay;
            let mut state = thread_shared.state.lock().expect("timer state lock");
            // Cooperative wait: a cancel wakes the thread early instead of
            // leaving it asleep for the rest of the delay.
            while *state == TimerState::Pending {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = thread_shared
                    .wake
                    .wait_timeout(state, deadline - now)
                    .expect("timer state lock");
                state = guard;
            }
            if *state == TimerState::Pending {
                *state = TimerState::Fired;
                drop(state);
                callback();
            }
        })?;

    Ok(TimerHandle { shared })
}
