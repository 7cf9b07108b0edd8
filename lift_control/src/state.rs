//! Lift state machine: states, guarded transitions, entry/exit actions.
//!
//! Event-driven engine owning the [`LiftModel`] and the outstanding safety
//! timer. Every event method must be invoked on the control thread only —
//! either directly or replayed through the dispatcher.
//!
//! Invariants held at every observable instant:
//! - raise and lower motors are never both commanded on;
//! - a safety timer exists iff the state is `Rising` or `Lowering`;
//! - the machine is always in exactly one [`LiftState`].
//!
//! Guarded multi-path events evaluate guards in declared order,
//! first-match-wins; an event with no matching arm in the current state is
//! a no-op (logged at DEBUG).

use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{debug, error, info, warn};

use crate::model::LiftModel;
use crate::sched::{self, TimerHandle};

// ─── States & Events ────────────────────────────────────────────────

/// The lift's operating states. No terminal state; the machine runs for
/// the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftState {
    /// Initial state after power-on, before `initialise()`.
    TurnedOn,
    /// Stationary, position unknown (not on a limit).
    Stopped,
    /// Stationary on the upper travel limit; top landing door unlocked.
    StoppedAtTop,
    /// Stationary on the lower travel limit.
    StoppedAtBottom,
    /// Raise motor energized, safety timer armed.
    Rising,
    /// Lower motor energized, safety timer armed.
    Lowering,
}

impl LiftState {
    /// Whether a motor is commanded on in this state.
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Rising | Self::Lowering)
    }
}

/// Events driving the machine. Hardware edges arrive through the
/// dispatcher; `SafetyTimeout` is synthesized by the motion watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftEvent {
    /// One-shot startup transition out of `TurnedOn`.
    Initialise,
    /// Call push-button: request a move, or a stop while moving.
    Call,
    /// Upper limit switch rising edge.
    StopRising,
    /// Lower limit switch rising edge.
    StopLowering,
    /// Either door sensor falling edge (a shaft door opened).
    DoorOpens,
    /// Either emergency stop rising edge.
    EstopPressed,
    /// Motion watchdog expired without a limit being reached.
    SafetyTimeout,
}

/// Commanded travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

// ─── Machine ────────────────────────────────────────────────────────

/// The lift state machine.
///
/// Owns the model for its entire lifetime and is the only writer of
/// actuator commands. The `events` sender feeds the control-thread channel
/// and is handed to the motion watchdog so the timeout is replayed as an
/// ordinary event.
pub struct LiftStateMachine {
    model: LiftModel,
    state: LiftState,
    safety_timer: Option<TimerHandle>,
    events: Sender<LiftEvent>,
}

impl LiftStateMachine {
    /// Build the machine in `TurnedOn` and run its entry action: engage
    /// both door locks.
    pub fn new(model: LiftModel, events: Sender<LiftEvent>) -> Self {
        model.lock_door_top.on();
        model.lock_door_bottom.on();
        info!("lift controller powered on, door locks engaged");
        Self {
            model,
            state: LiftState::TurnedOn,
            safety_timer: None,
            events,
        }
    }

    /// Current state (read-only, for observability/telemetry).
    pub fn state(&self) -> LiftState {
        self.state
    }

    /// The model, for guard/interlock observability.
    pub fn model(&self) -> &LiftModel {
        &self.model
    }

    /// Whether a motion watchdog is outstanding.
    pub fn has_safety_timer(&self) -> bool {
        self.safety_timer.is_some()
    }

    // ─── Event methods (control thread only) ────────────────────────

    /// Leave `TurnedOn`. Call exactly once after construction.
    pub fn initialise(&mut self) {
        self.handle(LiftEvent::Initialise);
    }

    pub fn call(&mut self) {
        self.handle(LiftEvent::Call);
    }

    pub fn stop_rising(&mut self) {
        self.handle(LiftEvent::StopRising);
    }

    pub fn stop_lowering(&mut self) {
        self.handle(LiftEvent::StopLowering);
    }

    pub fn door_opens(&mut self) {
        self.handle(LiftEvent::DoorOpens);
    }

    pub fn estop_pressed(&mut self) {
        self.handle(LiftEvent::EstopPressed);
    }

    pub fn safety_timeout(&mut self) {
        self.handle(LiftEvent::SafetyTimeout);
    }

    /// Dispatch one event. Transitions are atomic from the caller's
    /// perspective: by the time this returns, state and actuators agree.
    pub fn handle(&mut self, event: LiftEvent) {
        use LiftEvent::*;
        use LiftState::*;

        match (self.state, event) {
            (TurnedOn, Initialise) => {
                // Defensive exit action: nothing may be running yet.
                self.model.raise_motor.off();
                self.model.lower_motor.off();
                self.cancel_safety_timer();
                self.state = Stopped;
                info!("lift state TurnedOn -> Stopped");
            }

            (Stopped | StoppedAtTop | StoppedAtBottom, Call) => self.call_from_stationary(),

            // A call while moving is a stop request.
            (Rising | Lowering, Call) => {
                info!("call while moving, stopping");
                self.stop_motion(Stopped);
            }

            (Rising, StopRising) if self.model.top_limit_tripped() => {
                self.stop_motion(StoppedAtTop);
            }

            (Lowering, StopLowering) if self.model.bottom_limit_tripped() => {
                self.stop_motion(StoppedAtBottom);
            }

            (Rising | Lowering, DoorOpens) => {
                warn!(state = ?self.state, "shaft door opened during motion, stopping");
                self.stop_motion(Stopped);
            }

            (Rising | Lowering, EstopPressed) => {
                warn!(state = ?self.state, "emergency stop during motion, stopping");
                self.stop_motion(Stopped);
            }

            (Rising | Lowering, SafetyTimeout) => {
                // Real or sensor-indicated problem: the platform ran for the
                // whole watchdog window without reaching a limit.
                warn!(
                    state = ?self.state,
                    safety_time = ?self.model.safety_time(),
                    "safety timeout: no travel limit reached, forcing stop"
                );
                self.stop_motion(Stopped);
            }

            // Internal transitions: stationary states absorb safety edges
            // with no actuator change.
            (Stopped | StoppedAtTop | StoppedAtBottom, DoorOpens | EstopPressed) => {
                debug!(state = ?self.state, ?event, "safety edge while stationary (internal)");
            }

            (state, event) => {
                // Includes stale SafetyTimeout events whose timer lost the
                // cancellation race after the motion state was already left.
                debug!(?state, ?event, "event ignored in current state");
            }
        }
    }

    // ─── Transition helpers ─────────────────────────────────────────

    /// `Call` from a stationary state: guard evaluation in declared order.
    fn call_from_stationary(&mut self) {
        let interlocks = self.model.interlocks();
        if !interlocks.is_empty() {
            warn!(?interlocks, "call refused: interlocks active");
            return;
        }

        let top = self.model.top_limit_active();
        let bottom = self.model.bottom_limit_active();
        if top && bottom {
            // Fail closed: a limit switch is almost certainly stuck.
            warn!("call refused: both travel limits active, suspect stuck limit switch");
            return;
        }

        let direction = match self.state {
            // Move away from the limit currently held.
            LiftState::StoppedAtTop if top => Direction::Down,
            LiftState::StoppedAtBottom if bottom => Direction::Up,
            // Position unknown: send the platform down.
            LiftState::Stopped => Direction::Down,
            _ => {
                debug!(state = ?self.state, "call ignored: held limit no longer active");
                return;
            }
        };
        self.start_motion(direction);
    }

    /// Enter `Rising`/`Lowering`: exit the current state, arm the watchdog,
    /// then energize the motor. The opposite motor is always commanded off
    /// first, and the motor only starts once the watchdog is armed, so
    /// motion is direction-exclusive and time-bounded from the first
    /// instant.
    fn start_motion(&mut self, direction: Direction) {
        let prev = self.state;
        self.exit_stationary(prev);

        // A stale timer from a previous motion must be gone before arming.
        self.cancel_safety_timer();

        let (engage, oppose, next) = match direction {
            Direction::Up => (
                Arc::clone(&self.model.raise_motor),
                Arc::clone(&self.model.lower_motor),
                LiftState::Rising,
            ),
            Direction::Down => (
                Arc::clone(&self.model.lower_motor),
                Arc::clone(&self.model.raise_motor),
                LiftState::Lowering,
            ),
        };
        oppose.off();

        let safety_time = self.model.safety_time();
        let events = self.events.clone();
        match sched::run_after(safety_time, move || {
            // Delivered to the control thread; execution happens there.
            let _ = events.send(LiftEvent::SafetyTimeout);
        }) {
            Ok(timer) => {
                self.safety_timer = Some(timer);
                engage.on();
                self.state = next;
                info!("lift state {prev:?} -> {next:?}, safety timer {safety_time:?} armed");
            }
            Err(e) => {
                // Unbounded motion is not acceptable: abandon the move.
                error!("cannot arm safety timer ({e}), refusing to move");
                self.model.raise_motor.off();
                self.model.lower_motor.off();
                self.state = LiftState::Stopped;
            }
        }
    }

    /// Exit `Rising`/`Lowering` by any path: kill the watchdog, both
    /// motors off, then run the destination's entry action.
    fn stop_motion(&mut self, next: LiftState) {
        let prev = self.state;
        self.cancel_safety_timer();
        self.model.raise_motor.off();
        self.model.lower_motor.off();
        self.state = next;
        info!("lift state {prev:?} -> {next:?}");
        if next == LiftState::StoppedAtTop {
            self.model.lock_door_top.off();
            info!("top landing door lock released");
        }
    }

    /// Exit action of a stationary state before motion starts.
    fn exit_stationary(&mut self, state: LiftState) {
        if state == LiftState::StoppedAtTop {
            self.model.lock_door_top.on();
            info!("top landing door lock re-engaged");
        }
    }

    /// Idempotent: a fired or already-cancelled timer is a no-op.
    fn cancel_safety_timer(&mut self) {
        if let Some(timer) = self.safety_timer.take() {
            timer.cancel();
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimInput, SimOutput};
    use lift_common::io::DigitalOutput;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    struct Rig {
        machine: LiftStateMachine,
        events: Receiver<LiftEvent>,
        estop_1: Arc<SimInput>,
        upper_limit: Arc<SimInput>,
        lower_limit: Arc<SimInput>,
        upper_door: Arc<SimInput>,
        raise_motor: Arc<SimOutput>,
        lower_motor: Arc<SimOutput>,
        lock_top: Arc<SimOutput>,
        lock_bottom: Arc<SimOutput>,
    }

    impl Rig {
        fn motors(&self) -> (bool, bool) {
            (self.raise_motor.is_on(), self.lower_motor.is_on())
        }
    }

    /// Machine ready to move: estops released, doors closed, limits clear.
    fn rig() -> Rig {
        rig_with_safety_time(Duration::from_secs(23))
    }

    fn rig_with_safety_time(safety_time: Duration) -> Rig {
        let estop_1 = Arc::new(SimInput::new("estop_1", false));
        let estop_2 = Arc::new(SimInput::new("estop_2", false));
        let lower_limit = Arc::new(SimInput::new("lower_limit", false));
        let upper_limit = Arc::new(SimInput::new("upper_limit", false));
        let upper_door = Arc::new(SimInput::new("upper_door_closed", true));
        let lower_door = Arc::new(SimInput::new("lower_door_closed", true));
        let raise_motor = Arc::new(SimOutput::new("raise_motor"));
        let lower_motor = Arc::new(SimOutput::new("lower_motor"));
        let lock_top = Arc::new(SimOutput::new("lock_door_top"));
        let lock_bottom = Arc::new(SimOutput::new("lock_door_bottom"));

        let model = LiftModel::new(
            estop_1.clone(),
            estop_2,
            lower_limit.clone(),
            upper_limit.clone(),
            upper_door.clone(),
            lower_door,
            raise_motor.clone(),
            lower_motor.clone(),
            lock_top.clone(),
            lock_bottom.clone(),
            safety_time,
        )
        .expect("model");

        let (tx, events) = mpsc::channel();
        let machine = LiftStateMachine::new(model, tx);
        Rig {
            machine,
            events,
            estop_1,
            upper_limit,
            lower_limit,
            upper_door,
            raise_motor,
            lower_motor,
            lock_top,
            lock_bottom,
        }
    }

    /// Drive a ready rig to `Rising` (platform on the bottom limit).
    fn rig_rising() -> Rig {
        let mut r = rig();
        r.machine.initialise();
        r.lower_limit.set(true);
        r.machine.handle(LiftEvent::StopLowering); // ignored: not lowering
        // Reach StoppedAtBottom properly: call -> Lowering, limit trips.
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Lowering);
        r.machine.handle(LiftEvent::StopLowering);
        assert_eq!(r.machine.state(), LiftState::StoppedAtBottom);
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Rising);
        r
    }

    #[test]
    fn power_on_engages_both_door_locks() {
        let r = rig();
        assert_eq!(r.machine.state(), LiftState::TurnedOn);
        assert!(r.lock_top.is_on());
        assert!(r.lock_bottom.is_on());
    }

    #[test]
    fn initialise_reaches_stopped_with_locks_engaged() {
        let mut r = rig();
        r.machine.initialise();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert!(r.lock_top.is_on());
        assert!(r.lock_bottom.is_on());
        assert_eq!(r.motors(), (false, false));
    }

    #[test]
    fn second_initialise_is_ignored() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.initialise();
        assert_eq!(r.machine.state(), LiftState::Stopped);
    }

    #[test]
    fn call_refused_while_interlocked() {
        let mut r = rig();
        r.machine.initialise();
        r.upper_door.set(false);
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
        assert!(!r.machine.has_safety_timer());
    }

    #[test]
    fn call_from_unknown_position_lowers() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Lowering);
        assert_eq!(r.motors(), (false, true));
        assert!(r.machine.has_safety_timer());
    }

    #[test]
    fn call_from_bottom_limit_rises() {
        let r = rig_rising();
        assert_eq!(r.motors(), (true, false));
        assert!(r.machine.has_safety_timer());
    }

    #[test]
    fn call_from_top_limit_lowers_and_relocks_door() {
        let mut r = rig_rising();
        r.upper_limit.set(true);
        r.machine.stop_rising();
        assert_eq!(r.machine.state(), LiftState::StoppedAtTop);
        assert!(!r.lock_top.is_on(), "top lock released at top landing");

        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Lowering);
        assert!(r.lock_top.is_on(), "top lock re-engaged before moving");
        assert_eq!(r.motors(), (false, true));
    }

    #[test]
    fn call_while_moving_stops() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Lowering);
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
        assert!(!r.machine.has_safety_timer());
    }

    #[test]
    fn stop_rising_requires_the_limit() {
        let mut r = rig_rising();
        // Limit not active: event is a no-op, keep rising.
        r.machine.stop_rising();
        assert_eq!(r.machine.state(), LiftState::Rising);

        r.upper_limit.set(true);
        r.machine.stop_rising();
        assert_eq!(r.machine.state(), LiftState::StoppedAtTop);
        assert_eq!(r.motors(), (false, false));
        assert!(!r.machine.has_safety_timer());
    }

    #[test]
    fn stop_lowering_requires_the_limit() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.call();
        r.machine.stop_lowering();
        assert_eq!(r.machine.state(), LiftState::Lowering);

        r.lower_limit.set(true);
        r.machine.stop_lowering();
        assert_eq!(r.machine.state(), LiftState::StoppedAtBottom);
    }

    #[test]
    fn door_opening_interrupts_motion() {
        let mut r = rig_rising();
        r.machine.door_opens();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
        assert!(!r.machine.has_safety_timer());
    }

    #[test]
    fn estop_interrupts_motion_regardless_of_limits() {
        let mut r = rig_rising();
        // Even with the limit active, estop wins and goes to plain Stopped.
        r.upper_limit.set(true);
        r.estop_1.set(true);
        r.machine.estop_pressed();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
    }

    #[test]
    fn safety_edges_are_internal_while_stationary() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.door_opens();
        r.machine.estop_pressed();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
    }

    #[test]
    fn safety_timeout_forces_stop() {
        let mut r = rig_rising();
        r.machine.safety_timeout();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
        assert!(!r.machine.has_safety_timer());
    }

    #[test]
    fn stale_safety_timeout_is_ignored_when_stationary() {
        let mut r = rig();
        r.machine.initialise();
        r.machine.safety_timeout();
        assert_eq!(r.machine.state(), LiftState::Stopped);
    }

    #[test]
    fn watchdog_event_is_delivered_through_the_channel() {
        let mut r = rig_with_safety_time(Duration::from_millis(50));
        r.machine.initialise();
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Lowering);

        let event = r
            .events
            .recv_timeout(Duration::from_secs(2))
            .expect("watchdog should fire");
        assert_eq!(event, LiftEvent::SafetyTimeout);

        r.machine.handle(event);
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
    }

    #[test]
    fn cancelled_watchdog_never_fires() {
        let mut r = rig_with_safety_time(Duration::from_millis(80));
        r.machine.initialise();
        r.machine.call();
        r.machine.call(); // stop: cancels the watchdog
        assert_eq!(
            r.events.recv_timeout(Duration::from_millis(300)),
            Err(mpsc::RecvTimeoutError::Timeout),
            "no SafetyTimeout may arrive after cancellation"
        );
    }

    #[test]
    fn stuck_limits_refuse_the_call() {
        let mut r = rig();
        r.machine.initialise();
        r.upper_limit.set(true);
        r.lower_limit.set(true);
        r.machine.call();
        assert_eq!(r.machine.state(), LiftState::Stopped);
        assert_eq!(r.motors(), (false, false));
    }

    #[test]
    fn motors_are_never_both_on() {
        let mut r = rig();
        r.machine.initialise();
        let script = [
            LiftEvent::Call,
            LiftEvent::StopLowering,
            LiftEvent::Call,
            LiftEvent::StopRising,
            LiftEvent::Call,
            LiftEvent::DoorOpens,
            LiftEvent::Call,
            LiftEvent::EstopPressed,
            LiftEvent::SafetyTimeout,
            LiftEvent::Call,
        ];
        r.lower_limit.set(true);
        for event in script {
            r.machine.handle(event);
            let (raise, lower) = r.motors();
            assert!(
                !(raise && lower),
                "both motors on after {event:?} in {:?}",
                r.machine.state()
            );
        }
    }

    #[test]
    fn timer_exists_iff_moving() {
        let mut r = rig();
        r.machine.initialise();
        assert!(!r.machine.has_safety_timer());

        r.machine.call();
        assert!(r.machine.state().is_moving());
        assert!(r.machine.has_safety_timer());

        r.lower_limit.set(true);
        r.machine.stop_lowering();
        assert!(!r.machine.state().is_moving());
        assert!(!r.machine.has_safety_timer());

        r.machine.call();
        assert!(r.machine.has_safety_timer());
        r.machine.estop_pressed();
        assert!(!r.machine.has_safety_timer());
    }
}
