//! Lift control model: sensor/actuator references and interlock guards.
//!
//! The model aggregates every I/O point the state machine acts on, plus the
//! configured motion watchdog window. Guards are pure functions of the
//! current sensor readings and are evaluated only on the control thread.
//!
//! # Fail-closed reads
//!
//! A failed sensor read is never treated as "safe":
//! - an unreadable estop counts as pressed, an unreadable door as open
//!   (the interlock bit is set);
//! - an unreadable limit switch counts as *tripped* when deciding whether
//!   to stop a motion, but as *not active* when deciding whether a motion
//!   may start — ambiguity stops the platform and never moves it.

use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use tracing::warn;

use lift_common::io::{DigitalInput, DigitalOutput};

use crate::config::ConfigError;

bitflags! {
    /// Conditions currently blocking movement. Empty ⇒ safe to move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterlockFlags: u8 {
        /// Emergency stop 1 active (or unreadable).
        const ESTOP_1         = 0x01;
        /// Emergency stop 2 active (or unreadable).
        const ESTOP_2         = 0x02;
        /// Upper landing door not confirmed closed.
        const UPPER_DOOR_OPEN = 0x04;
        /// Lower landing door not confirmed closed.
        const LOWER_DOOR_OPEN = 0x08;
    }
}

/// Sensor/actuator references and configuration for the lift.
///
/// Sensors and actuators are shared with the wiring code, but only the
/// state machine writes actuator commands.
pub struct LiftModel {
    pub estop_1: Arc<dyn DigitalInput>,
    pub estop_2: Arc<dyn DigitalInput>,
    pub lower_limit: Arc<dyn DigitalInput>,
    pub upper_limit: Arc<dyn DigitalInput>,
    pub upper_door_closed: Arc<dyn DigitalInput>,
    pub lower_door_closed: Arc<dyn DigitalInput>,

    pub raise_motor: Arc<dyn DigitalOutput>,
    pub lower_motor: Arc<dyn DigitalOutput>,
    pub lock_door_top: Arc<dyn DigitalOutput>,
    pub lock_door_bottom: Arc<dyn DigitalOutput>,

    safety_time: Duration,
}

impl LiftModel {
    /// Build the model. `safety_time` must be positive and larger than the
    /// expected travel time between the two landings.
    #[allow(clippy::too_many_arguments)] // mirrors the physical wiring list
    pub fn new(
        estop_1: Arc<dyn DigitalInput>,
        estop_2: Arc<dyn DigitalInput>,
        lower_limit: Arc<dyn DigitalInput>,
        upper_limit: Arc<dyn DigitalInput>,
        upper_door_closed: Arc<dyn DigitalInput>,
        lower_door_closed: Arc<dyn DigitalInput>,
        raise_motor: Arc<dyn DigitalOutput>,
        lower_motor: Arc<dyn DigitalOutput>,
        lock_door_top: Arc<dyn DigitalOutput>,
        lock_door_bottom: Arc<dyn DigitalOutput>,
        safety_time: Duration,
    ) -> Result<Self, ConfigError> {
        if safety_time.is_zero() {
            return Err(ConfigError::Validation(
                "safety_time must be positive".into(),
            ));
        }
        Ok(Self {
            estop_1,
            estop_2,
            lower_limit,
            upper_limit,
            upper_door_closed,
            lower_door_closed,
            raise_motor,
            lower_motor,
            lock_door_top,
            lock_door_bottom,
            safety_time,
        })
    }

    /// Configured motion watchdog window.
    pub fn safety_time(&self) -> Duration {
        self.safety_time
    }

    // ─── Guards ─────────────────────────────────────────────────────

    /// Everything currently blocking a move. Read failures set the
    /// corresponding bit.
    pub fn interlocks(&self) -> InterlockFlags {
        let mut flags = InterlockFlags::empty();
        if read_or(&self.estop_1, true) {
            flags |= InterlockFlags::ESTOP_1;
        }
        if read_or(&self.estop_2, true) {
            flags |= InterlockFlags::ESTOP_2;
        }
        if !read_or(&self.upper_door_closed, false) {
            flags |= InterlockFlags::UPPER_DOOR_OPEN;
        }
        if !read_or(&self.lower_door_closed, false) {
            flags |= InterlockFlags::LOWER_DOOR_OPEN;
        }
        flags
    }

    /// Both estops inactive and both shaft doors confirmed closed.
    pub fn safe_to_move(&self) -> bool {
        self.interlocks().is_empty()
    }

    /// Upper limit reads active. For *movement* decisions: an unreadable
    /// limit never grants a move.
    pub fn top_limit_active(&self) -> bool {
        read_or(&self.upper_limit, false)
    }

    /// Lower limit reads active. For *movement* decisions.
    pub fn bottom_limit_active(&self) -> bool {
        read_or(&self.lower_limit, false)
    }

    /// Upper limit confirms end of travel. For *stop* decisions: an
    /// unreadable limit stops the platform.
    pub fn top_limit_tripped(&self) -> bool {
        read_or(&self.upper_limit, true)
    }

    /// Lower limit confirms end of travel. For *stop* decisions.
    pub fn bottom_limit_tripped(&self) -> bool {
        read_or(&self.lower_limit, true)
    }
}

/// Read a sensor, substituting `on_error` (the fail-closed value for the
/// caller's context) if the read fails.
fn read_or(input: &Arc<dyn DigitalInput>, on_error: bool) -> bool {
    match input.read() {
        Ok(level) => level,
        Err(e) => {
            warn!("sensor read failed, failing closed: {e}");
            on_error
        }
    }
}
