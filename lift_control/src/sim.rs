//! Simulation I/O backend.
//!
//! Software stand-ins for the lift's digital inputs and outputs, used by the
//! controller binary in simulation mode, by the bench harness, and by every
//! test. A [`SimInput`] fires its registered edge handler when `set()`
//! changes the level — calling `set()` from another thread reproduces the
//! interrupt-source threading of a real GPIO backend.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lift_common::io::{DigitalInput, DigitalOutput, EdgeHandler, IoError};

// ─── Inputs ─────────────────────────────────────────────────────────

/// Simulated digital input with edge detection.
pub struct SimInput {
    name: String,
    level: Mutex<bool>,
    rising: Mutex<Option<EdgeHandler>>,
    falling: Mutex<Option<EdgeHandler>>,
}

impl SimInput {
    pub fn new(name: &str, initial: bool) -> Self {
        Self {
            name: name.to_string(),
            level: Mutex::new(initial),
            rising: Mutex::new(None),
            falling: Mutex::new(None),
        }
    }

    /// Drive the input to `level`, firing the matching edge handler if the
    /// level actually changes. A repeated `set()` to the same level fires
    /// nothing — one handler invocation per physical edge.
    pub fn set(&self, level: bool) {
        {
            let mut current = self.level.lock().expect("sim input level lock");
            if *current == level {
                return;
            }
            *current = level;
        }
        // Handler runs outside the level lock so it may read the input.
        let slot = if level { &self.rising } else { &self.falling };
        if let Some(handler) = slot.lock().expect("sim input handler lock").as_ref() {
            handler();
        }
    }

    /// Current level, without going through the trait's fallible read.
    pub fn get(&self) -> bool {
        *self.level.lock().expect("sim input level lock")
    }

    /// Invert the current level (bench-harness convenience).
    pub fn toggle(&self) {
        self.set(!self.get());
    }
}

impl DigitalInput for SimInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<bool, IoError> {
        Ok(*self.level.lock().expect("sim input level lock"))
    }

    fn on_rising(&self, handler: EdgeHandler) {
        *self.rising.lock().expect("sim input handler lock") = Some(handler);
    }

    fn on_falling(&self, handler: EdgeHandler) {
        *self.falling.lock().expect("sim input handler lock") = Some(handler);
    }
}

// ─── Outputs ────────────────────────────────────────────────────────

/// Simulated digital output tracking the last commanded level.
pub struct SimOutput {
    name: String,
    level: AtomicBool,
}

impl SimOutput {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: AtomicBool::new(false),
        }
    }
}

impl DigitalOutput for SimOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn on(&self) {
        self.level.store(true, Ordering::SeqCst);
    }

    fn off(&self) {
        self.level.store(false, Ordering::SeqCst);
    }

    fn is_on(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}
