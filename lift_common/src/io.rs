//! Digital sensor/actuator traits consumed by the lift control core.
//!
//! This module defines:
//! - `DigitalInput` trait - Polled boolean sensor with edge-handler hooks
//! - `DigitalOutput` trait - Boolean actuator with idempotent commands
//! - `EdgeHandler` type alias - Callback invoked from the interrupt source
//! - `IoError` enum - Error type for I/O reads
//!
//! # Threading contract
//!
//! Edge handlers are invoked by the backend on its own interrupt-source
//! thread, never on the control thread. A handler must therefore be cheap
//! and non-blocking; in this workspace every handler just posts an event
//! onto the control-thread channel. Handlers fire at most once per physical
//! edge, after hardware-level debounce.

use thiserror::Error;

/// Error types for digital I/O operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IoError {
    /// The underlying device could not be read.
    ///
    /// Every guard in the control core treats a failed read as *unsafe*:
    /// an unreadable door sensor is an open door, an unreadable estop is a
    /// pressed estop.
    #[error("input '{name}' read failed: {reason}")]
    ReadFailed { name: String, reason: String },
}

/// Callback registered for a sensor edge.
///
/// Invoked by the I/O backend from its interrupt-source thread, at most once
/// per physical edge. Must not block.
pub type EdgeHandler = Box<dyn Fn() + Send + Sync>;

/// A polled boolean input that can also report edges.
///
/// `read()` returns the last debounced level. At most one rising-edge and
/// one falling-edge handler can be registered; registering again replaces
/// the previous handler for that edge.
pub trait DigitalInput: Send + Sync {
    /// Wiring name of this input (e.g. "estop_1").
    fn name(&self) -> &str;

    /// Last debounced level of the input.
    fn read(&self) -> Result<bool, IoError>;

    /// Register the low→high edge handler, replacing any previous one.
    fn on_rising(&self, handler: EdgeHandler);

    /// Register the high→low edge handler, replacing any previous one.
    fn on_falling(&self, handler: EdgeHandler);
}

/// A boolean output with idempotent commands.
///
/// `is_on()` reflects the last *commanded* level, not a physical
/// confirmation of the actuator state.
pub trait DigitalOutput: Send + Sync {
    /// Wiring name of this output (e.g. "raise_motor").
    fn name(&self) -> &str;

    /// Command the output active. Repeating the command is a no-op.
    fn on(&self);

    /// Command the output inactive. Repeating the command is a no-op.
    fn off(&self);

    /// Last commanded level.
    fn is_on(&self) -> bool;
}
