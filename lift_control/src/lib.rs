//! # Lift Control Library
//!
//! Control core for a two-floor vertical lift (a mechanical dumb-waiter):
//! raises/lowers the platform, locks/unlocks the shaft doors, and enforces
//! the safety interlocks (emergency stop, door-closed, end-of-travel limits,
//! motion watchdog).
//!
//! ## Architecture
//!
//! 1. **`model`** — sensor/actuator references plus pure interlock guards
//! 2. **`state`** — the lift state machine (the decision engine)
//! 3. **`dispatch`** — bridges interrupt-thread edge callbacks onto the
//!    single control thread
//! 4. **`sched`** — cancellable one-shot timers for the motion watchdog
//! 5. **`sim`** — simulation I/O backend for tests and bench work
//!
//! ## Single-writer discipline
//!
//! One control thread owns all state-machine mutation and every actuator
//! command. Interrupt sources and the timer thread never call into the
//! machine; they post `LiftEvent`s through the dispatcher and the control
//! thread replays them in arrival order. Guard evaluation and actuator
//! commands are synchronous and bounded; the only suspension point in the
//! system is the control loop waiting for the next event.

pub mod config;
pub mod dispatch;
pub mod model;
pub mod sched;
pub mod sim;
pub mod state;
