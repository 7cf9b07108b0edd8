//! # Lift Common Library
//!
//! Shared abstractions for the dumb-waiter lift controller workspace.
//!
//! The control core never talks to hardware directly: it is written against
//! the [`io::DigitalInput`] / [`io::DigitalOutput`] traits defined here, and
//! I/O backends (simulation today, GPIO hardware later) plug in underneath.
//! This mirrors the split between the control logic and the pin wiring on the
//! bench: the logic must not care whether a "door closed" level comes from a
//! reed switch or a terminal command.

pub mod io;
