//! Edge dispatcher: marshals interrupt-thread edge callbacks onto the
//! single control thread.
//!
//! Sensor edge handlers run on the I/O backend's interrupt-source thread
//! and must never touch the state machine. Each handler posts a
//! [`LiftEvent`] onto an unbounded FIFO channel; [`run`] is the single
//! consumer, replaying events into the machine on the control thread.
//!
//! Ordering: events from the same sensor are delivered in edge-occurrence
//! order (FIFO channel, one handler per edge). Events from different
//! sensors interleave in arrival order but never execute concurrently.
//! The channel is unbounded, so a burst of edges can never silently drop a
//! safety-relevant event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::debug;

use lift_common::io::EdgeHandler;

use crate::model::LiftModel;
use crate::state::{LiftEvent, LiftStateMachine};

/// How often the control loop re-checks the shutdown flag while idle.
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// Producer side of the control-thread event channel.
///
/// Cheap to clone handlers out of; the receiver half belongs to the
/// control loop.
pub struct EventBus {
    tx: Sender<LiftEvent>,
}

impl EventBus {
    /// Create the bus and its consumer end.
    pub fn channel() -> (Self, Receiver<LiftEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// A sender for code that posts events directly (e.g. the watchdog).
    pub fn sender(&self) -> Sender<LiftEvent> {
        self.tx.clone()
    }

    /// Post an event from the current thread.
    pub fn post(&self, event: LiftEvent) {
        let _ = self.tx.send(event);
    }

    /// Manufacture an edge handler that posts `event`. Safe to invoke from
    /// the interrupt-source thread; never blocks.
    pub fn edge_handler(&self, event: LiftEvent) -> EdgeHandler {
        let tx = self.tx.clone();
        Box::new(move || {
            let _ = tx.send(event);
        })
    }
}

/// Register the model's hardware edges with the bus.
///
/// - estop rising → `EstopPressed`
/// - limit rising → `StopRising` / `StopLowering`
/// - door-closed falling → `DoorOpens`
pub fn wire_edges(model: &LiftModel, bus: &EventBus) {
    model
        .estop_1
        .on_rising(bus.edge_handler(LiftEvent::EstopPressed));
    model
        .estop_2
        .on_rising(bus.edge_handler(LiftEvent::EstopPressed));
    model
        .upper_limit
        .on_rising(bus.edge_handler(LiftEvent::StopRising));
    model
        .lower_limit
        .on_rising(bus.edge_handler(LiftEvent::StopLowering));
    model
        .upper_door_closed
        .on_falling(bus.edge_handler(LiftEvent::DoorOpens));
    model
        .lower_door_closed
        .on_falling(bus.edge_handler(LiftEvent::DoorOpens));
}

/// The control loop: replay events into the machine until `running` is
/// cleared or every sender is gone.
///
/// This is the single writer of all machine state and actuator commands.
/// The wait is cooperative — no spinning.
pub fn run(machine: &mut LiftStateMachine, events: &Receiver<LiftEvent>, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(IDLE_POLL) {
            Ok(event) => machine.handle(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("event bus disconnected, control loop exiting");
                break;
            }
        }
    }
}
