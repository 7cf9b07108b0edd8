//! # Lift Control
//!
//! Controller process for the two-floor dumb-waiter.
//!
//! Loads the TOML configuration, builds the I/O backend, wires sensor edges
//! into the event dispatcher, and runs the single control thread until a
//! shutdown signal arrives. The heavy lifting lives in the library; this
//! binary is the thin process wrapper around it.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use lift_common::io::DigitalInput;
use lift_control::config::{IoBackend, LiftConfig, load_config};
use lift_control::dispatch::{self, EventBus};
use lift_control::model::LiftModel;
use lift_control::sim::{SimInput, SimOutput};
use lift_control::state::{LiftEvent, LiftStateMachine};

/// Lift Control — two-floor dumb-waiter controller
#[derive(Parser, Debug)]
#[command(name = "lift_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Safety-interlocked controller for a two-floor dumb-waiter lift")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(default_value = "config/lift.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Lift Control v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Lift Control shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        warn!(
            "No config file at {}, using defaults",
            args.config.display()
        );
        LiftConfig::default()
    };
    info!(
        "Config OK: safety_time={}s, backend={:?}",
        config.safety_time_s, config.backend
    );

    // ── I/O backend ──
    // Only the simulation backend is built in; a GPIO backend slots in
    // here once the cabinet wiring is final.
    let IoBackend::Simulation = config.backend;

    let estop_1 = Arc::new(SimInput::new("estop_1", false));
    let estop_2 = Arc::new(SimInput::new("estop_2", false));
    let lower_limit = Arc::new(SimInput::new("lower_limit", false));
    let upper_limit = Arc::new(SimInput::new("upper_limit", false));
    let upper_door_closed = Arc::new(SimInput::new("upper_door_closed", true));
    let lower_door_closed = Arc::new(SimInput::new("lower_door_closed", true));
    let call_button = Arc::new(SimInput::new("call_button", false));

    let model = LiftModel::new(
        estop_1,
        estop_2,
        lower_limit,
        upper_limit,
        upper_door_closed,
        lower_door_closed,
        Arc::new(SimOutput::new("raise_motor")),
        Arc::new(SimOutput::new("lower_motor")),
        Arc::new(SimOutput::new("lock_door_top")),
        Arc::new(SimOutput::new("lock_door_bottom")),
        config.safety_time(),
    )?;

    // ── Wiring ──
    let (bus, events) = EventBus::channel();
    dispatch::wire_edges(&model, &bus);
    // The call push-button lives outside the model; its rising edge is an
    // ordinary Call event.
    call_button.on_rising(bus.edge_handler(LiftEvent::Call));

    let mut machine = LiftStateMachine::new(model, bus.sender());
    machine.initialise();
    info!(
        "Controller initialised, state={:?}, interlocks={:?}",
        machine.state(),
        machine.model().interlocks()
    );

    // ── Shutdown handling ──
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    // ── Control loop (single writer of all machine state) ──
    dispatch::run(&mut machine, &events, &running);

    info!("Final state: {:?}", machine.state());
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
