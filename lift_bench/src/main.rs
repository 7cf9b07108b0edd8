//! # Lift Bench
//!
//! Interactive bench harness for the lift controller.
//!
//! Runs the real state machine against the simulation I/O backend and
//! lets an operator flip sensors from the terminal, standing in for the
//! physical rig. The control loop runs on its own thread, exactly as in
//! the production binary; stdin plays the interrupt source.

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use lift_common::io::{DigitalInput, DigitalOutput};
use lift_control::dispatch::{self, EventBus};
use lift_control::model::LiftModel;
use lift_control::sim::{SimInput, SimOutput};
use lift_control::state::{LiftEvent, LiftStateMachine};

/// Lift Bench — interactive simulation rig for the lift controller
#[derive(Parser, Debug)]
#[command(name = "lift_bench")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Drive the lift controller from a terminal against simulated I/O")]
struct Args {
    /// Motion watchdog window in seconds.
    #[arg(long, default_value_t = 23.0)]
    safety_time: f64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,
}

struct Bench {
    inputs: Vec<Arc<SimInput>>,
    outputs: Vec<Arc<SimOutput>>,
    call_button: Arc<SimInput>,
}

impl Bench {
    fn input(&self, name: &str) -> Option<&Arc<SimInput>> {
        self.inputs.iter().find(|i| i.name() == name)
    }

    fn print_status(&self) {
        println!("inputs:");
        for input in &self.inputs {
            println!("  {:<18} {}", input.name(), on_off(input.get()));
        }
        println!("outputs:");
        for output in &self.outputs {
            println!("  {:<18} {}", output.name(), on_off(output.is_on()));
        }
    }
}

fn on_off(level: bool) -> &'static str {
    if level { "ON" } else { "off" }
}

fn print_help() {
    println!("commands:");
    println!("  c             press and release the call button");
    println!("  t <input>     toggle an input");
    println!("  on <input>    drive an input high");
    println!("  off <input>   drive an input low");
    println!("  s             show input/output levels");
    println!("  h             this help");
    println!("  q             quit");
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    info!("Lift Bench v{} starting...", env!("CARGO_PKG_VERSION"));

    // ── Simulated rig: estops released, doors closed, platform mid-shaft ──
    let estop_1 = Arc::new(SimInput::new("estop_1", false));
    let estop_2 = Arc::new(SimInput::new("estop_2", false));
    let lower_limit = Arc::new(SimInput::new("lower_limit", false));
    let upper_limit = Arc::new(SimInput::new("upper_limit", false));
    let upper_door_closed = Arc::new(SimInput::new("upper_door_closed", true));
    let lower_door_closed = Arc::new(SimInput::new("lower_door_closed", true));
    let call_button = Arc::new(SimInput::new("call_button", false));

    let raise_motor = Arc::new(SimOutput::new("raise_motor"));
    let lower_motor = Arc::new(SimOutput::new("lower_motor"));
    let lock_door_top = Arc::new(SimOutput::new("lock_door_top"));
    let lock_door_bottom = Arc::new(SimOutput::new("lock_door_bottom"));

    let model = match LiftModel::new(
        estop_1.clone(),
        estop_2.clone(),
        lower_limit.clone(),
        upper_limit.clone(),
        upper_door_closed.clone(),
        lower_door_closed.clone(),
        raise_motor.clone(),
        lower_motor.clone(),
        lock_door_top.clone(),
        lock_door_bottom.clone(),
        Duration::from_secs_f64(args.safety_time),
    ) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("bad arguments: {e}");
            std::process::exit(1);
        }
    };

    let (bus, events) = EventBus::channel();
    dispatch::wire_edges(&model, &bus);
    call_button.on_rising(bus.edge_handler(LiftEvent::Call));

    let mut machine = LiftStateMachine::new(model, bus.sender());
    machine.initialise();
    info!("Controller initialised, state={:?}", machine.state());

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let control = thread::spawn(move || {
        dispatch::run(&mut machine, &events, &flag);
        machine.state()
    });

    let bench = Bench {
        inputs: vec![
            estop_1,
            estop_2,
            lower_limit,
            upper_limit,
            upper_door_closed,
            lower_door_closed,
            call_button.clone(),
        ],
        outputs: vec![raise_motor, lower_motor, lock_door_top, lock_door_bottom],
        call_button,
    };

    print_help();
    repl(&bench);

    running.store(false, Ordering::SeqCst);
    drop(bus);
    match control.join() {
        Ok(state) => info!("Control loop stopped, final state={:?}", state),
        Err(_) => eprintln!("control thread panicked"),
    }
}

/// Read commands from stdin until `q` or end of input.
fn repl(bench: &Bench) {
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some(word) => word,
            None => continue,
        };

        match (command, words.next()) {
            ("q", _) => break,
            ("h", _) => print_help(),
            ("s", _) => bench.print_status(),
            ("c", _) => {
                // Momentary push-button: rising edge posts the call.
                bench.call_button.set(true);
                bench.call_button.set(false);
            }
            ("t", Some(name)) => match bench.input(name) {
                Some(input) => {
                    input.toggle();
                    println!("{} -> {}", input.name(), on_off(input.get()));
                }
                None => println!("no such input: {name}"),
            },
            ("on" | "off", Some(name)) => match bench.input(name) {
                Some(input) => {
                    input.set(command == "on");
                    println!("{} -> {}", input.name(), on_off(input.get()));
                }
                None => println!("no such input: {name}"),
            },
            ("t" | "on" | "off", None) => println!("usage: {command} <input>"),
            _ => println!("unknown command (h for help)"),
        }
    }
}
