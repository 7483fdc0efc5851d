//! gpiotool: console front end.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                      │
//! │                                                              │
//! │  SimController / CdevController   LogEventSink   console_log │
//! │  (GpioController + LineHandle)    (EventSink)    (log::Log)  │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  GpioService                                           │  │
//! │  │  LineRegistry · LineAccessor · PulseController         │  │
//! │  │  ChangeNotifier ──▶ level log                          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads one command per line from stdin.  Type `help` for the list.
#![deny(unused_must_use)]

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

use gpiotool::GpioError;
use gpiotool::adapters::console_log;
use gpiotool::adapters::log_sink::LogEventSink;
use gpiotool::app::commands::GpioCommand;
use gpiotool::app::ports::GpioController;
use gpiotool::app::service::{CommandOutcome, GpioService};
use gpiotool::app::session::Session;
use gpiotool::config::{CONFIG_ENV, ToolConfig};
use gpiotool::registry::LineRegistry;
use gpiotool::types::{Level, PhysicalSlot};

const HELP: &str = "\
commands:
  list                                   show every GPIO slot
  select <line>                          choose the current line
  read   [line]                          read the level
  write  [line] <high|low|1|0>           set the level
  mode   [line] <input|pullup|pulldown|output>
  pulse  [line] [low_ms high_ms]         start the square wave
  stop                                   stop the square wave
  help | quit";

// ── Config ────────────────────────────────────────────────────

fn load_config() -> Result<ToolConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(ToolConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = ToolConfig::from_json(&text).with_context(|| format!("parsing {path}"))?;
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Config + logging ───────────────────────────────────
    let config = load_config()?;
    console_log::init(config.log_level());

    info!("gpiotool v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Discover the controller ────────────────────────────
    #[cfg(feature = "cdev")]
    let controller = gpiotool::adapters::cdev::CdevController::discover(&config.chip_path, &config.consumer);
    #[cfg(not(feature = "cdev"))]
    let controller = gpiotool::adapters::sim::SimController::discover();

    run(controller, &config)
}

fn run<C: GpioController>(controller: Option<C>, config: &ToolConfig) -> Result<()> {
    // ── 3. Registry (fatal without a controller) ──────────────
    let registry = match LineRegistry::initialize(controller, config.header.layout()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("start-up failed: {}", e);
            return Err(e.into());
        }
    };

    // ── 4. Service + level watcher ────────────────────────────
    let service = GpioService::new(Arc::clone(&registry), config)?;
    let _notifier = service.watch(|slot: PhysicalSlot, level: Level| info!("EDGE | {} -> {}", slot, level))?;

    let mut session = Session::new();
    let mut sink = LogEventSink::new();

    info!("Ready. Type 'help' for commands.");

    // ── 5. Command loop ───────────────────────────────────────
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" | "?" => {
                writeln!(stdout, "{HELP}")?;
                continue;
            }
            _ => {}
        }

        let cmd = match GpioCommand::parse(input) {
            Ok(cmd) => cmd,
            Err(e) => {
                writeln!(stdout, "? {e}")?;
                continue;
            }
        };
        match service.execute(&mut session, cmd, &mut sink) {
            Ok(outcome) => print_outcome(&mut stdout, &outcome)?,
            Err(e) => writeln!(stdout, "! {e}")?,
        }
    }

    // ── 6. Shutdown ───────────────────────────────────────────
    match service.stop_pulse() {
        Ok(report) => info!("stopped pulse on {} after {} cycles", report.line, report.cycles),
        Err(GpioError::NoActiveJob) => {}
        Err(e) => warn!("pulse ended with error: {}", e),
    }
    info!("bye");
    Ok(())
}

fn print_outcome(out: &mut impl Write, outcome: &CommandOutcome) -> std::io::Result<()> {
    match outcome {
        CommandOutcome::Pins(pins) => {
            for pin in pins {
                writeln!(out, "{pin}")?;
            }
            Ok(())
        }
        CommandOutcome::Selected(pin) => writeln!(out, "selected {pin}"),
        CommandOutcome::Level { line, level } => writeln!(out, "{line}: {level}"),
        CommandOutcome::Written { line, level } => writeln!(out, "{line} <- {level}"),
        CommandOutcome::ModeSet { line, mode } => writeln!(out, "{line} mode {mode}"),
        CommandOutcome::PulseStarted { line, timing } => writeln!(
            out,
            "pulsing {line}: low {}ms, high {}ms",
            timing.low_ms(),
            timing.high_ms()
        ),
        CommandOutcome::PulseStopped(report) => {
            writeln!(out, "stopped {} after {} cycles", report.line, report.cycles)
        }
    }
}
