//! Application service: the hexagonal core.
//!
//! [`GpioService`] owns the registry handle, the line accessor and the
//! pulse controller.  It exposes the query and command surface used by
//! presentation.  All hardware access flows through the port traits, so
//! the service runs unchanged against the simulator.
//!
//! ```text
//!  GpioCommand ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  + Session       │         GpioService          │
//!                  │ registry · accessor · pulse  │
//!  LevelObserver ◀─│ ChangeNotifier (watch)       │
//!                  └──────────────────────────────┘
//! ```

use core::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::config::ToolConfig;
use crate::error::{GpioError, Result};
use crate::line::LineAccessor;
use crate::notifier::ChangeNotifier;
use crate::pins::HEADER_SLOTS;
use crate::pulse::{PulseController, PulseReport, PulseStatus, PulseTiming};
use crate::registry::{LineRegistry, PinRecord};
use crate::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

use super::commands::GpioCommand;
use super::events::AppEvent;
use super::ports::{EventSink, GpioController, LevelObserver};
use super::session::Session;

// ───────────────────────────────────────────────────────────────
// Query rows and command outcomes
// ───────────────────────────────────────────────────────────────

/// One mapped header slot as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSummary {
    pub slot: PhysicalSlot,
    pub line: LogicalLine,
    pub label: &'static str,
    /// `None` when the line failed to open or could not be read.
    pub mode: Option<DriveMode>,
    pub level: Option<Level>,
    pub pulsing: bool,
}

impl fmt::Display for PinSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}  {:<7}", self.slot.to_string(), self.label)?;
        match (self.mode, self.level) {
            (Some(mode), Some(level)) => write!(f, "  {:<13}  {}", mode.to_string(), level)?,
            _ => write!(f, "  unavailable")?,
        }
        if self.pulsing {
            write!(f, "  [pulsing]")?;
        }
        Ok(())
    }
}

pub type PinList = heapless::Vec<PinSummary, HEADER_SLOTS>;

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Pins(PinList),
    Selected(PinSummary),
    Level { line: LogicalLine, level: Level },
    Written { line: LogicalLine, level: Level },
    ModeSet { line: LogicalLine, mode: DriveMode },
    PulseStarted { line: LogicalLine, timing: PulseTiming },
    PulseStopped(PulseReport),
}

// ───────────────────────────────────────────────────────────────
// GpioService
// ───────────────────────────────────────────────────────────────

pub struct GpioService<C: GpioController> {
    registry: Arc<LineRegistry<C>>,
    accessor: LineAccessor,
    pulse: PulseController<C>,
    default_timing: PulseTiming,
}

impl<C: GpioController> GpioService<C> {
    pub fn new(registry: Arc<LineRegistry<C>>, config: &ToolConfig) -> Result<Self> {
        config.validate()?;
        let default_timing = config.default_timing()?;
        let pulse = PulseController::new(Arc::clone(&registry), config.cancel_check, config.write_policy);
        info!(
            "GpioService ready ({}, {:?} writes, cancel check {:?})",
            registry.layout().name,
            config.write_policy,
            config.cancel_check
        );
        Ok(Self {
            registry,
            accessor: LineAccessor::new(config.write_policy),
            pulse,
            default_timing,
        })
    }

    pub fn registry(&self) -> &Arc<LineRegistry<C>> {
        &self.registry
    }

    pub fn default_timing(&self) -> PulseTiming {
        self.default_timing
    }

    // ── Queries ───────────────────────────────────────────────

    /// Every mapped slot in header order, opened or not.
    pub fn list_pins(&self) -> PinList {
        let mut pins = PinList::new();
        for record in self.registry.mapped() {
            if let Some(summary) = self.summarise(record) {
                // At most one row per slot.
                let _ = pins.push(summary);
            }
        }
        pins
    }

    pub fn pin(&self, line: LogicalLine) -> Result<PinSummary> {
        let record = self.registry.get_by_logical(line)?;
        self.summarise(record).ok_or(GpioError::LineNotFound(line))
    }

    pub fn read_level(&self, line: LogicalLine) -> Result<Level> {
        self.accessor.read_level(self.registry.get_by_logical(line)?)
    }

    pub fn drive_mode(&self, line: LogicalLine) -> Result<DriveMode> {
        self.accessor.drive_mode(self.registry.get_by_logical(line)?)
    }

    pub fn pulse_status(&self) -> PulseStatus {
        self.pulse.status()
    }

    // ── Commands ──────────────────────────────────────────────

    /// Move the session selection to `line`.
    ///
    /// The line must be open.  While a pulse runs, the selection may
    /// not move to a different line.
    pub fn select(&self, session: &mut Session, line: LogicalLine) -> Result<PinSummary> {
        let record = self.registry.get_by_logical(line)?;
        record.handle()?;
        if let Some(active) = self.pulse.active_line().filter(|&active| active != line) {
            return Err(GpioError::PulseActive(active));
        }
        session.set_selected(line);
        self.summarise(record).ok_or(GpioError::LineNotFound(line))
    }

    pub fn set_level(&self, line: LogicalLine, level: Level) -> Result<()> {
        self.accessor.write_level(self.registry.get_by_logical(line)?, level)
    }

    pub fn set_drive_mode(&self, line: LogicalLine, mode: DriveMode) -> Result<()> {
        self.accessor.set_drive_mode(self.registry.get_by_logical(line)?, mode)
    }

    pub fn start_pulse(&self, line: LogicalLine, timing: PulseTiming) -> Result<()> {
        self.registry.get_by_logical(line)?;
        self.pulse.start(line, timing)
    }

    pub fn stop_pulse(&self) -> Result<PulseReport> {
        self.pulse.stop()
    }

    /// Subscribe `observer` to level changes on every opened line.
    /// Changes stop when the returned notifier is dropped.
    ///
    /// Fails with [`GpioError::ObserverAttached`] while an earlier
    /// notifier is still alive.
    pub fn watch(&self, observer: impl LevelObserver) -> Result<ChangeNotifier<C>> {
        ChangeNotifier::start(&self.registry, observer)
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Run one command against `session`, reporting through `sink`.
    ///
    /// Failures are emitted as [`AppEvent::CommandFailed`] and returned.
    pub fn execute(
        &self,
        session: &mut Session,
        cmd: GpioCommand,
        sink: &mut impl EventSink,
    ) -> Result<CommandOutcome> {
        debug!("execute {:?}", cmd);
        let outcome = self.dispatch(session, cmd);
        match &outcome {
            Ok(done) => {
                if let Some(event) = event_for(done) {
                    sink.emit(&event);
                }
            }
            Err(e) => sink.emit(&AppEvent::CommandFailed(*e)),
        }
        outcome
    }

    fn dispatch(&self, session: &mut Session, cmd: GpioCommand) -> Result<CommandOutcome> {
        match cmd {
            GpioCommand::List => Ok(CommandOutcome::Pins(self.list_pins())),
            GpioCommand::Select(line) => self.select(session, line).map(CommandOutcome::Selected),
            GpioCommand::Read { line } => {
                let line = session.resolve(line)?;
                let level = self.read_level(line)?;
                Ok(CommandOutcome::Level { line, level })
            }
            GpioCommand::Write { line, level } => {
                let line = session.resolve(line)?;
                self.set_level(line, level)?;
                Ok(CommandOutcome::Written { line, level })
            }
            GpioCommand::SetMode { line, mode } => {
                let line = session.resolve(line)?;
                self.set_drive_mode(line, mode)?;
                Ok(CommandOutcome::ModeSet { line, mode })
            }
            GpioCommand::Pulse { line, intervals } => {
                let timing = match intervals {
                    Some((low_ms, high_ms)) => PulseTiming::from_millis(low_ms, high_ms)?,
                    None => self.default_timing,
                };
                let line = session.resolve(line)?;
                self.start_pulse(line, timing)?;
                // The selection follows the pulsing line, which it may not leave.
                session.set_selected(line);
                Ok(CommandOutcome::PulseStarted { line, timing })
            }
            GpioCommand::StopPulse => self.stop_pulse().map(CommandOutcome::PulseStopped),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn summarise(&self, record: &PinRecord<C::Line>) -> Option<PinSummary> {
        let line = record.line()?;
        Some(PinSummary {
            slot: record.slot(),
            line,
            label: record.label(),
            mode: self.accessor.drive_mode(record).ok(),
            level: self.accessor.read_level(record).ok(),
            pulsing: record.is_leased(),
        })
    }
}

/// The event a successful outcome reports, if any.
fn event_for(outcome: &CommandOutcome) -> Option<AppEvent> {
    match *outcome {
        CommandOutcome::Pins(_) => None,
        CommandOutcome::Selected(pin) => Some(AppEvent::LineSelected {
            line: pin.line,
            slot: pin.slot,
        }),
        CommandOutcome::Level { line, level } => Some(AppEvent::LevelRead { line, level }),
        CommandOutcome::Written { line, level } => Some(AppEvent::LevelWritten { line, level }),
        CommandOutcome::ModeSet { line, mode } => Some(AppEvent::DriveModeChanged { line, mode }),
        CommandOutcome::PulseStarted { line, timing } => Some(AppEvent::PulseStarted { line, timing }),
        CommandOutcome::PulseStopped(report) => Some(AppEvent::PulseStopped(report)),
    }
}
