//! Outbound application events.
//!
//! The [`GpioService`](super::service::GpioService) emits these through
//! the [`EventSink`](super::ports::EventSink) port after every command.
//! Adapters on the other side decide what to do with them: log them,
//! append them to a UI list, and so on.

use crate::error::GpioError;
use crate::pulse::{PulseReport, PulseTiming};
use crate::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The session selection moved.
    LineSelected { line: LogicalLine, slot: PhysicalSlot },

    LevelRead { line: LogicalLine, level: Level },

    LevelWritten { line: LogicalLine, level: Level },

    DriveModeChanged { line: LogicalLine, mode: DriveMode },

    PulseStarted { line: LogicalLine, timing: PulseTiming },

    PulseStopped(PulseReport),

    /// A command was rejected or hit a hardware failure.
    CommandFailed(GpioError),
}
