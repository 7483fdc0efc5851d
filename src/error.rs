//! Unified error types for gpiotool.
//!
//! A single `GpioError` enum covers every fallible operation in the core,
//! so the service and the console loop handle failures uniformly.  All
//! variants are `Copy`; they travel back from the pulse worker thread and
//! into `AppEvent::CommandFailed` without allocation.

use core::fmt;

use crate::types::{DriveMode, LogicalLine, PhysicalSlot};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// No GPIO controller was discovered.  Fatal at start-up.
    ControllerUnavailable,
    /// The logical line is not part of the wiring table.
    LineNotFound(LogicalLine),
    /// The slot number is outside 1..=40.
    SlotNotFound(PhysicalSlot),
    /// The slot exists but carries no GPIO line (power, ground, reserved).
    Unassigned(PhysicalSlot),
    /// The line is in the table but its open failed at start-up.
    LineNotOpen(LogicalLine),
    /// A pulse job is already running on the given line.
    AlreadyRunning(LogicalLine),
    /// Stop was requested with no pulse job running.
    NoActiveJob,
    /// Low/high intervals must both be positive.
    InvalidInterval { low_ms: i64, high_ms: i64 },
    /// The selection cannot move away from a line that is pulsing.
    PulseActive(LogicalLine),
    /// The line is leased to the pulse worker.
    LineBusy(LogicalLine),
    /// The write policy requires Output mode for level writes.
    NotAnOutput(LogicalLine),
    /// The command needs a line and the session has none selected.
    NoSelection,
    /// The background worker thread could not be created.
    WorkerSpawn,
    /// The background worker thread panicked.
    WorkerPanicked,
    /// A change notifier is already subscribed to the registry's lines.
    ObserverAttached,
    /// Configuration is invalid.
    Config(&'static str),
    /// The hardware backend reported a failure.
    Hardware(HwError),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControllerUnavailable => write!(f, "GPIO controller not found"),
            Self::LineNotFound(line) => write!(f, "{line} is not on the header"),
            Self::SlotNotFound(slot) => write!(f, "{slot} does not exist"),
            Self::Unassigned(slot) => write!(f, "{slot} carries no GPIO line"),
            Self::LineNotOpen(line) => write!(f, "{line} failed to open at start-up"),
            Self::AlreadyRunning(line) => write!(f, "pulse generator already running on {line}"),
            Self::NoActiveJob => write!(f, "no pulse generator running"),
            Self::InvalidInterval { low_ms, high_ms } => {
                write!(f, "invalid pulse interval low={low_ms}ms high={high_ms}ms")
            }
            Self::PulseActive(line) => write!(f, "stop the pulse on {line} before switching lines"),
            Self::LineBusy(line) => write!(f, "{line} is driven by the pulse generator"),
            Self::NotAnOutput(line) => write!(f, "{line} is not in output mode"),
            Self::NoSelection => write!(f, "no line selected"),
            Self::WorkerSpawn => write!(f, "worker thread creation failed"),
            Self::WorkerPanicked => write!(f, "worker thread panicked"),
            Self::ObserverAttached => write!(f, "a level watcher is already attached"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
        }
    }
}

impl std::error::Error for GpioError {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`LineHandle`](crate::app::ports::LineHandle)
/// or [`GpioController`](crate::app::ports::GpioController) backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// The line is already claimed by another consumer.
    AlreadyClaimed,
    /// The line number exceeds the controller's line count.
    LineOutOfRange,
    /// Reading the line value failed.
    ReadFailed,
    /// Writing the line value failed.
    WriteFailed,
    /// The backend cannot put the line in this drive mode.
    ModeUnsupported(DriveMode),
    /// Edge-event subscription failed.
    SubscribeFailed,
    /// OS-level failure with its errno.
    Os(i32),
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyClaimed => write!(f, "line already claimed"),
            Self::LineOutOfRange => write!(f, "line out of controller range"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ModeUnsupported(mode) => write!(f, "drive mode {mode} unsupported"),
            Self::SubscribeFailed => write!(f, "edge subscription failed"),
            Self::Os(errno) => write!(f, "os error {errno}"),
        }
    }
}

impl From<HwError> for GpioError {
    fn from(e: HwError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, GpioError>;
