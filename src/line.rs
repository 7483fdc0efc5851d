//! Line state accessor: drive mode and level on a single registry record.
//!
//! The accessor never owns a handle; it borrows one from a [`PinRecord`]
//! for the duration of a call.  Mutations go through the record's writer
//! lock, so they fail with `LineBusy` while the pulse controller holds
//! the line.

use serde::{Deserialize, Serialize};

use crate::app::ports::LineHandle;
use crate::error::{GpioError, Result};
use crate::registry::PinRecord;
use crate::types::{DriveMode, DriveModeClass, Level, LogicalLine};

/// Whether level writes require the line to be in Output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritePolicy {
    /// Write in any mode.  On an input the latch still changes and a
    /// floating line reads it back.
    #[default]
    Permissive,
    /// Reject writes unless the line is an output.
    RequireOutput,
}

/// Classify a drive mode for UI gating.  Output is the only writable mode.
pub const fn drive_mode_class(mode: DriveMode) -> DriveModeClass {
    match mode {
        DriveMode::Output => DriveModeClass::Writable,
        DriveMode::Input | DriveMode::InputPullUp | DriveMode::InputPullDown => DriveModeClass::Readable,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineAccessor {
    policy: WritePolicy,
}

impl LineAccessor {
    pub fn new(policy: WritePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn read_level<H: LineHandle>(&self, record: &PinRecord<H>) -> Result<Level> {
        Ok(record.handle()?.read()?)
    }

    pub fn drive_mode<H: LineHandle>(&self, record: &PinRecord<H>) -> Result<DriveMode> {
        Ok(record.handle()?.drive_mode()?)
    }

    pub fn set_drive_mode<H: LineHandle>(&self, record: &PinRecord<H>, mode: DriveMode) -> Result<()> {
        record.with_foreground(|_, handle| Ok(handle.set_drive_mode(mode)?))
    }

    pub fn write_level<H: LineHandle>(&self, record: &PinRecord<H>, level: Level) -> Result<()> {
        let policy = self.policy;
        record.with_foreground(|line, handle| {
            ensure_writable(policy, handle, line)?;
            Ok(handle.write(level)?)
        })
    }
}

/// Apply `policy` to a line about to be written.
pub(crate) fn ensure_writable<H: LineHandle>(
    policy: WritePolicy,
    handle: &H,
    line: LogicalLine,
) -> Result<()> {
    if policy == WritePolicy::RequireOutput && !drive_mode_class(handle.drive_mode()?).is_writable() {
        return Err(GpioError::NotAnOutput(line));
    }
    Ok(())
}
