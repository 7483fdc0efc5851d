//! Core value types shared by every component.

use core::fmt;

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

/// Hardware line number, independent of header position (BCM numbering
/// on the Raspberry Pi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalLine(pub u8);

impl fmt::Display for LogicalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO {}", self.0)
    }
}

/// Position on the 40-pin header connector (1..=40).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalSlot(pub u8);

impl PhysicalSlot {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 40;

    /// Zero-based index into a header table, if the slot is on the header.
    pub fn index(self) -> Option<usize> {
        (Self::FIRST..=Self::LAST)
            .contains(&self.0)
            .then(|| usize::from(self.0 - 1))
    }
}

impl fmt::Display for PhysicalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveMode {
    Input,
    InputPullUp,
    InputPullDown,
    Output,
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "Input",
            Self::InputPullUp => "InputPullUp",
            Self::InputPullDown => "InputPullDown",
            Self::Output => "Output",
        };
        f.write_str(name)
    }
}

/// What a caller may do with a line in a given drive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveModeClass {
    /// Sense only.
    Readable,
    /// Sense and drive.
    Writable,
}

impl DriveModeClass {
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Writable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::High => "High",
        })
    }
}

impl From<PinState> for Level {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => Self::Low,
            PinState::High => Self::High,
        }
    }
}

impl From<Level> for PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => PinState::Low,
            Level::High => PinState::High,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}
