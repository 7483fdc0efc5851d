//! Header wiring tables for the Raspberry Pi 40-pin expansion connector.
//!
//! Single source of truth for the slot → line mapping.  The tables are
//! board-specific constant data and are never computed at runtime.
//!
//! Two variants exist:
//!
//! | Variant | Lines                 | Slots 8 / 10            |
//! |---------|-----------------------|-------------------------|
//! | Default | 2..=13, 16..=27 (24)  | reserved for UART       |
//! | Full    | 2..=27 (26)           | GPIO 14 / GPIO 15       |

use serde::{Deserialize, Serialize};

use crate::types::{LogicalLine, PhysicalSlot};

/// Number of positions on the header.
pub const HEADER_SLOTS: usize = 40;

/// One position on the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSlot {
    pub slot: PhysicalSlot,
    pub line: Option<LogicalLine>,
    pub label: &'static str,
}

const fn gpio(slot: u8, line: u8, label: &'static str) -> HeaderSlot {
    HeaderSlot {
        slot: PhysicalSlot(slot),
        line: Some(LogicalLine(line)),
        label,
    }
}

const fn fixed(slot: u8, label: &'static str) -> HeaderSlot {
    HeaderSlot {
        slot: PhysicalSlot(slot),
        line: None,
        label,
    }
}

/// A complete header wiring table.
#[derive(Debug)]
pub struct HeaderLayout {
    pub name: &'static str,
    pub slots: [HeaderSlot; HEADER_SLOTS],
}

impl HeaderLayout {
    /// Table entry for `slot`, or `None` off the header.
    pub fn slot(&self, slot: PhysicalSlot) -> Option<&HeaderSlot> {
        slot.index().map(|i| &self.slots[i])
    }

    /// Reverse mapping: which slot carries `line`.
    pub fn slot_of(&self, line: LogicalLine) -> Option<PhysicalSlot> {
        self.slots
            .iter()
            .find(|s| s.line == Some(line))
            .map(|s| s.slot)
    }

    /// Every mapped line, in header order.
    pub fn lines(&self) -> impl Iterator<Item = (PhysicalSlot, LogicalLine)> + '_ {
        self.slots
            .iter()
            .filter_map(|s| s.line.map(|line| (s.slot, line)))
    }
}

// ---------------------------------------------------------------------------
// Raspberry Pi 40-pin header
// ---------------------------------------------------------------------------

/// Default layout.  GPIO 14/15 stay with the serial console.
pub static RPI_40PIN: HeaderLayout = HeaderLayout {
    name: "rpi-40pin",
    slots: [
        fixed(1, "3V3"),
        fixed(2, "5V"),
        gpio(3, 2, "GPIO2 (SDA1)"),
        fixed(4, "5V"),
        gpio(5, 3, "GPIO3 (SCL1)"),
        fixed(6, "GND"),
        gpio(7, 4, "GPIO4"),
        fixed(8, "TXD (reserved)"),
        fixed(9, "GND"),
        fixed(10, "RXD (reserved)"),
        gpio(11, 17, "GPIO17"),
        gpio(12, 18, "GPIO18"),
        gpio(13, 27, "GPIO27"),
        fixed(14, "GND"),
        gpio(15, 22, "GPIO22"),
        gpio(16, 23, "GPIO23"),
        fixed(17, "3V3"),
        gpio(18, 24, "GPIO24"),
        gpio(19, 10, "GPIO10 (MOSI)"),
        fixed(20, "GND"),
        gpio(21, 9, "GPIO9 (MISO)"),
        gpio(22, 25, "GPIO25"),
        gpio(23, 11, "GPIO11 (SCLK)"),
        gpio(24, 8, "GPIO8 (CE0)"),
        fixed(25, "GND"),
        gpio(26, 7, "GPIO7 (CE1)"),
        fixed(27, "ID_SD"),
        fixed(28, "ID_SC"),
        gpio(29, 5, "GPIO5"),
        fixed(30, "GND"),
        gpio(31, 6, "GPIO6"),
        gpio(32, 12, "GPIO12"),
        gpio(33, 13, "GPIO13"),
        fixed(34, "GND"),
        gpio(35, 19, "GPIO19"),
        gpio(36, 16, "GPIO16"),
        gpio(37, 26, "GPIO26"),
        gpio(38, 20, "GPIO20"),
        fixed(39, "GND"),
        gpio(40, 21, "GPIO21"),
    ],
};

/// Full layout.  GPIO 14/15 are handed over as plain lines.
pub static RPI_40PIN_FULL: HeaderLayout = HeaderLayout {
    name: "rpi-40pin-full",
    slots: [
        fixed(1, "3V3"),
        fixed(2, "5V"),
        gpio(3, 2, "GPIO2 (SDA1)"),
        fixed(4, "5V"),
        gpio(5, 3, "GPIO3 (SCL1)"),
        fixed(6, "GND"),
        gpio(7, 4, "GPIO4"),
        gpio(8, 14, "GPIO14 (TXD)"),
        fixed(9, "GND"),
        gpio(10, 15, "GPIO15 (RXD)"),
        gpio(11, 17, "GPIO17"),
        gpio(12, 18, "GPIO18"),
        gpio(13, 27, "GPIO27"),
        fixed(14, "GND"),
        gpio(15, 22, "GPIO22"),
        gpio(16, 23, "GPIO23"),
        fixed(17, "3V3"),
        gpio(18, 24, "GPIO24"),
        gpio(19, 10, "GPIO10 (MOSI)"),
        fixed(20, "GND"),
        gpio(21, 9, "GPIO9 (MISO)"),
        gpio(22, 25, "GPIO25"),
        gpio(23, 11, "GPIO11 (SCLK)"),
        gpio(24, 8, "GPIO8 (CE0)"),
        fixed(25, "GND"),
        gpio(26, 7, "GPIO7 (CE1)"),
        fixed(27, "ID_SD"),
        fixed(28, "ID_SC"),
        gpio(29, 5, "GPIO5"),
        fixed(30, "GND"),
        gpio(31, 6, "GPIO6"),
        gpio(32, 12, "GPIO12"),
        gpio(33, 13, "GPIO13"),
        fixed(34, "GND"),
        gpio(35, 19, "GPIO19"),
        gpio(36, 16, "GPIO16"),
        gpio(37, 26, "GPIO26"),
        gpio(38, 20, "GPIO20"),
        fixed(39, "GND"),
        gpio(40, 21, "GPIO21"),
    ],
};

/// Selects one of the static tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderVariant {
    #[default]
    Rpi40Pin,
    Rpi40PinFull,
}

impl HeaderVariant {
    pub fn layout(self) -> &'static HeaderLayout {
        match self {
            Self::Rpi40Pin => &RPI_40PIN,
            Self::Rpi40PinFull => &RPI_40PIN_FULL,
        }
    }
}
