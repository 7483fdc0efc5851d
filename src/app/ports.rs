//! Port traits: the hexagonal boundary between the GPIO core and the outside world.
//!
//! ```text
//!   Hardware adapter ──▶ GpioController / LineHandle ──▶ core
//!   core ──▶ LevelObserver / EventSink ──▶ presentation
//! ```
//!
//! Driven adapters (sim, cdev) implement the hardware traits.  The core
//! consumes them via generics, so registry, accessor, notifier and pulse
//! controller never touch a device directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use std::sync::Arc;

use crate::error::HwError;
use crate::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

// ───────────────────────────────────────────────────────────────
// Hardware ports (driven adapters: core → hardware)
// ───────────────────────────────────────────────────────────────

/// Callback invoked by a [`LineHandle`] when its level changes.
///
/// Runs on the handle's own execution context (an edge-event thread, an
/// interrupt dispatcher, or the simulating thread).  Must not block.
pub type LevelCallback = Arc<dyn Fn(Level) + Send + Sync>;

/// A discovered GPIO controller.
///
/// Each adapter also provides its own `discover()` constructor returning
/// `Option<Self>`; `None` means no controller is present on this machine.
pub trait GpioController: Send + Sync + 'static {
    type Line: LineHandle;

    /// Number of lines the controller exposes.
    fn line_count(&self) -> u16;

    /// Claim a line.  The line keeps its hardware-default drive mode.
    fn open(&self, line: LogicalLine) -> Result<Self::Line, HwError>;
}

/// An opened line.  Methods take `&self`: the handle is shared between
/// the foreground and the pulse worker, with exclusion enforced above
/// this layer by the registry.
pub trait LineHandle: Send + Sync + 'static {
    /// Current electrical level; valid in any drive mode.
    fn read(&self) -> Result<Level, HwError>;

    /// Set the output latch.
    fn write(&self, level: Level) -> Result<(), HwError>;

    fn drive_mode(&self) -> Result<DriveMode, HwError>;

    fn set_drive_mode(&self, mode: DriveMode) -> Result<(), HwError>;

    /// Register the level-change callback, replacing any previous one.
    fn subscribe(&self, callback: LevelCallback) -> Result<(), HwError>;

    /// Remove the level-change callback.  No-op when none is registered.
    fn unsubscribe(&self);
}

// ───────────────────────────────────────────────────────────────
// Level observer (driven adapter: core → presentation)
// ───────────────────────────────────────────────────────────────

/// Receives level changes, keyed by header slot, from the
/// [`ChangeNotifier`](crate::notifier::ChangeNotifier).
///
/// Called on the notifier's dispatcher thread, never on the hardware
/// context.
pub trait LevelObserver: Send + 'static {
    fn on_level_changed(&mut self, slot: PhysicalSlot, level: Level);
}

impl<F> LevelObserver for F
where
    F: FnMut(PhysicalSlot, Level) + Send + 'static,
{
    fn on_level_changed(&mut self, slot: PhysicalSlot, level: Level) {
        self(slot, level);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / presentation)
// ───────────────────────────────────────────────────────────────

/// The service emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, UI list, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
