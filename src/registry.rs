//! Line registry: owns every hardware line handle for the process lifetime.
//!
//! Built once at start-up from a static [`HeaderLayout`].  Each header
//! slot gets exactly one [`PinRecord`]; slots wired to a GPIO line also
//! get the opened handle.  A failed open only fails its own slot.
//!
//! Write ownership of a line is tracked per record.  The foreground owns
//! every line by default; the pulse controller takes a [`LineLease`] for
//! the duration of a job, which locks foreground writes and mode changes
//! out of that line until the lease drops.
//!
//! Each handle holds a single level callback, so at most one change
//! notifier may be attached to a registry at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};

use crate::app::ports::{GpioController, LineHandle};
use crate::error::{GpioError, HwError, Result};
use crate::pins::{HEADER_SLOTS, HeaderLayout};
use crate::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

/// Who may write a line right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Writer {
    Foreground,
    Pulse,
}

// ───────────────────────────────────────────────────────────────
// PinRecord
// ───────────────────────────────────────────────────────────────

/// One header slot and, if it carries a line, the opened handle.
pub struct PinRecord<H> {
    slot: PhysicalSlot,
    line: Option<LogicalLine>,
    label: &'static str,
    handle: Option<H>,
    open_error: Option<HwError>,
    writer: Mutex<Writer>,
}

impl<H: LineHandle> PinRecord<H> {
    pub fn slot(&self) -> PhysicalSlot {
        self.slot
    }

    pub fn line(&self) -> Option<LogicalLine> {
        self.line
    }

    /// Silkscreen label of the slot.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Why the open failed at start-up, if it did.
    pub fn open_error(&self) -> Option<HwError> {
        self.open_error
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether the pulse controller currently owns writes to this line.
    pub fn is_leased(&self) -> bool {
        *self.lock_writer() == Writer::Pulse
    }

    /// Borrow the handle, or explain why there is none.
    pub fn handle(&self) -> Result<&H> {
        self.open_line().map(|(_, handle)| handle)
    }

    fn open_line(&self) -> Result<(LogicalLine, &H)> {
        match (self.line, &self.handle) {
            (None, _) => Err(GpioError::Unassigned(self.slot)),
            (Some(line), None) => Err(GpioError::LineNotOpen(line)),
            (Some(line), Some(handle)) => Ok((line, handle)),
        }
    }

    /// Run a foreground mutation while holding the writer lock.
    /// Fails with `LineBusy` if the line is leased.
    pub(crate) fn with_foreground<T>(&self, op: impl FnOnce(LogicalLine, &H) -> Result<T>) -> Result<T> {
        let (line, handle) = self.open_line()?;
        let writer = self.lock_writer();
        if *writer == Writer::Pulse {
            return Err(GpioError::LineBusy(line));
        }
        let out = op(line, handle);
        drop(writer);
        out
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// LineRegistry
// ───────────────────────────────────────────────────────────────

pub struct LineRegistry<C: GpioController> {
    controller: C,
    layout: &'static HeaderLayout,
    records: [PinRecord<C::Line>; HEADER_SLOTS],
    observed: AtomicBool,
}

impl<C: GpioController> LineRegistry<C> {
    /// Build the registry from a discovered controller.
    ///
    /// `None` means discovery found nothing: that is fatal and is
    /// returned as [`GpioError::ControllerUnavailable`], never retried.
    pub fn initialize(controller: Option<C>, layout: &'static HeaderLayout) -> Result<Self> {
        info!("Begin initialize GPIO controller ({})", layout.name);
        let Some(controller) = controller else {
            error!("GPIO controller not found");
            return Err(GpioError::ControllerUnavailable);
        };
        info!("GPIO controller line count: {}", controller.line_count());

        let records = Self::open_all(&controller, layout);
        let registry = Self {
            controller,
            layout,
            records,
            observed: AtomicBool::new(false),
        };

        for record in registry.mapped() {
            let (Some(line), Ok(handle)) = (record.line, record.handle()) else {
                continue;
            };
            match (handle.drive_mode(), handle.read()) {
                (Ok(mode), Ok(level)) => {
                    info!("{} ({}) drive mode: {} level: {}", line, record.slot, mode, level);
                }
                (Err(e), _) | (_, Err(e)) => warn!("{}: initial state unreadable: {}", record.slot, e),
            }
        }
        info!(
            "End initialize GPIO controller: {} open, {} failed",
            registry.mapped().filter(|r| r.is_open()).count(),
            registry.failed_opens().count()
        );
        Ok(registry)
    }

    /// Open every line named in `layout` exactly once.
    ///
    /// The result is indexed by slot (`slot - 1`).  Each open is
    /// independent: a failure is logged and kept on that slot's record.
    pub fn open_all(controller: &C, layout: &'static HeaderLayout) -> [PinRecord<C::Line>; HEADER_SLOTS] {
        let line_count = controller.line_count();
        core::array::from_fn(|i| {
            let entry = &layout.slots[i];
            let opened = entry.line.map(|line| {
                if u16::from(line.0) >= line_count {
                    Err(HwError::LineOutOfRange)
                } else {
                    controller.open(line)
                }
            });
            let (handle, open_error) = match opened {
                None => (None, None),
                Some(Ok(handle)) => (Some(handle), None),
                Some(Err(e)) => {
                    warn!("{} ({}): open failed: {}", entry.label, entry.slot, e);
                    (None, Some(e))
                }
            };
            PinRecord {
                slot: entry.slot,
                line: entry.line,
                label: entry.label,
                handle,
                open_error,
                writer: Mutex::new(Writer::Foreground),
            }
        })
    }

    pub fn get_by_logical(&self, line: LogicalLine) -> Result<&PinRecord<C::Line>> {
        self.index_of(line).map(|i| &self.records[i])
    }

    pub fn get_by_physical(&self, slot: PhysicalSlot) -> Result<&PinRecord<C::Line>> {
        slot.index()
            .map(|i| &self.records[i])
            .ok_or(GpioError::SlotNotFound(slot))
    }

    /// All 40 records in header order.
    pub fn records(&self) -> impl Iterator<Item = &PinRecord<C::Line>> {
        self.records.iter()
    }

    /// Records that carry a line, opened or not.
    pub fn mapped(&self) -> impl Iterator<Item = &PinRecord<C::Line>> {
        self.records.iter().filter(|r| r.line.is_some())
    }

    /// Records whose open failed at start-up.
    pub fn failed_opens(&self) -> impl Iterator<Item = &PinRecord<C::Line>> {
        self.records.iter().filter(|r| r.open_error.is_some())
    }

    pub fn layout(&self) -> &'static HeaderLayout {
        self.layout
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Take exclusive write ownership of `line` for a background writer.
    pub fn lease(self: &Arc<Self>, line: LogicalLine) -> Result<LineLease<C>> {
        let index = self.index_of(line)?;
        let record = &self.records[index];
        record.handle()?;
        let mut writer = record.lock_writer();
        if *writer == Writer::Pulse {
            return Err(GpioError::LineBusy(line));
        }
        *writer = Writer::Pulse;
        drop(writer);
        Ok(LineLease {
            registry: Arc::clone(self),
            index,
            line,
        })
    }

    /// Reserve the line callbacks for one notifier.
    pub(crate) fn claim_observer(&self) -> Result<()> {
        self.observed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| GpioError::ObserverAttached)
    }

    pub(crate) fn release_observer(&self) {
        self.observed.store(false, Ordering::Release);
    }

    /// Whether a change notifier currently owns the line callbacks.
    pub fn is_observed(&self) -> bool {
        self.observed.load(Ordering::Acquire)
    }

    fn index_of(&self, line: LogicalLine) -> Result<usize> {
        self.layout
            .slot_of(line)
            .and_then(PhysicalSlot::index)
            .ok_or(GpioError::LineNotFound(line))
    }
}

// ───────────────────────────────────────────────────────────────
// LineLease
// ───────────────────────────────────────────────────────────────

/// Exclusive write access to one line, released on drop.
///
/// Holds the registry alive, so it can move onto a worker thread; the
/// handle itself stays owned by the registry.
pub struct LineLease<C: GpioController> {
    registry: Arc<LineRegistry<C>>,
    index: usize,
    line: LogicalLine,
}

impl<C: GpioController> LineLease<C> {
    pub fn line(&self) -> LogicalLine {
        self.line
    }

    pub fn write(&self, level: Level) -> Result<()> {
        let record = self.record();
        let _writer = record.lock_writer();
        record.handle()?.write(level).map_err(GpioError::from)
    }

    pub fn read(&self) -> Result<Level> {
        self.record().handle()?.read().map_err(GpioError::from)
    }

    pub fn drive_mode(&self) -> Result<DriveMode> {
        self.record().handle()?.drive_mode().map_err(GpioError::from)
    }

    fn record(&self) -> &PinRecord<C::Line> {
        &self.registry.records[self.index]
    }
}

impl<C: GpioController> Drop for LineLease<C> {
    fn drop(&mut self) {
        *self.record().lock_writer() = Writer::Foreground;
    }
}
