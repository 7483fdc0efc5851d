//! Simulated GPIO controller.
//!
//! Stands in for real hardware on the host: the console binary runs on it
//! when no character device is configured, and every test drives it.
//!
//! ## Electrical model
//!
//! | Mode          | `read()` returns                           |
//! |---------------|--------------------------------------------|
//! | Output        | the latch                                  |
//! | InputPullUp   | external drive, else High                  |
//! | InputPullDown | external drive, else Low                   |
//! | Input         | external drive, else the latch (floating)  |
//!
//! Writes always update the latch, in any mode, so a floating input
//! reads back what was last written.  Level-change callbacks fire on the
//! thread that caused the change, after the line state lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use heapless::HistoryBuffer;
use log::info;

use crate::app::ports::{GpioController, LevelCallback, LineHandle};
use crate::error::HwError;
use crate::types::{DriveMode, Level, LogicalLine};

/// Lines exposed by the simulated BCM2835-style controller.
pub const SIM_LINE_COUNT: u16 = 28;

/// Writes remembered per line.
const HISTORY_DEPTH: usize = 256;

/// A timestamped write seen by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimWrite {
    pub at: Instant,
    pub level: Level,
}

struct SimLineState {
    mode: DriveMode,
    latch: Level,
    external: Option<Level>,
    history: HistoryBuffer<SimWrite, HISTORY_DEPTH>,
    callback: Option<LevelCallback>,
    fail_writes: bool,
}

impl SimLineState {
    fn new() -> Self {
        Self {
            mode: DriveMode::Input,
            latch: Level::Low,
            external: None,
            history: HistoryBuffer::new(),
            callback: None,
            fail_writes: false,
        }
    }

    fn effective(&self) -> Level {
        match self.mode {
            DriveMode::Output => self.latch,
            DriveMode::InputPullUp => self.external.unwrap_or(Level::High),
            DriveMode::InputPullDown => self.external.unwrap_or(Level::Low),
            DriveMode::Input => self.external.unwrap_or(self.latch),
        }
    }
}

type SharedLine = Arc<Mutex<SimLineState>>;

fn lock(line: &SharedLine) -> MutexGuard<'_, SimLineState> {
    line.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply `change` and fire the callback if the observable level moved.
fn mutate(line: &SharedLine, change: impl FnOnce(&mut SimLineState)) {
    let mut state = lock(line);
    let before = state.effective();
    change(&mut state);
    let after = state.effective();
    let callback = (before != after).then(|| state.callback.clone()).flatten();
    drop(state);
    if let Some(cb) = callback {
        cb(after);
    }
}

// ───────────────────────────────────────────────────────────────
// SimController
// ───────────────────────────────────────────────────────────────

pub struct SimController {
    lines: Vec<SharedLine>,
    claimed: Mutex<Vec<bool>>,
}

impl SimController {
    pub fn new(line_count: u16) -> Self {
        let count = usize::from(line_count);
        Self {
            lines: (0..count).map(|_| Arc::new(Mutex::new(SimLineState::new()))).collect(),
            claimed: Mutex::new(vec![false; count]),
        }
    }

    /// The simulator is always present.
    pub fn discover() -> Option<Self> {
        info!("sim: GPIO controller with {} lines", SIM_LINE_COUNT);
        Some(Self::new(SIM_LINE_COUNT))
    }

    /// Mark lines as held by another consumer, so opening them fails.
    #[must_use]
    pub fn with_claimed(self, lines: &[LogicalLine]) -> Self {
        {
            let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
            for line in lines {
                if let Some(slot) = claimed.get_mut(usize::from(line.0)) {
                    *slot = true;
                }
            }
        }
        self
    }

    /// Test and bench access to a line's electrical state.
    pub fn probe(&self, line: LogicalLine) -> Option<SimProbe> {
        self.lines
            .get(usize::from(line.0))
            .map(|state| SimProbe { state: Arc::clone(state) })
    }
}

impl GpioController for SimController {
    type Line = SimLine;

    fn line_count(&self) -> u16 {
        self.lines.len() as u16
    }

    fn open(&self, line: LogicalLine) -> Result<SimLine, HwError> {
        let idx = usize::from(line.0);
        let state = self.lines.get(idx).ok_or(HwError::LineOutOfRange)?;
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed[idx] {
            return Err(HwError::AlreadyClaimed);
        }
        claimed[idx] = true;
        Ok(SimLine {
            state: Arc::clone(state),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// SimLine
// ───────────────────────────────────────────────────────────────

pub struct SimLine {
    state: SharedLine,
}

impl LineHandle for SimLine {
    fn read(&self) -> Result<Level, HwError> {
        Ok(lock(&self.state).effective())
    }

    fn write(&self, level: Level) -> Result<(), HwError> {
        if lock(&self.state).fail_writes {
            return Err(HwError::WriteFailed);
        }
        mutate(&self.state, |s| {
            s.latch = level;
            s.history.write(SimWrite {
                at: Instant::now(),
                level,
            });
        });
        Ok(())
    }

    fn drive_mode(&self) -> Result<DriveMode, HwError> {
        Ok(lock(&self.state).mode)
    }

    fn set_drive_mode(&self, mode: DriveMode) -> Result<(), HwError> {
        mutate(&self.state, |s| s.mode = mode);
        Ok(())
    }

    fn subscribe(&self, callback: LevelCallback) -> Result<(), HwError> {
        lock(&self.state).callback = Some(callback);
        Ok(())
    }

    fn unsubscribe(&self) {
        lock(&self.state).callback = None;
    }
}

// ───────────────────────────────────────────────────────────────
// SimProbe
// ───────────────────────────────────────────────────────────────

/// Bench-side view of a simulated line: drive it from outside and
/// inspect what the core wrote.
#[derive(Clone)]
pub struct SimProbe {
    state: SharedLine,
}

impl SimProbe {
    /// Drive the pin from outside the board; `None` releases it.
    pub fn drive_external(&self, level: Option<Level>) {
        mutate(&self.state, |s| s.external = level);
    }

    /// Make subsequent writes fail with [`HwError::WriteFailed`].
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// Recorded writes, oldest first.
    pub fn writes(&self) -> Vec<SimWrite> {
        lock(&self.state).history.oldest_ordered().copied().collect()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state).history.len()
    }

    pub fn clear_history(&self) {
        lock(&self.state).history.clear();
    }

    pub fn latch(&self) -> Level {
        lock(&self.state).latch
    }
}
