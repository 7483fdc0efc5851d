//! Mock GPIO controller for integration tests.
//!
//! Records every open, write and subscription with a timestamp so tests
//! can assert on the full call history, and injects failures per line.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use gpiotool::app::events::AppEvent;
use gpiotool::app::ports::{EventSink, GpioController, LevelCallback, LineHandle};
use gpiotool::error::HwError;
use gpiotool::types::{DriveMode, Level, LogicalLine};

// ── Per-line state ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub at: Instant,
    pub level: Level,
}

struct LineState {
    mode: DriveMode,
    level: Level,
    writes: Vec<WriteRecord>,
    callback: Option<LevelCallback>,
    /// Writes succeed this many more times, then fail.
    writes_left: Option<usize>,
    fail_reads: bool,
    opens: u32,
    open_error: Option<HwError>,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            mode: DriveMode::Input,
            level: Level::Low,
            writes: Vec::new(),
            callback: None,
            writes_left: None,
            fail_reads: false,
            opens: 0,
            open_error: None,
        }
    }
}

type Shared = Arc<Mutex<LineState>>;

fn lock(s: &Shared) -> MutexGuard<'_, LineState> {
    s.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── MockController ────────────────────────────────────────────

pub struct MockController {
    lines: Vec<Shared>,
}

#[allow(dead_code)]
impl MockController {
    pub fn new(line_count: u16) -> Self {
        Self {
            lines: (0..line_count).map(|_| Shared::default()).collect(),
        }
    }

    /// Make opening `line` fail with `err`.
    pub fn refuse_open(self, line: LogicalLine, err: HwError) -> Self {
        lock(&self.lines[usize::from(line.0)]).open_error = Some(err);
        self
    }

    /// A probe on `line`; stays valid after the controller moves into a registry.
    pub fn probe(&self, line: LogicalLine) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.lines[usize::from(line.0)]),
        }
    }
}

impl GpioController for MockController {
    type Line = MockLine;

    fn line_count(&self) -> u16 {
        self.lines.len() as u16
    }

    fn open(&self, line: LogicalLine) -> Result<MockLine, HwError> {
        let shared = self
            .lines
            .get(usize::from(line.0))
            .ok_or(HwError::LineOutOfRange)?;
        let mut state = lock(shared);
        state.opens += 1;
        if let Some(err) = state.open_error {
            return Err(err);
        }
        Ok(MockLine {
            state: Arc::clone(shared),
        })
    }
}

// ── MockLine ──────────────────────────────────────────────────

pub struct MockLine {
    state: Shared,
}

impl LineHandle for MockLine {
    fn read(&self) -> Result<Level, HwError> {
        let state = lock(&self.state);
        if state.fail_reads {
            return Err(HwError::ReadFailed);
        }
        Ok(state.level)
    }

    fn write(&self, level: Level) -> Result<(), HwError> {
        let mut state = lock(&self.state);
        if let Some(left) = state.writes_left.as_mut() {
            if *left == 0 {
                return Err(HwError::WriteFailed);
            }
            *left -= 1;
        }
        state.writes.push(WriteRecord {
            at: Instant::now(),
            level,
        });
        state.level = level;
        Ok(())
    }

    fn drive_mode(&self) -> Result<DriveMode, HwError> {
        Ok(lock(&self.state).mode)
    }

    fn set_drive_mode(&self, mode: DriveMode) -> Result<(), HwError> {
        lock(&self.state).mode = mode;
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

// ── MockProbe ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockProbe {
    state: Shared,
}

#[allow(dead_code)]
impl MockProbe {
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.state).writes.clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state).writes.len()
    }

    pub fn opens(&self) -> u32 {
        lock(&self.state).opens
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.state).callback.is_some()
    }

    pub fn fail_writes_after(&self, n: usize) {
        lock(&self.state).writes_left = Some(n);
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    /// Simulate an edge seen by the hardware.
    pub fn edge(&self, level: Level) {
        let callback = {
            let mut state = lock(&self.state);
            state.level = level;
            state.callback.clone()
        };
        if let Some(cb) = callback {
            cb(level);
        }
    }
}

// ── LogSink ──────────────────────────────────────────────────

pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn rendered(&self) -> Vec<String> {
        self.events.iter().map(|e| format!("{:?}", e)).collect()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
