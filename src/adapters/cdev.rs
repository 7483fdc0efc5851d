//! Linux GPIO character-device controller (`/dev/gpiochipN`).
//!
//! Each opened line is its own `gpiocdev` request, so lines fail and
//! reconfigure independently.  Level changes are reported two ways:
//!
//! - input modes: kernel edge events, read by a per-line watcher thread;
//! - output mode: the write itself, fired from the writing thread.
//!
//! The kernel refuses value writes on an input line.  Writes in an input
//! mode therefore only update the stored latch, which is driven out the
//! next time the line becomes an output.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use gpiocdev::line::{Bias, Direction, EdgeDetection, EdgeKind, Value};
use gpiocdev::request::{Config, Request};
use log::{info, warn};

use crate::app::ports::{GpioController, LevelCallback, LineHandle};
use crate::error::HwError;
use crate::task::spawn_worker;
use crate::types::{DriveMode, Level, LogicalLine};

/// How long a watcher blocks before re-checking its stop flag.
const EDGE_POLL: Duration = Duration::from_millis(100);

const WATCHER_STACK_KB: usize = 16;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

const fn to_value(level: Level) -> Value {
    match level {
        Level::High => Value::Active,
        Level::Low => Value::Inactive,
    }
}

const fn from_value(value: Value) -> Level {
    match value {
        Value::Active => Level::High,
        Value::Inactive => Level::Low,
    }
}

// ───────────────────────────────────────────────────────────────
// CdevController
// ───────────────────────────────────────────────────────────────

pub struct CdevController {
    path: PathBuf,
    consumer: String,
    line_count: u16,
}

impl CdevController {
    /// Probe `chip_path`.  `None` if the chip cannot be opened.
    pub fn discover(chip_path: impl AsRef<Path>, consumer: &str) -> Option<Self> {
        let path = chip_path.as_ref();
        let chip = match gpiocdev::chip::Chip::from_path(path) {
            Ok(chip) => chip,
            Err(e) => {
                warn!("cdev: {} unavailable: {}", path.display(), e);
                return None;
            }
        };
        let info = match chip.info() {
            Ok(info) => info,
            Err(e) => {
                warn!("cdev: {} info failed: {}", path.display(), e);
                return None;
            }
        };
        info!("cdev: {} ({}) with {} lines", info.name, info.label, info.num_lines);
        Some(Self {
            path: path.to_path_buf(),
            consumer: consumer.to_owned(),
            line_count: u16::try_from(info.num_lines).unwrap_or(u16::MAX),
        })
    }

    fn initial_mode(&self, offset: u32) -> DriveMode {
        let info = gpiocdev::chip::Chip::from_path(&self.path).and_then(|chip| chip.line_info(offset));
        match info {
            Ok(info) if info.direction == Direction::Output => DriveMode::Output,
            Ok(info) => match info.bias {
                Some(Bias::PullUp) => DriveMode::InputPullUp,
                Some(Bias::PullDown) => DriveMode::InputPullDown,
                _ => DriveMode::Input,
            },
            Err(_) => DriveMode::Input,
        }
    }
}

impl GpioController for CdevController {
    type Line = CdevLine;

    fn line_count(&self) -> u16 {
        self.line_count
    }

    fn open(&self, line: LogicalLine) -> Result<CdevLine, HwError> {
        let offset = u32::from(line.0);
        let mode = self.initial_mode(offset);
        let request = Request::builder()
            .on_chip(&self.path)
            .with_consumer(self.consumer.as_str())
            .with_line(offset)
            .request()
            .map_err(|e| {
                warn!("cdev: request {} failed: {}", line, e);
                HwError::AlreadyClaimed
            })?;
        let request = Arc::new(request);
        let latch = request.value(offset).map(from_value).unwrap_or(Level::Low);
        Ok(CdevLine {
            offset,
            request,
            state: Mutex::new(CdevState { mode, latch }),
            callback: Arc::new(Mutex::new(None)),
            watcher: Mutex::new(None),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// CdevLine
// ───────────────────────────────────────────────────────────────

struct CdevState {
    mode: DriveMode,
    latch: Level,
}

struct EdgeWatcher {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

type SharedCallback = Arc<Mutex<Option<LevelCallback>>>;

pub struct CdevLine {
    offset: u32,
    request: Arc<Request>,
    state: Mutex<CdevState>,
    callback: SharedCallback,
    watcher: Mutex<Option<EdgeWatcher>>,
}

impl CdevLine {
    fn line_config(&self, mode: DriveMode, latch: Level) -> Config {
        let mut config = self.request.config();
        let line = config.with_line(self.offset);
        let edges = lock(&self.callback).is_some();
        match mode {
            DriveMode::Output => {
                line.as_output(to_value(latch)).with_edge_detection(None::<EdgeDetection>);
            }
            DriveMode::Input | DriveMode::InputPullUp | DriveMode::InputPullDown => {
                let bias = match mode {
                    DriveMode::InputPullUp => Bias::PullUp,
                    DriveMode::InputPullDown => Bias::PullDown,
                    _ => Bias::Disabled,
                };
                line.as_input()
                    .with_bias(bias)
                    .with_edge_detection(edges.then_some(EdgeDetection::BothEdges));
            }
        }
        config
    }

    fn reconfigure(&self, mode: DriveMode, latch: Level) -> Result<(), HwError> {
        let config = self.line_config(mode, latch);
        self.request.reconfigure(&config).map_err(|e| {
            warn!("cdev: reconfigure line {} to {} failed: {}", self.offset, mode, e);
            HwError::ModeUnsupported(mode)
        })
    }

    fn notify(&self, level: Level) {
        let callback = lock(&self.callback).clone();
        if let Some(cb) = callback {
            cb(level);
        }
    }

    fn stop_watcher(&self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.stop.store(true, Ordering::Release);
            if watcher.thread.join().is_err() {
                warn!("cdev: edge watcher for line {} panicked", self.offset);
            }
        }
    }
}

impl LineHandle for CdevLine {
    fn read(&self) -> Result<Level, HwError> {
        self.request
            .value(self.offset)
            .map(from_value)
            .map_err(|_| HwError::ReadFailed)
    }

    fn write(&self, level: Level) -> Result<(), HwError> {
        let mut state = lock(&self.state);
        let changed = state.latch != level;
        if state.mode == DriveMode::Output {
            self.request
                .set_value(self.offset, to_value(level))
                .map_err(|_| HwError::WriteFailed)?;
        }
        state.latch = level;
        let fire = changed && state.mode == DriveMode::Output;
        drop(state);
        if fire {
            self.notify(level);
        }
        Ok(())
    }

    fn drive_mode(&self) -> Result<DriveMode, HwError> {
        Ok(lock(&self.state).mode)
    }

    fn set_drive_mode(&self, mode: DriveMode) -> Result<(), HwError> {
        let mut state = lock(&self.state);
        self.reconfigure(mode, state.latch)?;
        state.mode = mode;
        Ok(())
    }

    fn subscribe(&self, callback: LevelCallback) -> Result<(), HwError> {
        self.stop_watcher();
        *lock(&self.callback) = Some(callback);
        let (mode, latch) = {
            let state = lock(&self.state);
            (state.mode, state.latch)
        };
        self.reconfigure(mode, latch).map_err(|_| HwError::SubscribeFailed)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            let request = Arc::clone(&self.request);
            let callback = Arc::clone(&self.callback);
            let offset = self.offset;
            let name = format!("gpio-edge-{offset}");
            spawn_worker(&name, WATCHER_STACK_KB, move || watch_edges(&request, &callback, &stop))
                .map_err(|_| HwError::SubscribeFailed)?
        };
        *lock(&self.watcher) = Some(EdgeWatcher { stop, thread });
        Ok(())
    }

    fn unsubscribe(&self) {
        self.stop_watcher();
        *lock(&self.callback) = None;
    }
}

impl Drop for CdevLine {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

fn watch_edges(request: &Request, callback: &SharedCallback, stop: &AtomicBool) {
    while !stop.load(Ordering::Acquire) {
        match request.wait_edge_event(EDGE_POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("cdev: edge wait failed: {}", e);
                return;
            }
        }
        let event = match request.read_edge_event() {
            Ok(event) => event,
            Err(e) => {
                warn!("cdev: edge read failed: {}", e);
                continue;
            }
        };
        let level = match event.kind {
            EdgeKind::Rising => Level::High,
            EdgeKind::Falling => Level::Low,
        };
        let cb = lock(callback).clone();
        if let Some(cb) = cb {
            cb(level);
        }
    }
}
