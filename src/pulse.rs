//! Pulse controller: one square-wave generator on one output line.
//!
//! The generator runs on its own worker thread.  Inside that thread an
//! `edge_executor::LocalExecutor` drives a single async task that writes
//! Low, sleeps on an `async-io-mini` reactor timer, writes High, sleeps
//! again, and repeats until cancelled.
//!
//! ```text
//!  foreground                         gpio-pulse thread
//!  ──────────                         ─────────────────
//!  start(line, t) ── lease(line) ──▶  loop {
//!                                       cancelled? ─▶ exit
//!                                       write Low ; sleep t.low
//!                                       cancelled? ─▶ exit   (EachPhase)
//!                                       write High; sleep t.high
//!                                     }
//!  stop() ── raise flag, join ◀────── lease dropped, cycles returned
//! ```
//!
//! Cancellation is cooperative.  The flag is only acted on at the check
//! points, but raising it also wakes the phase sleep, so a stop never
//! waits out a long phase.  With [`CancelCheck::CycleStart`] the job
//! still writes the High phase of the cycle it is in before exiting.
//! `stop()` joins the worker, so once it returns the line is back under
//! foreground control and no further writes will come from this job.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::GpioController;
use crate::error::{GpioError, Result};
use crate::line::{WritePolicy, drive_mode_class};
use crate::registry::{LineLease, LineRegistry};
use crate::task::{PULSE_STACK_KB, spawn_worker};
use crate::types::{Level, LogicalLine};

// Links the std embassy-time driver that `async_io_mini::Timer` runs on.
use embassy_time as _;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Validated low/high phase durations, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseTiming {
    low_ms: u32,
    high_ms: u32,
}

impl PulseTiming {
    /// Validate raw millisecond values as typed by a user.
    pub fn from_millis(low_ms: i64, high_ms: i64) -> Result<Self> {
        let invalid = GpioError::InvalidInterval { low_ms, high_ms };
        let positive = |ms: i64| u32::try_from(ms).ok().filter(|&v| v > 0);
        match (positive(low_ms), positive(high_ms)) {
            (Some(low_ms), Some(high_ms)) => Ok(Self { low_ms, high_ms }),
            _ => Err(invalid),
        }
    }

    pub fn low_ms(self) -> u32 {
        self.low_ms
    }

    pub fn high_ms(self) -> u32 {
        self.high_ms
    }

    pub fn low(self) -> Duration {
        Duration::from_millis(u64::from(self.low_ms))
    }

    pub fn high(self) -> Duration {
        Duration::from_millis(u64::from(self.high_ms))
    }

    pub fn period(self) -> Duration {
        self.low() + self.high()
    }

    /// Upper bound on how long a raised cancel flag can go unnoticed.
    /// The wake on raise usually makes it far shorter.
    pub fn stop_latency(self, check: CancelCheck) -> Duration {
        match check {
            CancelCheck::CycleStart => self.period(),
            CancelCheck::EachPhase => self.low().max(self.high()),
        }
    }
}

/// Where the pulse loop looks at the cancel flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CancelCheck {
    /// Only before the Low write.
    CycleStart,
    /// Before the Low write and before the High write.
    #[default]
    EachPhase,
}

// ---------------------------------------------------------------------------
// Job bookkeeping
// ---------------------------------------------------------------------------

struct CancelState {
    raised: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

/// Stop request shared between the controller and its worker.
#[derive(Clone)]
struct CancelFlag(Arc<CancelState>);

impl CancelFlag {
    fn new() -> Self {
        Self(Arc::new(CancelState {
            raised: AtomicBool::new(false),
            wake: Signal::new(),
        }))
    }

    fn raise(&self) {
        self.0.raised.store(true, Ordering::Release);
        self.0.wake.signal(());
    }

    fn is_raised(&self) -> bool {
        self.0.raised.load(Ordering::Acquire)
    }

    /// Sleep for `phase`, returning early once the flag is raised.
    async fn sleep(&self, phase: Duration) {
        if self.is_raised() {
            return;
        }
        future::or(
            async {
                Timer::after(phase).await;
            },
            self.0.wake.wait(),
        )
        .await;
    }
}

/// The single running job.  Lives inside the controller, never handed out.
struct PulseJob {
    line: LogicalLine,
    timing: PulseTiming,
    cancel: CancelFlag,
    cycles: Arc<AtomicU64>,
    worker: JoinHandle<Result<()>>,
}

impl PulseJob {
    fn is_live(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Wait for the worker and summarise the run.
    fn reap(self) -> Result<PulseReport> {
        let outcome = self.worker.join().unwrap_or_else(|_| {
            error!("PULSE | {} worker panicked", self.line);
            Err(GpioError::WorkerPanicked)
        });
        outcome.map(|()| PulseReport {
            line: self.line,
            timing: self.timing,
            cycles: self.cycles.load(Ordering::Acquire),
        })
    }
}

/// Result of a job that ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseReport {
    pub line: LogicalLine,
    pub timing: PulseTiming,
    /// Completed Low+High periods.
    pub cycles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStatus {
    Idle,
    Running {
        line: LogicalLine,
        timing: PulseTiming,
        cycles: u64,
    },
    /// The worker ended on its own (a write failed).  The next `stop()`
    /// or `start()` collects the error.
    Faulted { line: LogicalLine },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns at most one pulse job at a time.
pub struct PulseController<C: GpioController> {
    registry: Arc<LineRegistry<C>>,
    check: CancelCheck,
    policy: WritePolicy,
    job: Mutex<Option<PulseJob>>,
}

impl<C: GpioController> PulseController<C> {
    pub fn new(registry: Arc<LineRegistry<C>>, check: CancelCheck, policy: WritePolicy) -> Self {
        Self {
            registry,
            check,
            policy,
            job: Mutex::new(None),
        }
    }

    pub fn cancel_check(&self) -> CancelCheck {
        self.check
    }

    /// Start toggling `line` until [`stop`](Self::stop).
    ///
    /// Fails with `AlreadyRunning` while any job is live.  A job whose
    /// worker already died is collected first; its error is logged and
    /// does not block the new start.
    pub fn start(&self, line: LogicalLine, timing: PulseTiming) -> Result<()> {
        let mut slot = self.lock_job();
        if let Some(job) = slot.as_ref().filter(|job| job.is_live()) {
            return Err(GpioError::AlreadyRunning(job.line));
        }
        if let Some(dead) = slot.take() {
            let line = dead.line;
            if let Err(e) = dead.reap() {
                warn!("PULSE | discarding failed job on {}: {}", line, e);
            }
        }

        let lease = self.registry.lease(line)?;
        if self.policy == WritePolicy::RequireOutput && !drive_mode_class(lease.drive_mode()?).is_writable() {
            return Err(GpioError::NotAnOutput(line));
        }

        let cancel = CancelFlag::new();
        let cycles = Arc::new(AtomicU64::new(0));
        let worker = {
            let cancel = cancel.clone();
            let cycles = Arc::clone(&cycles);
            let check = self.check;
            spawn_worker("gpio-pulse", PULSE_STACK_KB, move || {
                run_pulse_worker(lease, timing, check, &cancel, &cycles)
            })?
        };

        info!(
            "PULSE | start {} low={}ms high={}ms",
            line, timing.low_ms, timing.high_ms
        );
        *slot = Some(PulseJob {
            line,
            timing,
            cancel,
            cycles,
            worker,
        });
        Ok(())
    }

    /// Cancel the job and wait for its worker to exit.
    ///
    /// Returns the loop's hardware error if the job died on its own.
    pub fn stop(&self) -> Result<PulseReport> {
        let mut slot = self.lock_job();
        let job = slot.take().ok_or(GpioError::NoActiveJob)?;
        job.cancel.raise();
        let report = job.reap();
        drop(slot);
        if let Ok(r) = &report {
            info!("PULSE | stop {} after {} cycles", r.line, r.cycles);
        }
        report
    }

    pub fn status(&self) -> PulseStatus {
        match self.lock_job().as_ref() {
            None => PulseStatus::Idle,
            Some(job) if job.is_live() => PulseStatus::Running {
                line: job.line,
                timing: job.timing,
                cycles: job.cycles.load(Ordering::Acquire),
            },
            Some(job) => PulseStatus::Faulted { line: job.line },
        }
    }

    /// Line of the live job, if any.
    pub fn active_line(&self) -> Option<LogicalLine> {
        self.lock_job()
            .as_ref()
            .filter(|job| job.is_live())
            .map(|job| job.line)
    }

    pub fn is_pulsing(&self, line: LogicalLine) -> bool {
        self.active_line() == Some(line)
    }

    fn lock_job(&self) -> MutexGuard<'_, Option<PulseJob>> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: GpioController> Drop for PulseController<C> {
    fn drop(&mut self) {
        let Some(job) = self.lock_job().take() else {
            return;
        };
        let line = job.line;
        job.cancel.raise();
        match job.reap() {
            Ok(r) => info!("PULSE | {} stopped on shutdown after {} cycles", line, r.cycles),
            Err(e) => warn!("PULSE | {} ended with error: {}", line, e),
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Worker thread body: one async task on a local executor.
fn run_pulse_worker<C: GpioController>(
    lease: LineLease<C>,
    timing: PulseTiming,
    check: CancelCheck,
    cancel: &CancelFlag,
    cycles: &AtomicU64,
) -> Result<()> {
    let line = lease.line();
    let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
    let task = executor.spawn(pulse_loop(lease, timing, check, cancel, cycles));
    let outcome = future::block_on(executor.run(task));
    if let Err(e) = &outcome {
        error!("PULSE | {} aborted: {}", line, e);
    }
    outcome
}

async fn pulse_loop<C: GpioController>(
    lease: LineLease<C>,
    timing: PulseTiming,
    check: CancelCheck,
    cancel: &CancelFlag,
    cycles: &AtomicU64,
) -> Result<()> {
    loop {
        if cancel.is_raised() {
            return Ok(());
        }
        lease.write(Level::Low)?;
        cancel.sleep(timing.low()).await;

        if check == CancelCheck::EachPhase && cancel.is_raised() {
            return Ok(());
        }
        lease.write(Level::High)?;
        cancel.sleep(timing.high()).await;

        cycles.fetch_add(1, Ordering::AcqRel);
    }
}
