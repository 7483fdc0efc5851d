//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  The console binary uses it as its event list.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::LineSelected { line, slot } => {
                info!("SELECT | {} ({})", line, slot);
            }
            AppEvent::LevelRead { line, level } => {
                info!("LEVEL | {} reads {}", line, level);
            }
            AppEvent::LevelWritten { line, level } => {
                info!("LEVEL | {} set {}", line, level);
            }
            AppEvent::DriveModeChanged { line, mode } => {
                info!("MODE | {} -> {}", line, mode);
            }
            AppEvent::PulseStarted { line, timing } => {
                info!(
                    "PULSE | {} started low={}ms high={}ms",
                    line,
                    timing.low_ms(),
                    timing.high_ms()
                );
            }
            AppEvent::PulseStopped(report) => {
                info!("PULSE | {} stopped after {} cycles", report.line, report.cycles);
            }
            AppEvent::CommandFailed(e) => {
                warn!("ERROR | {}", e);
            }
        }
    }
}
