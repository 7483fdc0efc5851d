//! Per-front-end session state.

use crate::error::{GpioError, Result};
use crate::types::LogicalLine;

/// The caller's current line selection.  Owned by the front end and
/// passed into every [`execute`](super::service::GpioService::execute).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    selected: Option<LogicalLine>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<LogicalLine> {
        self.selected
    }

    /// An explicit line wins; otherwise fall back to the selection.
    pub fn resolve(&self, line: Option<LogicalLine>) -> Result<LogicalLine> {
        line.or(self.selected).ok_or(GpioError::NoSelection)
    }

    pub(crate) fn set_selected(&mut self, line: LogicalLine) {
        self.selected = Some(line);
    }
}
