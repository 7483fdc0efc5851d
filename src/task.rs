//! Named worker thread spawning.
//!
//! The core runs two kinds of background context: the pulse worker and
//! the change-notifier dispatcher.  Both go through [`spawn_worker`] so
//! they get a recognisable thread name and a bounded stack, and so a
//! failed spawn surfaces as [`GpioError::WorkerSpawn`] instead of a panic.

use std::thread::JoinHandle;

use log::{info, warn};

use crate::error::{GpioError, Result};

/// Stack for the pulse worker: one async task, two timers.
pub const PULSE_STACK_KB: usize = 32;

/// Stack for the notifier dispatcher; observers run on it.
pub const NOTIFY_STACK_KB: usize = 64;

/// Spawn a named worker thread.
pub fn spawn_worker<T: Send + 'static>(
    name: &str,
    stack_kb: usize,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>> {
    info!("Spawning '{}' (stack={}KB)", name, stack_kb);
    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            warn!("spawn '{}' failed: {}", name, e);
            GpioError::WorkerSpawn
        })
}
