//! Change notifier: republishes hardware level changes to one observer.
//!
//! ```text
//!  hardware context            queue (64)             gpio-notify thread
//!  ────────────────            ──────────             ──────────────────
//!  LevelCallback ── try_send ─▶ Channel ── receive ─▶ line → slot
//!                  (full: drop,                        observer(slot, level)
//!                   count)                             warn on new drops
//! ```
//!
//! The callback side never blocks and never logs.  Events for one line
//! come out in the order the hardware reported them.  Only one notifier
//! may be attached to a registry at a time; a second `start` fails with
//! [`GpioError::ObserverAttached`](crate::error::GpioError::ObserverAttached).
//!
//! A panicking observer is detached: the dispatcher logs the panic, keeps
//! draining the queue and discards everything until shutdown.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{error, info, warn};

use crate::app::ports::{GpioController, LevelObserver, LineHandle};
use crate::error::Result;
use crate::pins::{HEADER_SLOTS, HeaderLayout};
use crate::registry::LineRegistry;
use crate::task::{NOTIFY_STACK_KB, spawn_worker};
use crate::types::{Level, LogicalLine};

/// Capacity of the hardware → dispatcher queue.
pub const NOTIFY_QUEUE_DEPTH: usize = 64;

/// Back-off while `Drop` waits for room to post `Shutdown`.
const SHUTDOWN_RETRY: Duration = Duration::from_millis(1);

enum NotifierMsg {
    Level { line: LogicalLine, level: Level },
    Shutdown,
}

type NotifyQueue = Channel<CriticalSectionRawMutex, NotifierMsg, NOTIFY_QUEUE_DEPTH>;

pub struct ChangeNotifier<C: GpioController> {
    registry: Arc<LineRegistry<C>>,
    queue: Arc<NotifyQueue>,
    dropped: Arc<AtomicU32>,
    subscribed: heapless::Vec<LogicalLine, HEADER_SLOTS>,
    dispatcher: Option<JoinHandle<()>>,
}

impl<C: GpioController> ChangeNotifier<C> {
    /// Start the dispatcher and subscribe every opened line.
    ///
    /// A line whose subscription fails is logged and skipped.
    pub fn start(registry: &Arc<LineRegistry<C>>, observer: impl LevelObserver) -> Result<Self> {
        registry.claim_observer()?;
        let queue: Arc<NotifyQueue> = Arc::new(Channel::new());
        let dropped = Arc::new(AtomicU32::new(0));

        let spawned = {
            let queue = Arc::clone(&queue);
            let dropped = Arc::clone(&dropped);
            let layout = registry.layout();
            spawn_worker("gpio-notify", NOTIFY_STACK_KB, move || {
                futures_lite::future::block_on(dispatch(&queue, &dropped, layout, observer));
            })
        };
        let dispatcher = match spawned {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                registry.release_observer();
                return Err(e);
            }
        };

        let mut subscribed = heapless::Vec::new();
        for record in registry.mapped() {
            let (Some(line), Ok(handle)) = (record.line(), record.handle()) else {
                continue;
            };
            let callback = {
                let queue = Arc::clone(&queue);
                let dropped = Arc::clone(&dropped);
                Arc::new(move |level: Level| {
                    if queue.try_send(NotifierMsg::Level { line, level }).is_err() {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                })
            };
            match handle.subscribe(callback) {
                // Capacity equals the slot count, so this cannot overflow.
                Ok(()) => {
                    let _ = subscribed.push(line);
                }
                Err(e) => warn!("NOTIFY | {} ({}): subscribe failed: {}", line, record.slot(), e),
            }
        }
        info!("NOTIFY | watching {} lines", subscribed.len());

        Ok(Self {
            registry: Arc::clone(registry),
            queue,
            dropped,
            subscribed,
            dispatcher: Some(dispatcher),
        })
    }

    /// Events lost to a full queue since start.
    pub fn dropped_events(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Lines with a live subscription.
    pub fn subscribed(&self) -> &[LogicalLine] {
        &self.subscribed
    }
}

impl<C: GpioController> Drop for ChangeNotifier<C> {
    fn drop(&mut self) {
        for &line in &self.subscribed {
            if let Ok(handle) = self.registry.get_by_logical(line).and_then(|r| r.handle()) {
                handle.unsubscribe();
            }
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let mut msg = NotifierMsg::Shutdown;
            while !dispatcher.is_finished() {
                match self.queue.try_send(msg) {
                    Ok(()) => break,
                    Err(TrySendError::Full(back)) => {
                        msg = back;
                        std::thread::sleep(SHUTDOWN_RETRY);
                    }
                }
            }
            if dispatcher.join().is_err() {
                warn!("NOTIFY | dispatcher panicked");
            }
        }
        self.registry.release_observer();
        info!("NOTIFY | stopped ({} events dropped)", self.dropped_events());
    }
}

async fn dispatch(
    queue: &NotifyQueue,
    dropped: &AtomicU32,
    layout: &'static HeaderLayout,
    observer: impl LevelObserver,
) {
    let mut observer = Some(observer);
    let mut reported = 0;
    loop {
        let msg = queue.receive().await;

        let total = dropped.load(Ordering::Relaxed);
        if total != reported {
            warn!("NOTIFY | queue full, {} events dropped (total {})", total.wrapping_sub(reported), total);
            reported = total;
        }

        let (line, level) = match msg {
            NotifierMsg::Level { line, level } => (line, level),
            NotifierMsg::Shutdown => return,
        };
        let Some(slot) = layout.slot_of(line) else {
            warn!("NOTIFY | {} is not on {}", line, layout.name);
            continue;
        };
        if let Some(obs) = observer.as_mut() {
            if catch_unwind(AssertUnwindSafe(|| obs.on_level_changed(slot, level))).is_err() {
                error!("NOTIFY | observer panicked on {} {}; detached", slot, level);
                observer = None;
            }
        }
    }
}
