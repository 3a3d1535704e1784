//! Change watcher thread.
//!
//! Polls the raw event channel, normalizes what arrives and hands it to the
//! dispatcher. The thread ends when asked to stop, when the index has been
//! terminated, or when the backend goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;

use super::backend::RawEventReceiver;
use super::dispatch::EventDispatcher;
use super::events::normalize_event;
use crate::error::{IndexError, Result};
use crate::lifecycle::Lifecycle;

/// How long one poll of the event channel may block.
pub const WATCHER_POLL_INTERVAL: Duration = Duration::from_millis(100);

const WATCHER_THREAD_NAME: &str = "wordindex-watcher";

pub struct ChangeWatcher {
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("running", &self.is_running())
            .finish()
    }
}

impl ChangeWatcher {
    pub fn start(
        events: RawEventReceiver,
        dispatcher: Arc<EventDispatcher>,
        lifecycle: Arc<Lifecycle>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(WATCHER_THREAD_NAME.to_string())
            .spawn(move || run(events, dispatcher, lifecycle, thread_stop))
            .map_err(|error| IndexError::Internal(format!("failed to spawn watcher: {error}")))?;
        Ok(Self {
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Signals the thread and waits for it to exit. Safe to call repeatedly.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            log::error!("watcher thread panicked");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    events: RawEventReceiver,
    dispatcher: Arc<EventDispatcher>,
    lifecycle: Arc<Lifecycle>,
    stop: Arc<AtomicBool>,
) {
    log::debug!("watcher started");
    loop {
        if stop.load(Ordering::Acquire) || !lifecycle.is_running() {
            break;
        }
        let event = match events.recv_timeout(WATCHER_POLL_INTERVAL) {
            Ok(Ok(event)) => event,
            Ok(Err(error)) => {
                log::warn!("watch error: {error}");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("watch backend closed");
                break;
            }
        };

        for fs_event in normalize_event(event) {
            match dispatcher.dispatch(&fs_event) {
                Ok(()) => {}
                Err(error) if error.is_terminated() => {
                    log::debug!("watcher stopping, index terminated");
                    return;
                }
                Err(error) => log::error!("failed to handle {fs_event}: {error}"),
            }
        }
    }
    log::debug!("watcher stopped");
}
