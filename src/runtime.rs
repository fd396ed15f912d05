//! Wall-clock runtime for a single widget.
//!
//! Runs one [`Widget`] on a dedicated worker thread. The renderer sends
//! intents over a bounded channel and reads a [`ViewUpdate`] after every
//! transition or fired timer. The worker owns the widget exclusively; all
//! transitions still happen one at a time on that thread.
//!
//! Real elapsed time is mapped onto the widget's virtual clock, and the
//! worker sleeps in `select!` until the next deadline or the next intent.
//! View publishing never blocks: if the renderer falls behind, updates are
//! dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, never, select, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;

use crate::error::{DispatchError, SimError, SimResult};
use crate::fsm::{Transition, Widget};

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Max queued intents before `send` blocks.
    pub intent_queue_capacity: usize,
    /// Max buffered view updates before new ones are dropped.
    pub view_queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intent_queue_capacity: 256,
            view_queue_capacity: 256,
        }
    }
}

/// Message from the renderer to the worker.
#[derive(Debug)]
pub enum Intent {
    /// A JSON action object, e.g. `{"action": "notify"}`.
    Dispatch(serde_json::Value),
    /// Cancel timers and restore the initial state.
    Reset,
    /// Cancel timers and stop the worker.
    Shutdown,
}

/// Why a view update was published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UpdateCause {
    /// An intent was delivered.
    Dispatched {
        /// What the machine did with it.
        transition: Transition,
    },
    /// An intent could not be decoded.
    Rejected {
        /// Decoder error text.
        error: String,
    },
    /// One or more timers fired.
    TimersFired {
        /// How many.
        count: usize,
    },
    /// The widget was reset.
    Reset,
}

/// Snapshot pushed to the renderer.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct ViewUpdate {
    pub widget: &'static str,
    pub now_ms: u64,
    pub cause: UpdateCause,
    pub view: serde_json::Value,
}

/// Handle to a widget running on its own thread.
///
/// Dropping the handle shuts the worker down and cancels its timers.
#[derive(Debug)]
pub struct SimulatorRuntime {
    widget: &'static str,
    intent_tx: Sender<Intent>,
    views_rx: Receiver<ViewUpdate>,
    dropped_views: Arc<AtomicU64>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatorRuntime {
    /// Moves `widget` onto a new worker thread.
    pub fn spawn<W>(widget: W, cfg: RuntimeConfig) -> SimResult<Self>
    where
        W: Widget + 'static,
    {
        let name = widget.name();
        let (intent_tx, intent_rx) = bounded::<Intent>(cfg.intent_queue_capacity.max(1));
        let (views_tx, views_rx) = bounded::<ViewUpdate>(cfg.view_queue_capacity.max(1));
        let dropped_views = Arc::new(AtomicU64::new(0));

        let thread_dropped = Arc::clone(&dropped_views);
        let join = thread::Builder::new()
            .name(format!("scenario-sim-{name}"))
            .spawn(move || worker_loop(widget, intent_rx, views_tx, thread_dropped))
            .map_err(|e| SimError::internal(format!("failed to spawn {name} worker: {e}")))?;

        tracing::info!(widget = name, "simulator runtime started");

        Ok(Self {
            widget: name,
            intent_tx,
            views_rx,
            dropped_views,
            join: Mutex::new(Some(join)),
        })
    }

    /// Widget name.
    #[must_use]
    pub const fn widget(&self) -> &'static str {
        self.widget
    }

    /// Queues an intent (blocking if the queue is full).
    pub fn send(&self, intent: Intent) -> SimResult<()> {
        self.intent_tx.send(intent).map_err(|_| disconnected("runtime_intents"))
    }

    /// Queues a JSON action.
    pub fn dispatch(&self, action: serde_json::Value) -> SimResult<()> {
        self.send(Intent::Dispatch(action))
    }

    /// The view update stream.
    #[must_use]
    pub const fn views(&self) -> &Receiver<ViewUpdate> {
        &self.views_rx
    }

    /// Receive the next view update with a timeout.
    pub fn recv_view_timeout(&self, timeout: Duration) -> SimResult<ViewUpdate> {
        self.views_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => SimError::internal(format!(
                "no view update from {} within {}ms",
                self.widget,
                timeout.as_millis()
            )),
            RecvTimeoutError::Disconnected => disconnected("runtime_views"),
        })
    }

    /// View updates dropped because the renderer fell behind.
    #[must_use]
    pub fn dropped_views(&self) -> u64 {
        self.dropped_views.load(Ordering::Relaxed)
    }

    /// Stops the worker and waits for it to exit.
    pub fn shutdown(self) -> SimResult<()> {
        let _ = self.intent_tx.send(Intent::Shutdown);
        let handle = self
            .join
            .lock()
            .map_err(|_| SimError::internal("runtime join handle poisoned"))?
            .take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| SimError::internal(format!("{} worker panicked", self.widget)))?;
        }
        Ok(())
    }
}

impl Drop for SimulatorRuntime {
    fn drop(&mut self) {
        // Best-effort: never block in drop. The worker also exits once every
        // intent sender is gone.
        let _ = self.intent_tx.try_send(Intent::Shutdown);
        if let Ok(mut guard) = self.join.lock() {
            drop(guard.take());
        }
    }
}

fn disconnected(path: &str) -> SimError {
    SimError::Dispatch(DispatchError::Disconnected {
        path: path.to_string(),
    })
}

/// Maps wall-clock time onto the widget's virtual clock.
struct Clock {
    started: Instant,
    base_ms: u64,
}

impl Clock {
    fn new(widget: &dyn Widget) -> Self {
        Self {
            started: Instant::now(),
            base_ms: widget.now_ms(),
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.base_ms.saturating_add(elapsed)
    }

    /// How long to sleep until `deadline_ms` on the virtual clock.
    fn until(&self, deadline_ms: u64) -> Duration {
        Duration::from_millis(deadline_ms.saturating_sub(self.now_ms()))
    }
}

fn worker_loop<W: Widget>(
    mut widget: W,
    intent_rx: Receiver<Intent>,
    views_tx: Sender<ViewUpdate>,
    dropped_views: Arc<AtomicU64>,
) {
    let clock = Clock::new(&widget);

    let publish = |widget: &W, cause: UpdateCause| {
        let update = ViewUpdate {
            widget: widget.name(),
            now_ms: widget.now_ms(),
            cause,
            view: widget.view(),
        };
        if views_tx.try_send(update).is_err() {
            dropped_views.fetch_add(1, Ordering::Relaxed);
        }
    };

    // Fire whatever came due while we were blocked.
    let catch_up = |widget: &mut W| {
        let lag = clock.now_ms().saturating_sub(widget.now_ms());
        let fired = widget.advance(Duration::from_millis(lag));
        if fired > 0 {
            publish(widget, UpdateCause::TimersFired { count: fired });
        }
    };

    loop {
        let timer = match widget.next_deadline_ms() {
            Some(deadline) => after(clock.until(deadline)),
            None => never(),
        };

        select! {
            recv(intent_rx) -> msg => {
                catch_up(&mut widget);
                match msg {
                    Ok(Intent::Dispatch(action)) => {
                        let cause = match widget.dispatch_value(action) {
                            Ok(transition) => UpdateCause::Dispatched { transition },
                            Err(err) => {
                                tracing::warn!(widget = widget.name(), error = %err, "intent rejected");
                                UpdateCause::Rejected { error: err.to_string() }
                            }
                        };
                        publish(&widget, cause);
                    }
                    Ok(Intent::Reset) => {
                        widget.reset();
                        publish(&widget, UpdateCause::Reset);
                    }
                    Ok(Intent::Shutdown) | Err(_) => break,
                }
            }
            recv(timer) -> _ => catch_up(&mut widget),
        }
    }

    let cancelled = widget.cancel_timers();
    tracing::info!(widget = widget.name(), cancelled, "simulator runtime stopped");
}
