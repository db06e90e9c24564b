//! Debounced batch scheduler.
//!
//! Callers submit queries one at a time; the scheduler coalesces the
//! queries that arrive close together into a single batch, hands the batch
//! to its listeners and later routes each committed result back to the
//! caller that asked for it.
//!
//! # Architecture
//!
//! ```text
//!   schedule(query) ──► ┌──────────────┐  flush   ┌──────────────────┐
//!                       │  Task Queue  │ ───────► │ Pending Registry │
//!                       │ (BatchWindow)│          │  token → caller  │
//!                       └──────┬───────┘          └────────▲─────────┘
//!                              │ debounce timer            │ commit(token, result)
//!                              ▼                           │
//!                       ┌──────────────┐  Batch   ┌────────┴─────────┐
//!                       │   flush()    │ ───────► │    listeners     │
//!                       └──────────────┘          └──────────────────┘
//! ```
//!
//! # Flush policy
//!
//! Every `schedule` call cancels the armed timer and then:
//!
//! - **Size**: flushes at once when the queue holds `batch_max_size` queries
//!   and the window is at least `debounce_interval` old
//! - **Staleness**: flushes at once when the window is older than
//!   `batch_max_interval`
//! - **Debounce**: otherwise re-arms a single timer for `debounce_interval`
//!
//! Each result is delivered at most once. Committing an unknown or already
//! committed token does nothing, and a query that nobody commits stays
//! pending.

mod config;
mod metrics;
mod registry;
mod task;
mod window;

pub use config::{
    SchedulerConfig, SchedulerOptions, DEFAULT_BATCH_MAX_INTERVAL, DEFAULT_BATCH_MAX_SIZE,
    DEFAULT_DEBOUNCE_INTERVAL,
};
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use task::{
    Batch, Commit, CommitOutcome, CommitSummary, ListenerTask, Priority, QueryHandle, TaskToken,
};
pub use window::{BatchWindow, FlushDecision, FlushReason};

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, TokioClock};
use registry::PendingRegistry;

type Listener<Q> = Arc<dyn Fn(Batch<Q>) + Send + Sync>;

/// Coalesces individually scheduled queries into batches
///
/// The handle is cheap to clone; all clones share one scheduler.
pub struct BatchScheduler<Q, R> {
    inner: Arc<Inner<Q, R>>,
}

/// Non-owning handle, for listeners that must not keep the scheduler alive
pub struct WeakBatchScheduler<Q, R> {
    inner: Weak<Inner<Q, R>>,
}

struct Inner<Q, R> {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<State<Q, R>>,
    listeners: Mutex<Vec<Listener<Q>>>,
    metrics: Arc<SchedulerMetrics>,
}

struct State<Q, R> {
    window: BatchWindow<(Q, oneshot::Sender<R>)>,
    pending: PendingRegistry<R>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the armed timer is cancelled, so a timer that
    /// already woke up cannot flush a newer window.
    timer_generation: u64,
}

impl<Q, R> State<Q, R> {
    fn cancel_timer(&mut self) {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<Q, R> BatchScheduler<Q, R>
where
    Q: Send + 'static,
    R: Send + 'static,
{
    /// Create a scheduler driven by tokio's clock
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, TokioClock::new())
    }

    /// Create a scheduler from optional overrides of the default config
    pub fn with_options(options: SchedulerOptions) -> Self {
        Self::new(SchedulerConfig::from(options))
    }

    /// Create a scheduler that reads time from `clock`
    ///
    /// The debounce timer always runs on tokio time; the clock decides
    /// window age for the size and staleness checks.
    pub fn with_clock(config: SchedulerConfig, clock: impl Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: config.normalized(),
                clock: Arc::new(clock),
                state: Mutex::new(State {
                    window: BatchWindow::new(),
                    pending: PendingRegistry::new(),
                    timer: None,
                    timer_generation: 0,
                }),
                listeners: Mutex::new(Vec::new()),
                metrics: Arc::new(SchedulerMetrics::new()),
            }),
        }
    }

    /// Submit a query; the handle resolves when its result is committed
    ///
    /// Never fails. Should be called from within a tokio runtime so the
    /// debounce timer can be spawned; without one the query is flushed
    /// immediately.
    pub fn schedule(&self, query: Q) -> QueryHandle<R> {
        let (continuation, handle) = QueryHandle::channel();
        let now = self.inner.clock.now();

        let decision = {
            let mut state = self.inner.state.lock();
            state.window.admit((query, continuation), now);
            self.inner.metrics.record_scheduled();
            state.cancel_timer();

            let decision = state.window.decide(now, &self.inner.config);
            debug!(
                queued = state.window.len(),
                elapsed_ms = state.window.elapsed(now).as_millis() as u64,
                ?decision,
                "Query scheduled"
            );

            match decision {
                FlushDecision::Debounce(delay) => {
                    if !self.arm_timer(&mut state, delay) {
                        Some(FlushReason::Timer)
                    } else {
                        None
                    }
                }
                FlushDecision::Now(reason) => Some(reason),
            }
        };

        if let Some(reason) = decision {
            self.inner.flush(reason);
        }
        handle
    }

    /// Submit a query with a priority
    ///
    /// The priority is logged but otherwise has no effect on batching.
    pub fn schedule_with_priority(&self, query: Q, priority: Priority) -> QueryHandle<R> {
        trace!(%priority, "Priority does not affect batching");
        self.schedule(query)
    }

    /// Register a batch consumer for the lifetime of the scheduler
    ///
    /// Listeners run synchronously on every flush, in registration order,
    /// and must not block: hand the batch off to a task and call
    /// [`commits`](Self::commits) when results are ready. Every listener
    /// sees every batch; only the first commit for a token takes effect.
    pub fn listen<F>(&self, listener: F)
    where
        F: Fn(Batch<Q>) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    /// Deliver a result to the caller that scheduled `token`'s query
    pub fn commit(&self, token: TaskToken, result: R) -> CommitOutcome {
        self.inner.commit(token, result)
    }

    /// Deliver several results, each independently and in order
    pub fn commits<I, C>(&self, entries: I) -> CommitSummary
    where
        I: IntoIterator<Item = C>,
        C: Into<Commit<R>>,
    {
        let mut summary = CommitSummary::default();
        for entry in entries {
            let Commit { token, result } = entry.into();
            summary.record(self.inner.commit(token, result));
        }
        summary
    }

    /// Flush whatever is queued right now, cancelling the armed timer
    pub fn flush(&self) {
        self.inner.state.lock().cancel_timer();
        self.inner.flush(FlushReason::Manual);
    }

    /// Queries waiting for the next flush
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().window.len()
    }

    /// Tasks flushed but not yet committed
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Whether `token` is still awaiting a commit
    pub fn is_pending(&self, token: TaskToken) -> bool {
        self.inner.state.lock().pending.contains(token)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn downgrade(&self) -> WeakBatchScheduler<Q, R> {
        WeakBatchScheduler { inner: Arc::downgrade(&self.inner) }
    }

    /// Spawn a single-shot timer that flushes the current window
    ///
    /// Returns false when there is no runtime to spawn on.
    fn arm_timer(&self, state: &mut State<Q, R>, delay: Duration) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available; flushing without debounce");
            return false;
        };

        let generation = state.timer_generation;
        let inner = Arc::downgrade(&self.inner);
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.fire_timer(generation);
            }
        }));
        true
    }
}

impl<Q, R> Inner<Q, R>
where
    Q: Send + 'static,
    R: Send + 'static,
{
    fn fire_timer(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.timer_generation != generation {
                return;
            }
            state.timer = None;
        }
        self.flush(FlushReason::Timer);
    }

    fn flush(&self, reason: FlushReason) {
        let batch: Batch<Q> = {
            let mut state = self.state.lock();
            let now = self.clock.now();
            let drained = state.window.drain(now);
            if drained.is_empty() {
                return;
            }

            let mut tasks = Vec::with_capacity(drained.len());
            for (query, continuation) in drained {
                let token = TaskToken::mint();
                state.pending.insert(token, continuation);
                tasks.push(ListenerTask { token, query });
            }
            self.metrics.record_flush(reason, tasks.len());
            tasks.into()
        };

        let listeners: Vec<Listener<Q>> = self.listeners.lock().clone();
        debug!(
            %reason,
            batch_size = batch.len(),
            listeners = listeners.len(),
            "Batch flushed"
        );

        for listener in listeners {
            listener(Arc::clone(&batch));
        }
    }

    fn commit(&self, token: TaskToken, result: R) -> CommitOutcome {
        let continuation = self.state.lock().pending.take(token);

        let outcome = match continuation {
            None => {
                debug!(%token, "Ignoring commit for unknown or already committed task");
                CommitOutcome::Unknown
            }
            Some(continuation) => match continuation.send(result) {
                Ok(()) => CommitOutcome::Resolved,
                Err(_) => {
                    warn!(%token, "Caller dropped its handle before the result was committed");
                    CommitOutcome::CallerGone
                }
            },
        };

        self.metrics.record_commit(outcome);
        outcome
    }
}

impl<Q, R> Drop for Inner<Q, R> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

impl<Q, R> Clone for BatchScheduler<Q, R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<Q, R> Default for BatchScheduler<Q, R>
where
    Q: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl<Q, R> std::fmt::Debug for BatchScheduler<Q, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<Q, R> WeakBatchScheduler<Q, R> {
    pub fn upgrade(&self) -> Option<BatchScheduler<Q, R>> {
        self.inner.upgrade().map(|inner| BatchScheduler { inner })
    }
}

impl<Q, R> Clone for WeakBatchScheduler<Q, R> {
    fn clone(&self) -> Self {
        Self { inner: Weak::clone(&self.inner) }
    }
}
