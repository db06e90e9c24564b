//! Accumulation window and the flush decision policy.

use std::time::Duration;

use super::config::SchedulerConfig;

/// Why a batch was flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// Queue reached `batch_max_size` after the debounce interval
    Size,
    /// Window outlived `batch_max_interval`
    Staleness,
    /// Debounce timer fired
    Timer,
    /// Flushed explicitly through `BatchScheduler::flush`
    Manual,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushReason::Size => write!(f, "size"),
            FlushReason::Staleness => write!(f, "staleness"),
            FlushReason::Timer => write!(f, "timer"),
            FlushReason::Manual => write!(f, "manual"),
        }
    }
}

/// What to do after admitting a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Flush right away
    Now(FlushReason),
    /// Arm the debounce timer for this long
    Debounce(Duration),
}

/// Queries accumulated since the last flush
#[derive(Debug)]
pub struct BatchWindow<T> {
    started_at: Option<Duration>,
    queue: Vec<T>,
}

impl<T> BatchWindow<T> {
    pub fn new() -> Self {
        Self { started_at: None, queue: Vec::new() }
    }

    /// Append an entry, opening the window if it was idle
    pub fn admit(&mut self, entry: T, now: Duration) {
        if self.queue.is_empty() {
            self.started_at = Some(now);
        }
        self.queue.push(entry);
    }

    /// Decide whether the current window flushes now or waits
    pub fn decide(&self, now: Duration, config: &SchedulerConfig) -> FlushDecision {
        let elapsed = self.elapsed(now);

        if self.queue.len() >= config.batch_max_size && elapsed >= config.debounce_interval {
            FlushDecision::Now(FlushReason::Size)
        } else if elapsed > config.batch_max_interval {
            FlushDecision::Now(FlushReason::Staleness)
        } else {
            FlushDecision::Debounce(config.debounce_interval)
        }
    }

    /// Take every queued entry and restart the window at `now`
    pub fn drain(&mut self, now: Duration) -> Vec<T> {
        self.started_at = Some(now);
        std::mem::take(&mut self.queue)
    }

    /// Time since the window opened (or was last flushed)
    pub fn elapsed(&self, now: Duration) -> Duration {
        self.started_at
            .map(|start| now.saturating_sub(start))
            .unwrap_or(Duration::ZERO)
    }

    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for BatchWindow<T> {
    fn default() -> Self {
        Self::new()
    }
}
