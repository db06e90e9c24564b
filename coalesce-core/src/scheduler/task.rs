//! Task types exchanged between the scheduler, its listeners and callers.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::ScheduleError;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifier correlating a commit with the query it answers
///
/// Tokens are minted only when a batch is flushed and are unique across
/// every scheduler in the process. There is no public constructor, so a
/// consumer can only commit tokens it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(u64);

impl TaskToken {
    pub(crate) fn mint() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw sequence number, for logging
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Scheduling priority accepted by [`schedule_with_priority`]
///
/// Priority is recorded in logs only; it does not influence flush timing
/// or batch contents.
///
/// [`schedule_with_priority`]: super::BatchScheduler::schedule_with_priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A flushed query as seen by listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerTask<Q> {
    pub token: TaskToken,
    pub query: Q,
}

/// One flushed batch, in admission order
pub type Batch<Q> = Arc<[ListenerTask<Q>]>;

/// A result addressed to a pending task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit<R> {
    pub token: TaskToken,
    pub result: R,
}

impl<R> Commit<R> {
    pub fn new(token: TaskToken, result: R) -> Self {
        Self { token, result }
    }
}

impl<R> From<(TaskToken, R)> for Commit<R> {
    fn from((token, result): (TaskToken, R)) -> Self {
        Self { token, result }
    }
}

/// What happened to a single commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The caller's handle received the result
    Resolved,
    /// The token was unknown or already committed; nothing happened
    Unknown,
    /// The task was removed but its caller had dropped the handle
    CallerGone,
}

/// Tally of a [`commits`](super::BatchScheduler::commits) call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub resolved: usize,
    pub unknown: usize,
    pub caller_gone: usize,
}

impl CommitSummary {
    pub(crate) fn record(&mut self, outcome: CommitOutcome) {
        match outcome {
            CommitOutcome::Resolved => self.resolved += 1,
            CommitOutcome::Unknown => self.unknown += 1,
            CommitOutcome::CallerGone => self.caller_gone += 1,
        }
    }

    /// Number of entries processed
    pub fn total(&self) -> usize {
        self.resolved + self.unknown + self.caller_gone
    }
}

/// Future returned by [`schedule`](super::BatchScheduler::schedule)
///
/// Resolves once with the committed result. A query that is never
/// committed keeps its handle pending for as long as the scheduler lives;
/// if the scheduler is dropped first the handle yields
/// [`ScheduleError::Abandoned`].
#[derive(Debug)]
#[must_use = "a QueryHandle does nothing unless awaited"]
pub struct QueryHandle<R> {
    rx: oneshot::Receiver<R>,
}

impl<R> QueryHandle<R> {
    pub(crate) fn channel() -> (oneshot::Sender<R>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Check for a result without waiting
    ///
    /// Returns `None` while the query is still queued or pending.
    pub fn try_result(&mut self) -> Option<Result<R, ScheduleError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(Ok(result)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ScheduleError::Abandoned)),
        }
    }
}

impl<R> Future for QueryHandle<R> {
    type Output = Result<R, ScheduleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| ScheduleError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_minted_tokens_are_unique() {
        let tokens: HashSet<TaskToken> = (0..1000).map(|_| TaskToken::mint()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_token_display() {
        let token = TaskToken::mint();
        assert_eq!(token.to_string(), format!("task-{}", token.as_u64()));
    }

    #[test]
    fn test_commit_summary_tally() {
        let mut summary = CommitSummary::default();
        summary.record(CommitOutcome::Resolved);
        summary.record(CommitOutcome::Resolved);
        summary.record(CommitOutcome::Unknown);
        summary.record(CommitOutcome::CallerGone);

        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.caller_gone, 1);
        assert_eq!(summary.total(), 4);
    }

    #[tokio::test]
    async fn test_handle_resolves_from_continuation() {
        let (tx, handle) = QueryHandle::channel();
        tx.send("done").unwrap();
        assert_eq!(handle.await, Ok("done"));
    }

    #[tokio::test]
    async fn test_handle_abandoned_when_continuation_dropped() {
        let (tx, mut handle) = QueryHandle::<u32>::channel();
        assert_eq!(handle.try_result(), None);

        drop(tx);
        assert_eq!(handle.try_result(), Some(Err(ScheduleError::Abandoned)));
    }
}
