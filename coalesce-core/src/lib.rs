//! Coalesce Core Library
//!
//! Debounced batching for slow or rate-limited lookups.
//!
//! Callers issue queries one at a time through [`BatchScheduler::schedule`];
//! queries that arrive close together are flushed as one [`Batch`] to the
//! registered listeners, and each result committed for a [`TaskToken`] is
//! routed back to the caller that asked for it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use coalesce_core::{BatchScheduler, FnResolver, ResolveError, SchedulerConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scheduler: BatchScheduler<u32, String> = BatchScheduler::new(SchedulerConfig::default());
//! scheduler.attach_resolver(Arc::new(FnResolver::new(|ids: Vec<u32>| async move {
//!     Ok::<Vec<String>, ResolveError>(ids.iter().map(|id| format!("item-{id}")).collect())
//! })));
//!
//! let (a, b) = tokio::join!(scheduler.schedule(1), scheduler.schedule(2));
//! assert_eq!(a.unwrap(), "item-1");
//! assert_eq!(b.unwrap(), "item-2");
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod resolver;
pub mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock, TokioClock};
pub use error::{ResolveError, ScheduleError};
pub use resolver::{FnResolver, Resolver};
pub use scheduler::{
    Batch, BatchScheduler, Commit, CommitOutcome, CommitSummary, FlushReason, ListenerTask,
    MetricsSnapshot, Priority, QueryHandle, SchedulerConfig, SchedulerMetrics, SchedulerOptions,
    TaskToken, WeakBatchScheduler,
};
