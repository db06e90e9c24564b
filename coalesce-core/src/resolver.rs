//! Batch resolvers and the listener that connects them to a scheduler.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::ResolveError;
use crate::scheduler::{Batch, BatchScheduler};

/// Answers a batch of queries in one round-trip
///
/// Implementations must return exactly one result per query, in the same
/// order as the queries.
#[async_trait]
pub trait Resolver<Q, R>: Send + Sync + 'static {
    async fn resolve(&self, queries: Vec<Q>) -> Result<Vec<R>, ResolveError>;
}

/// Resolver backed by an async closure
pub struct FnResolver<F> {
    f: F,
}

impl<F> FnResolver<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<Q, R, F, Fut> Resolver<Q, R> for FnResolver<F>
where
    Q: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<Q>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<R>, ResolveError>> + Send,
{
    async fn resolve(&self, queries: Vec<Q>) -> Result<Vec<R>, ResolveError> {
        (self.f)(queries).await
    }
}

impl<Q, R> BatchScheduler<Q, R>
where
    Q: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Register a listener that answers every batch with `resolver`
    ///
    /// Each batch is resolved on its own tokio task and the results are
    /// committed in token order. If the resolver fails or returns the wrong
    /// number of results the error is logged and the batch's tasks stay
    /// pending; there is no retry.
    pub fn attach_resolver<Rs>(&self, resolver: Arc<Rs>)
    where
        Rs: Resolver<Q, R>,
    {
        let scheduler = self.downgrade();
        self.listen(move |batch: Batch<Q>| {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                error!(batch_size = batch.len(), "No tokio runtime to resolve batch on");
                return;
            };
            let resolver = Arc::clone(&resolver);
            let scheduler = scheduler.clone();
            runtime.spawn(async move {
                let queries: Vec<Q> = batch.iter().map(|task| task.query.clone()).collect();
                let expected = queries.len();

                let results = match resolver.resolve(queries).await {
                    Ok(results) if results.len() == expected => results,
                    Ok(results) => {
                        let err = ResolveError::length_mismatch(expected, results.len());
                        error!(error = %err, "Discarding resolver output");
                        return;
                    }
                    Err(err) => {
                        error!(error = %err, batch_size = expected, "Batch resolution failed");
                        return;
                    }
                };

                let Some(scheduler) = scheduler.upgrade() else {
                    debug!("Scheduler dropped before batch resolved");
                    return;
                };
                let summary =
                    scheduler.commits(batch.iter().map(|task| task.token).zip(results));
                debug!(
                    resolved = summary.resolved,
                    unknown = summary.unknown,
                    caller_gone = summary.caller_gone,
                    "Batch committed"
                );
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::scheduler::SchedulerConfig;

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            batch_max_interval: Duration::from_millis(50),
            batch_max_size: 3,
            debounce_interval: Duration::from_millis(10),
        }
    }

    struct Upper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Resolver<String, String> for Upper {
        async fn resolve(&self, queries: Vec<String>) -> Result<Vec<String>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(queries.iter().map(|q| q.to_uppercase()).collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolver_answers_batch_in_one_call() {
        let scheduler: BatchScheduler<String, String> = BatchScheduler::new(test_config());
        let resolver = Arc::new(Upper { calls: AtomicUsize::new(0) });
        scheduler.attach_resolver(Arc::clone(&resolver));

        let a = scheduler.schedule("a".to_string());
        let b = scheduler.schedule("b".to_string());

        assert_eq!(a.await.unwrap(), "A");
        assert_eq!(b.await.unwrap(), "B");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fn_resolver() {
        let scheduler: BatchScheduler<u32, u32> = BatchScheduler::new(test_config());
        scheduler.attach_resolver(Arc::new(FnResolver::new(|ids: Vec<u32>| async move {
            Ok::<Vec<u32>, ResolveError>(ids.into_iter().map(|id| id * 10).collect())
        })));

        let handle = scheduler.schedule(4);
        assert_eq!(handle.await, Ok(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_length_mismatch_leaves_tasks_pending() {
        let scheduler: BatchScheduler<u32, u32> = BatchScheduler::new(test_config());
        scheduler.attach_resolver(Arc::new(FnResolver::new(|_ids: Vec<u32>| async move {
            Ok::<Vec<u32>, ResolveError>(vec![])
        })));

        let mut handle = scheduler.schedule(1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.try_result(), None);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resolution_leaves_tasks_pending() {
        let scheduler: BatchScheduler<u32, u32> = BatchScheduler::new(test_config());
        scheduler.attach_resolver(Arc::new(FnResolver::new(|_ids: Vec<u32>| async move {
            Err::<Vec<u32>, ResolveError>(ResolveError::failed("backend unavailable"))
        })));

        let mut handle = scheduler.schedule(1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.try_result(), None);
        assert_eq!(scheduler.pending_len(), 1);
    }
}
