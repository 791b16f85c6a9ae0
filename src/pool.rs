//! Bounded worker pool for independent, index-addressed jobs.
//!
//! Used for files in a batch, audio chunks and video frames. Results are
//! placed by job index, so callers never depend on completion order.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `count` independent jobs on at most `workers` concurrent tasks and
/// return their results by job index, independent of completion order.
///
/// A job that panics leaves `None` in its slot.
pub async fn run_indexed<F, Fut, T>(count: usize, workers: usize, job: F) -> Vec<Option<T>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    for index in 0..count {
        let semaphore = semaphore.clone();
        let fut = job(index);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, fut.await)
        });
    }

    let mut results: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, value)) => results[index] = Some(value),
            Err(e) => tracing::error!(error = %e, "worker task failed"),
        }
    }
    results
}
