use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use relaudit_core::Result;

/// Bounds for one batch of independent per-table tasks.
#[derive(Debug, Clone)]
pub(crate) struct RunLimits {
    pub parallelism: usize,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

/// Results of [`run_bounded`]: finished tasks in completion order, and the
/// keys that were never started.
pub(crate) struct Batch<K, T> {
    pub finished: Vec<(K, Result<T>)>,
    pub skipped: Vec<K>,
}

enum Task<K, T> {
    Finished(K, Result<T>),
    Skipped(K),
}

/// Run `work` for every key with at most `limits.parallelism` in flight.
///
/// Cancellation and the deadline are checked each time a new task is about
/// to start; tasks already running are left to finish.
pub(crate) async fn run_bounded<K, T, F, Fut>(keys: Vec<K>, limits: &RunLimits, work: F) -> Batch<K, T>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = limits.timeout.map(|timeout| Instant::now() + timeout);
    let work = &work;

    let tasks: Vec<Task<K, T>> = stream::iter(keys)
        .map(|key| {
            let expired = deadline.is_some_and(|deadline| Instant::now() >= deadline);
            let proceed = !limits.cancel.is_cancelled() && !expired;
            async move {
                if !proceed {
                    return Task::Skipped(key);
                }
                let result = work(key.clone()).await;
                Task::Finished(key, result)
            }
        })
        .buffer_unordered(limits.parallelism.max(1))
        .collect()
        .await;

    let mut batch = Batch {
        finished: Vec::new(),
        skipped: Vec::new(),
    };
    for task in tasks {
        match task {
            Task::Finished(key, result) => batch.finished.push((key, result)),
            Task::Skipped(key) => batch.skipped.push(key),
        }
    }
    batch
}
