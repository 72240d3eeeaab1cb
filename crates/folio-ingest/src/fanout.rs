//! Concurrency-limited fan-out

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs one future per item with at most `limit` in flight
///
/// Results come back in input order regardless of completion order.
#[derive(Debug, Clone)]
pub struct BoundedFanOut {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl BoundedFanOut {
    /// Create a fan-out with the given limit (at least 1)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Maximum futures in flight
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Apply `f` to every item and wait for all results
    pub async fn run<I, F, Fut, T>(&self, items: I, f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let tasks = items.into_iter().map(|item| {
            let permits = Arc::clone(&self.permits);
            let task = f(item);
            async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = permits.acquire().await.ok();
                task.await
            }
        });
        join_all(tasks).await
    }
}
