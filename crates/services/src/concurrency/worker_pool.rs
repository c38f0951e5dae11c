use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

/// Bounded pool for database-heavy batch work.
///
/// One pool is built at startup and shared by every caller, so its
/// permits cap the units in flight across the whole process, not just
/// within one batch.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        info!(size, "Worker pool created");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running unit.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `work` once per item and returns the outputs in completion
    /// order. Spawns at most `size` workers, which pull from a shared
    /// queue until it is drained. An item whose worker panicked has no
    /// output; callers compare against what they submitted.
    pub async fn run_all<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let work = Arc::new(work);
        let (results_tx, mut results_rx) = mpsc::channel(total);

        for worker in 0..self.size.min(total) {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            let permits = Arc::clone(&self.permits);
            let results_tx = results_tx.clone();

            tokio::spawn(async move {
                loop {
                    let next = queue.lock().pop_front();
                    let Some(item) = next else {
                        break;
                    };
                    let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                        break;
                    };
                    let output = work(item).await;
                    drop(permit);
                    if results_tx.send(output).await.is_err() {
                        break;
                    }
                }
                debug!(worker, "Worker finished");
            });
        }
        drop(results_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(output) = results_rx.recv().await {
            results.push(output);
        }
        results
    }
}
