use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fixed-size pool of concurrent checks. Work beyond the bound waits for a
/// permit instead of running.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Checks currently holding a permit.
    pub fn busy(&self) -> usize {
        self.size - self.permits.available_permits()
    }

    /// Spawn `fut` on the runtime; it starts once a permit is free.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // The semaphore is never closed, so this always yields a permit.
            let _permit = permits.acquire_owned().await;
            debug!("Worker permit acquired");
            fut.await
        })
    }
}
