use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{Result, TrspError};

/// Fixed-size worker pool shared by the parallel drivers.
#[derive(Debug)]
pub struct ThreadPool {
    inner: RayonThreadPool,
}

impl ThreadPool {
    /// Creates a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self> {
        let inner = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("trsp-worker-{i}"))
            .build()
            .map_err(|err| TrspError::InvalidParameter {
                name: "threads",
                reason: err.to_string(),
            })?;
        Ok(Self { inner })
    }

    pub fn threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// Runs `op` inside the pool, so rayon iterators use its workers.
    pub fn execute<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.inner.install(op)
    }

    /// Starts a detached task.
    pub fn spawn<OP>(&self, op: OP)
    where
        OP: FnOnce() + Send + 'static,
    {
        self.inner.spawn(op)
    }
}
