//! Worker pool backing the search executor.
//!
//! Task bodies run on the blocking thread pool of a dedicated tokio runtime,
//! capped at `max_workers` threads. A small number of async worker threads
//! coordinate timeouts and collect results.

use std::future::Future;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use log::debug;
use parking_lot::RwLock;
use parking_lot::lock_api::ArcRwLockReadGuard;
use tokio::runtime::{Builder as TokioRuntimeBuilder, Handle, Runtime};

use crate::error::{BraidError, Result};
use crate::executor::config::ExecutorConfig;

const COORDINATOR_THREADS: usize = 2;

pub(crate) struct WorkerPool {
    runtime: Arc<RwLock<Option<Runtime>>>,
    max_workers: usize,
}

impl WorkerPool {
    pub(crate) fn start(config: &ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let runtime = TokioRuntimeBuilder::new_multi_thread()
            .worker_threads(COORDINATOR_THREADS)
            .max_blocking_threads(config.max_workers)
            .thread_name("braid-search")
            .enable_time()
            .build()
            .map_err(|err| {
                BraidError::internal(format!("failed to initialize worker pool: {err}"))
            })?;
        debug!("started worker pool with {} workers", config.max_workers);
        Ok(Self {
            runtime: Arc::new(RwLock::new(Some(runtime))),
            max_workers: config.max_workers,
        })
    }

    /// Borrow the pool for one call. [`drain`](Self::drain) waits until every
    /// outstanding lease is dropped.
    pub(crate) fn lease(&self) -> Result<PoolLease> {
        let guard = self.runtime.read_arc();
        let handle = guard
            .as_ref()
            .map(|runtime| runtime.handle().clone())
            .ok_or(BraidError::ExecutorShutdown)?;
        Ok(PoolLease {
            handle,
            _guard: guard,
        })
    }

    /// Wait for in-flight calls, then stop the runtime.
    ///
    /// Without a timeout this also waits for abandoned task bodies that are
    /// still running. Must not be called from inside an async context.
    pub(crate) fn drain(&self, timeout: Option<Duration>) {
        let runtime = self.runtime.write().take();
        if let Some(runtime) = runtime {
            match timeout {
                Some(timeout) => runtime.shutdown_timeout(timeout),
                None => drop(runtime),
            }
            debug!("drained worker pool with {} workers", self.max_workers);
        }
    }
}

/// Access to a running pool for the duration of one call.
pub(crate) struct PoolLease {
    handle: Handle,
    _guard: ArcRwLockReadGuard<parking_lot::RawRwLock, Option<Runtime>>,
}

impl PoolLease {
    /// Run an async future on the pool and block until it resolves.
    pub(crate) fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });
        rx.recv()
            .map_err(|err| BraidError::internal(format!("worker pool channel closed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_runs_future() {
        let pool = WorkerPool::start(&ExecutorConfig::default()).unwrap();
        let lease = pool.lease().unwrap();
        let value = lease.run(async { 40 + 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_lease_after_drain_fails() {
        let pool = WorkerPool::start(&ExecutorConfig::new().max_workers(1)).unwrap();
        assert_eq!(pool.max_workers, 1);
        pool.drain(None);
        assert!(matches!(pool.lease(), Err(BraidError::ExecutorShutdown)));
        // Draining twice is harmless.
        pool.drain(None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = WorkerPool::start(&ExecutorConfig::new().max_workers(0));
        assert!(result.is_err());
    }
}
