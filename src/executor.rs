//! Concurrent execution of independent search strategies.
//!
//! [`SearchExecutor`] owns a bounded worker pool shared by every caller. It
//! offers three operations:
//!
//! - [`execute_searches`](SearchExecutor::execute_searches): run a batch of
//!   named tasks under per-task and batch-wide time budgets
//! - [`race_search`](SearchExecutor::race_search): run two redundant
//!   strategies and adopt whichever succeeds first
//! - [`execute_filters`](SearchExecutor::execute_filters): evaluate
//!   independent predicates concurrently and intersect their results
//!
//! # Cancellation
//!
//! Cancellation is best-effort. A task that has not started when it is
//! abandoned never runs; a task that is already running receives a cancelled
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and keeps its
//! worker until its body returns. "Cancelled" means "no longer awaited", not
//! "guaranteed stopped".
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use braid::{SearchExecutor, SearchHit, SearchTask};
//!
//! let executor = SearchExecutor::new();
//! let tasks = vec![
//!     SearchTask::from_fn("lexical", || Ok(vec![SearchHit::new("a", 1.0)])),
//!     SearchTask::from_fn("vector", || Ok(vec![SearchHit::new("b", 0.8)])),
//! ];
//! let batch = executor
//!     .execute_searches(tasks, Some(Duration::from_secs(2)), Some(Duration::from_secs(5)))
//!     .unwrap();
//! assert!(batch.is_success("lexical"));
//! executor.shutdown();
//! ```

pub mod config;
pub mod task;

mod batch;
mod filter;
mod pool;
mod race;

use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;

use crate::data::SearchHit;
use crate::error::{BraidError, Result};

use self::config::ExecutorConfig;
use self::pool::{PoolLease, WorkerPool};
use self::task::{SearchBatchResult, SearchTask};

pub use self::filter::Predicate;

enum PoolSlot {
    /// No pool yet; one is created on first use.
    Idle,
    Running(WorkerPool),
    ShutDown,
}

struct ExecutorState {
    config: ExecutorConfig,
    slot: PoolSlot,
}

/// Coordinates search tasks on a bounded, lazily created worker pool.
///
/// Construct one at startup and pass it by reference to every caller.
/// Creating, replacing and shutting down the pool happen under a single lock,
/// so concurrent [`reconfigure`](Self::reconfigure) calls are serialized and
/// never leak a pool.
///
/// Blocking methods must not be called from inside an async context, and task
/// bodies must not call back into the same executor while it is being
/// reconfigured or shut down.
pub struct SearchExecutor {
    state: Mutex<ExecutorState>,
}

impl std::fmt::Debug for SearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SearchExecutor")
            .field("config", &state.config)
            .field("running", &matches!(state.slot, PoolSlot::Running(_)))
            .finish()
    }
}

impl Default for SearchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchExecutor {
    /// Create an executor with the default configuration (6 workers).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ExecutorState {
                config: ExecutorConfig::default(),
                slot: PoolSlot::Idle,
            }),
        }
    }

    pub fn with_config(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(ExecutorState {
                config,
                slot: PoolSlot::Idle,
            }),
        })
    }

    pub fn config(&self) -> ExecutorConfig {
        self.state.lock().config.clone()
    }

    pub fn max_workers(&self) -> usize {
        self.state.lock().config.max_workers
    }

    /// Whether a worker pool is currently alive.
    pub fn is_running(&self) -> bool {
        matches!(self.state.lock().slot, PoolSlot::Running(_))
    }

    /// Get the running pool, creating it on first use.
    fn lease(&self) -> Result<PoolLease> {
        let mut state = self.state.lock();
        match &state.slot {
            PoolSlot::Running(pool) => return pool.lease(),
            PoolSlot::ShutDown => return Err(BraidError::ExecutorShutdown),
            PoolSlot::Idle => {}
        }
        let pool = WorkerPool::start(&state.config)?;
        let lease = pool.lease();
        state.slot = PoolSlot::Running(pool);
        lease
    }

    /// Run every task concurrently and collect results by task name.
    ///
    /// - A task exceeding `per_task_timeout` gets an empty result and an error
    ///   describing the timeout. The clock starts when the task's body starts
    ///   running, not while it waits for a free worker.
    /// - Once `total_timeout` elapses, every unfinished task gets an empty
    ///   result and the error `"Timeout"`; the batch returns immediately.
    /// - A failing or panicking task never affects its siblings.
    ///
    /// Only programming errors are returned as `Err`: duplicate task names or a
    /// shut-down executor. An empty task list yields an empty result.
    pub fn execute_searches(
        &self,
        tasks: Vec<SearchTask>,
        per_task_timeout: Option<Duration>,
        total_timeout: Option<Duration>,
    ) -> Result<SearchBatchResult> {
        let mut names = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !names.insert(task.name()) {
                return Err(BraidError::invalid_argument(format!(
                    "duplicate search task name '{}'",
                    task.name()
                )));
            }
        }
        if tasks.is_empty() {
            return Ok(SearchBatchResult::default());
        }

        let lease = self.lease()?;
        lease.run(batch::run_batch(tasks, per_task_timeout, total_timeout))
    }

    /// Run `primary` and `fallback` concurrently and return the first
    /// successful result.
    ///
    /// If the first task to finish failed, the other one is awaited for up to
    /// `timeout` more. When nothing succeeds in time the result is empty; task
    /// failures are logged, never returned.
    pub fn race_search(
        &self,
        primary: SearchTask,
        fallback: Option<SearchTask>,
        timeout: Duration,
    ) -> Result<Vec<SearchHit>> {
        let lease = self.lease()?;
        lease.run(race::run_race(primary, fallback, timeout))
    }

    /// Keep the items accepted by every predicate, comparing items by value.
    ///
    /// See [`execute_filters_by_key`](Self::execute_filters_by_key).
    pub fn execute_filters<T>(&self, items: Vec<T>, predicates: Vec<Predicate<T>>) -> Result<Vec<T>>
    where
        T: Clone + Eq + Hash + Send + Sync + 'static,
    {
        self.execute_filters_by_key(items, predicates, T::clone)
    }

    /// Evaluate `predicates` concurrently over `items` and keep the items
    /// whose key is accepted by all of them, preserving input order.
    ///
    /// A predicate that fails is logged and left out of the intersection. It
    /// imposes no constraint, so a broken predicate weakens the filter rather
    /// than failing it.
    pub fn execute_filters_by_key<T, K, F>(
        &self,
        items: Vec<T>,
        predicates: Vec<Predicate<T>>,
        key_fn: F,
    ) -> Result<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        if predicates.is_empty() || items.is_empty() {
            return Ok(items);
        }
        let lease = self.lease()?;
        lease.run(filter::run_filters(items, predicates, key_fn))
    }

    /// Replace the worker pool with one of `max_workers` workers.
    ///
    /// The old pool is drained first: in-flight calls complete before the new
    /// pool is created.
    pub fn reconfigure(&self, max_workers: usize) -> Result<()> {
        let mut state = self.state.lock();
        if matches!(state.slot, PoolSlot::ShutDown) {
            return Err(BraidError::ExecutorShutdown);
        }
        let config = ExecutorConfig {
            max_workers,
            ..state.config.clone()
        };
        config.validate()?;

        if let PoolSlot::Running(old) = std::mem::replace(&mut state.slot, PoolSlot::Idle) {
            old.drain(state.config.shutdown_timeout());
        }
        let pool = WorkerPool::start(&config)?;
        debug!(
            "reconfigured search executor: {} -> {} workers",
            state.config.max_workers, max_workers
        );
        state.config = config;
        state.slot = PoolSlot::Running(pool);
        Ok(())
    }

    /// Drain in-flight work and stop the pool. Later calls fail with
    /// [`BraidError::ExecutorShutdown`]. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let PoolSlot::Running(pool) = std::mem::replace(&mut state.slot, PoolSlot::ShutDown) {
            pool.drain(state.config.shutdown_timeout());
        }
    }
}
