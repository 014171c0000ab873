//! Search tasks and batch results.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tokio::task::{AbortHandle, JoinError};
use tokio_util::sync::CancellationToken;

use crate::data::SearchHit;

/// Body of a search task.
///
/// The token is cancelled once the executor stops waiting for the task
/// (timeout, or it lost a race). Bodies that never check it keep running in
/// the background and their result is discarded.
pub type SearchOperation =
    Box<dyn FnOnce(CancellationToken) -> anyhow::Result<Vec<SearchHit>> + Send + 'static>;

/// A named, independent search operation submitted to the executor once.
pub struct SearchTask {
    name: String,
    operation: SearchOperation,
}

impl SearchTask {
    /// Create a task whose body receives a cancellation token.
    pub fn new<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> anyhow::Result<Vec<SearchHit>> + Send + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(operation),
        }
    }

    /// Create a task from a body that does not observe cancellation.
    pub fn from_fn<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Vec<SearchHit>> + Send + 'static,
    {
        Self::new(name, move |_| operation())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, SearchOperation) {
        (self.name, self.operation)
    }
}

impl fmt::Debug for SearchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchTask")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Error recorded for tasks cut off by the batch-wide deadline.
pub const TIMEOUT_ERROR: &str = "Timeout";

/// Results of one [`execute_searches`](super::SearchExecutor::execute_searches) call.
///
/// Every submitted task name is present in `results`. Tasks that failed or
/// timed out map to an empty hit list there and additionally have an entry in
/// `errors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchBatchResult {
    results: HashMap<String, Vec<SearchHit>>,
    errors: HashMap<String, String>,
}

impl SearchBatchResult {
    pub(crate) fn record_success(&mut self, name: String, hits: Vec<SearchHit>) {
        self.results.insert(name, hits);
    }

    pub(crate) fn record_failure(&mut self, name: String, error: impl Into<String>) {
        self.results.insert(name.clone(), Vec::new());
        self.errors.insert(name, error.into());
    }

    /// Hits produced by `name`; empty for failed tasks, `None` for unknown names.
    pub fn hits(&self, name: &str) -> Option<&[SearchHit]> {
        self.results.get(name).map(Vec::as_slice)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn is_success(&self, name: &str) -> bool {
        self.results.contains_key(name) && !self.errors.contains_key(name)
    }

    pub fn results(&self) -> &HashMap<String, Vec<SearchHit>> {
        &self.results
    }

    pub fn errors(&self) -> &HashMap<String, String> {
        &self.errors
    }

    /// Names of tasks that completed successfully.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.results
            .keys()
            .filter(|name| !self.errors.contains_key(*name))
            .map(String::as_str)
    }

    /// Names of tasks that failed or timed out.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Number of tasks in the batch.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_parts(self) -> (HashMap<String, Vec<SearchHit>>, HashMap<String, String>) {
        (self.results, self.errors)
    }
}

/// How a single task ended, from the executor's point of view.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    Completed(Vec<SearchHit>),
    Failed(String),
}

impl TaskOutcome {
    pub(crate) fn from_join(joined: Result<anyhow::Result<Vec<SearchHit>>, JoinError>) -> Self {
        match joined {
            Ok(Ok(hits)) => TaskOutcome::Completed(hits),
            Ok(Err(err)) => TaskOutcome::Failed(format!("{err:#}")),
            Err(err) => TaskOutcome::Failed(join_error_message(err)),
        }
    }
}

/// Describe a task body that panicked or was aborted before starting.
pub(crate) fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        format!("task panicked: {}", panic_message(err.into_panic()))
    } else {
        "task was cancelled before it started".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handles for giving up on a spawned task body.
///
/// Aborting only prevents a body that has not started yet; one that is
/// already running is signalled through its token and otherwise left alone.
#[derive(Debug, Clone)]
pub(crate) struct Abandon {
    abort: AbortHandle,
    token: CancellationToken,
}

impl Abandon {
    pub(crate) fn new(abort: AbortHandle, token: CancellationToken) -> Self {
        Self { abort, token }
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
        self.abort.abort();
    }
}
