//! Concurrent execution of a batch of named search tasks.

use std::collections::HashMap;
use std::time::Duration;

use log::warn;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::executor::task::{Abandon, SearchBatchResult, SearchTask, TIMEOUT_ERROR, TaskOutcome};

/// Per-task result as seen by the collector.
enum Collected {
    Outcome(TaskOutcome),
    TimedOut(Duration),
}

/// Run every task on the blocking pool and collect results by name.
///
/// Must be polled on the worker pool runtime.
pub(crate) async fn run_batch(
    tasks: Vec<SearchTask>,
    per_task_timeout: Option<Duration>,
    total_timeout: Option<Duration>,
) -> SearchBatchResult {
    let deadline = total_timeout.map(|budget| Instant::now() + budget);
    let mut outstanding: HashMap<String, Abandon> = HashMap::with_capacity(tasks.len());
    let mut pending = JoinSet::new();

    for task in tasks {
        let (name, operation) = task.into_parts();
        let token = CancellationToken::new();
        let body_token = token.clone();
        let (started_tx, started_rx) = oneshot::channel();
        let handle = tokio::task::spawn_blocking(move || {
            let _ = started_tx.send(());
            operation(body_token)
        });
        outstanding.insert(name.clone(), Abandon::new(handle.abort_handle(), token));

        pending.spawn(async move {
            let collected = match per_task_timeout {
                Some(limit) => {
                    // Time spent queued behind busy workers is not charged to the task.
                    // The sender is dropped unsent when the body is aborted before it starts.
                    let _ = started_rx.await;
                    match tokio::time::timeout(limit, handle).await {
                        Ok(joined) => Collected::Outcome(TaskOutcome::from_join(joined)),
                        Err(_) => Collected::TimedOut(limit),
                    }
                }
                None => Collected::Outcome(TaskOutcome::from_join(handle.await)),
            };
            (name, collected)
        });
    }

    let mut batch = SearchBatchResult::default();
    let mut deadline_hit = false;

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, pending.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    deadline_hit = true;
                    break;
                }
            },
            None => pending.join_next().await,
        };
        let Some(joined) = next else {
            break;
        };
        let (name, collected) = match joined {
            Ok(value) => value,
            Err(err) => {
                warn!("search collector failed: {err}");
                continue;
            }
        };
        let Some(abandon) = outstanding.remove(&name) else {
            continue;
        };

        match collected {
            Collected::Outcome(TaskOutcome::Completed(hits)) => batch.record_success(name, hits),
            Collected::Outcome(TaskOutcome::Failed(reason)) => {
                warn!("search task '{name}' failed: {reason}");
                batch.record_failure(name, reason);
            }
            Collected::TimedOut(limit) => {
                abandon.cancel();
                // The batch deadline takes precedence when both have passed.
                let past_deadline = deadline.is_some_and(|deadline| Instant::now() >= deadline);
                if past_deadline {
                    batch.record_failure(name, TIMEOUT_ERROR);
                } else {
                    warn!("search task '{name}' timed out after {limit:?}");
                    batch.record_failure(name, format!("task timed out after {limit:?}"));
                }
            }
        }
    }

    if !outstanding.is_empty() {
        pending.abort_all();
        for (name, abandon) in outstanding {
            abandon.cancel();
            if deadline_hit {
                warn!("search task '{name}' cut off by batch deadline");
                batch.record_failure(name, TIMEOUT_ERROR);
            } else {
                batch.record_failure(name, "task result was lost");
            }
        }
    }

    batch
}
