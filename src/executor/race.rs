//! Race two redundant search strategies and keep the first good answer.

use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::data::SearchHit;
use crate::executor::task::{Abandon, SearchTask, TaskOutcome};

struct Contender {
    name: String,
    handle: JoinHandle<anyhow::Result<Vec<SearchHit>>>,
    abandon: Abandon,
}

impl Contender {
    fn spawn(task: SearchTask) -> Self {
        let (name, operation) = task.into_parts();
        let token = CancellationToken::new();
        let body_token = token.clone();
        let handle = tokio::task::spawn_blocking(move || operation(body_token));
        let abandon = Abandon::new(handle.abort_handle(), token);
        Self {
            name,
            handle,
            abandon,
        }
    }

    /// Wait up to `limit` for this contender alone.
    async fn finish(self, limit: Duration) -> Vec<SearchHit> {
        match tokio::time::timeout(limit, self.handle).await {
            Ok(joined) => match TaskOutcome::from_join(joined) {
                TaskOutcome::Completed(hits) => hits,
                TaskOutcome::Failed(reason) => {
                    warn!("race contender '{}' failed: {reason}", self.name);
                    Vec::new()
                }
            },
            Err(_) => {
                warn!("race contender '{}' timed out after {limit:?}", self.name);
                self.abandon.cancel();
                Vec::new()
            }
        }
    }
}

/// Which contender finished first.
enum Side {
    Primary,
    Fallback,
}

/// Must be polled on the worker pool runtime.
pub(crate) async fn run_race(
    primary: SearchTask,
    fallback: Option<SearchTask>,
    limit: Duration,
) -> Vec<SearchHit> {
    let mut primary = Contender::spawn(primary);
    let Some(fallback) = fallback else {
        return primary.finish(limit).await;
    };
    let mut fallback = Contender::spawn(fallback);

    let first = tokio::time::timeout(limit, async {
        tokio::select! {
            joined = &mut primary.handle => (Side::Primary, joined),
            joined = &mut fallback.handle => (Side::Fallback, joined),
        }
    })
    .await;

    let (side, joined) = match first {
        Ok(first) => first,
        Err(_) => {
            warn!(
                "neither '{}' nor '{}' finished within {limit:?}",
                primary.name, fallback.name
            );
            primary.abandon.cancel();
            fallback.abandon.cancel();
            return Vec::new();
        }
    };
    let (winner, loser) = match side {
        Side::Primary => (primary, fallback),
        Side::Fallback => (fallback, primary),
    };

    match TaskOutcome::from_join(joined) {
        TaskOutcome::Completed(hits) => {
            debug!("race won by '{}'", winner.name);
            loser.abandon.cancel();
            hits
        }
        TaskOutcome::Failed(reason) => {
            warn!(
                "race leader '{}' failed ({reason}); waiting for '{}'",
                winner.name, loser.name
            );
            loser.finish(limit).await
        }
    }
}
