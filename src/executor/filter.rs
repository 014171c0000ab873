//! Concurrent evaluation of independent filter predicates.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::join_all;
use log::warn;

use crate::executor::task::join_error_message;

/// A filter predicate evaluated against every item of a collection.
pub type Predicate<T> = Box<dyn Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static>;

/// Evaluate every predicate concurrently and keep the items accepted by all
/// of them, in their original order.
///
/// A predicate that errors or panics on any item is dropped from the
/// intersection instead of failing the whole filter, so a broken predicate
/// silently widens the result. With no usable predicate every item is kept.
///
/// Must be polled on the worker pool runtime.
pub(crate) async fn run_filters<T, K, F>(
    items: Vec<T>,
    predicates: Vec<Predicate<T>>,
    key_fn: F,
) -> Vec<T>
where
    T: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    if predicates.is_empty() {
        return items;
    }

    let items = Arc::new(items);
    let key_fn = Arc::new(key_fn);

    let handles = predicates.into_iter().map(|predicate| {
        let items = Arc::clone(&items);
        let key_fn = Arc::clone(&key_fn);
        tokio::task::spawn_blocking(move || -> anyhow::Result<HashSet<K>> {
            let mut accepted = HashSet::new();
            for item in items.iter() {
                if predicate(item)? {
                    accepted.insert(key_fn(item));
                }
            }
            Ok(accepted)
        })
    });

    let mut intersection: Option<HashSet<K>> = None;
    for (position, joined) in join_all(handles).await.into_iter().enumerate() {
        let accepted = match joined {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(err)) => {
                warn!("filter predicate #{position} failed and was ignored: {err:#}");
                continue;
            }
            Err(err) => {
                let reason = join_error_message(err);
                warn!("filter predicate #{position} failed and was ignored: {reason}");
                continue;
            }
        };
        intersection = Some(match intersection {
            Some(current) => current.into_iter().filter(|k| accepted.contains(k)).collect(),
            None => accepted,
        });
    }

    let items = Arc::try_unwrap(items).unwrap_or_else(|shared| shared.as_ref().clone());
    match intersection {
        Some(keep) => items
            .into_iter()
            .filter(|item| keep.contains(&key_fn(item)))
            .collect(),
        None => items,
    }
}
