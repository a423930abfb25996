//! Bounded, order-preserving scatter/gather over the blocking thread pool.
//!
//! Page formatting and image re-encoding are CPU-bound, so each item runs in
//! `tokio::task::spawn_blocking`. A `buffered(n)` stream keeps at most `n`
//! tasks in flight and yields results in submission order, which is what
//! keeps page output in document order without any sorting afterwards.
//!
//! Items are shared with the workers through an `Arc<[T]>`, never copied.
//! If a task fails to join (it panicked or the runtime is shutting down),
//! only that item is run again on the calling thread; results that already
//! came back are kept as they are.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default worker count: one less than the available cores, at least one.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Size a pool for `items` work items.
///
/// `min(hint, cores - 1, items)`, never below 1. A missing or zero hint
/// means "cores - 1".
pub fn pool_size(hint: Option<usize>, items: usize) -> usize {
    let cap = default_workers();
    let wanted = hint.filter(|&n| n > 0).unwrap_or(cap);
    wanted.min(cap).min(items).max(1)
}

/// Apply `f` to every item on up to `workers` blocking threads and return
/// the results in input order.
///
/// Zero or one item is processed inline on the calling thread. The caller
/// keeps its own handle on `items` to pair them with the results.
pub async fn map_ordered<T, R, F>(items: Arc<[T]>, workers: usize, f: F) -> Vec<R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    if items.len() <= 1 {
        return items.iter().map(f).collect();
    }

    let workers = workers.max(1);
    let f = Arc::new(f);
    debug!("Dispatching {} items over {} workers", items.len(), workers);

    let joined: Vec<Result<R, tokio::task::JoinError>> = stream::iter((0..items.len()).map(|i| {
        let f = Arc::clone(&f);
        let items = Arc::clone(&items);
        tokio::task::spawn_blocking(move || (*f)(&items[i]))
    }))
    .buffered(workers)
    .collect()
    .await;

    let failed = joined.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(
            "{} of {} workers failed; running those items sequentially",
            failed,
            items.len()
        );
    }

    joined
        .into_iter()
        .enumerate()
        .map(|(i, result)| match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Item {} failed to join ({}); retrying inline", i, e);
                (*f)(&items[i])
            }
        })
        .collect()
}
