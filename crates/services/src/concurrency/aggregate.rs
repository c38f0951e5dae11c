use std::future::Future;

use tokio::sync::oneshot;

use crate::dao::{DaoError, DaoResult, PaginatedResult, PaginationParams};

/// Runs a count query and a page query as two independent tasks and
/// joins them into one page. Each task reports through its own
/// one-shot channel; a task that dies without reporting surfaces as
/// [`DaoError::TaskFailed`] instead of leaving the caller waiting.
pub async fn count_and_list<T, C, L>(
    count: C,
    list: L,
    params: &PaginationParams,
) -> DaoResult<PaginatedResult<T>>
where
    T: Send + 'static,
    C: Future<Output = DaoResult<u64>> + Send + 'static,
    L: Future<Output = DaoResult<Vec<T>>> + Send + 'static,
{
    let (count_tx, count_rx) = oneshot::channel();
    let (list_tx, list_rx) = oneshot::channel();

    tokio::spawn(async move {
        let _ = count_tx.send(count.await);
    });
    tokio::spawn(async move {
        let _ = list_tx.send(list.await);
    });

    let (total, items) = tokio::join!(count_rx, list_rx);
    let total = total.map_err(|_| DaoError::TaskFailed("count".into()))??;
    let items = items.map_err(|_| DaoError::TaskFailed("list".into()))??;

    Ok(PaginatedResult::new(items, total, params))
}
