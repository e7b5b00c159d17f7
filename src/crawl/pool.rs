//! Bounded worker pool over a fixed work list.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};

use super::{CrawlError, StopSignal};

/// Run `handler` over `items` on `workers` concurrent tasks.
///
/// Items are taken in list order. Once `stop` fires, workers finish the item
/// they hold and take no more. Returns how many items were handed out.
pub async fn run_workers<T, F, Fut>(
    items: Vec<T>,
    workers: usize,
    stop: &StopSignal,
    handler: F,
) -> Result<usize, CrawlError>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if workers == 0 {
        return Err(CrawlError::NoWorkers);
    }
    if items.is_empty() {
        return Ok(0);
    }

    let workers = workers.min(items.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(items)));
    let handler = Arc::new(handler);
    let dispatched = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let queue = queue.clone();
        let handler = handler.clone();
        let dispatched = dispatched.clone();
        let stop = stop.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if stop.is_stopped() {
                    debug!("Worker {} stopping", worker);
                    break;
                }

                let item = {
                    let mut queue = queue.lock().await;
                    queue.pop_front()
                };
                let Some(item) = item else {
                    break;
                };

                dispatched.fetch_add(1, Ordering::Relaxed);
                (*handler)(item).await;
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }

    Ok(dispatched.load(Ordering::Relaxed))
}
