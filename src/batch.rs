//! Rate-limited batch execution
//!
//! Gmail per-user quota is easiest to respect by pacing bursts: run a fixed
//! number of independent operations concurrently, pause, then start the next
//! chunk. One item failing must never sink the chunk it rode in on, so the
//! executor returns a per-item `Result` in the original input order.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// Pacing parameters shared by detail-fetch, bulk-move, and bulk-delete work
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub chunk_size: usize,
    pub inter_chunk_delay: Duration,
}

impl BatchOptions {
    pub fn new(chunk_size: usize, inter_chunk_delay: Duration) -> Self {
        Self {
            chunk_size,
            inter_chunk_delay,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            inter_chunk_delay: Duration::from_secs(1),
        }
    }
}

/// Run `op` over `items` in consecutive chunks
///
/// Operations within a chunk run concurrently; chunks are separated by
/// `inter_chunk_delay`, with no delay after the final chunk. Output order
/// matches input order, and each item's failure is captured as its own
/// `Err` entry.
pub async fn run_chunked<T, R, F, Fut>(
    items: Vec<T>,
    options: BatchOptions,
    op: F,
) -> Vec<Result<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let chunk_size = options.chunk_size.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    let mut chunks = items.into_iter().peekable();
    let mut chunk_index = 0usize;

    while chunks.peek().is_some() {
        let chunk: Vec<T> = chunks.by_ref().take(chunk_size).collect();
        debug!(
            "Running batch chunk {} ({} of {} items done)",
            chunk_index,
            results.len(),
            total
        );

        let chunk_results = futures::future::join_all(chunk.into_iter().map(&op)).await;
        results.extend(chunk_results);
        chunk_index += 1;

        if chunks.peek().is_some() && !options.inter_chunk_delay.is_zero() {
            tokio::time::sleep(options.inter_chunk_delay).await;
        }
    }

    results
}
