//! Time and count bounded batching.
//!
//! [`Batcher`] is a pure state machine: the caller passes the current
//! instant with every call, so tests can drive it with any clock. The
//! async driver [`run_batcher`] feeds it from a channel using tokio's
//! clock, which tests pause and advance.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Accumulates items and closes a batch on size or age.
///
/// The window of a batch starts at its first item, so idle periods never
/// produce empty batches.
#[derive(Debug)]
pub struct Batcher<T> {
    max_items: usize,
    window: Duration,
    items: Vec<T>,
    opened_at: Option<Instant>,
}

impl<T> Batcher<T> {
    /// Create a batcher closing batches at `max_items` items or `window`
    /// after their first item, whichever comes first.
    pub fn new(max_items: usize, window: Duration) -> Self {
        let max_items = max_items.max(1);
        Self {
            max_items,
            window,
            items: Vec::with_capacity(max_items),
            opened_at: None,
        }
    }

    /// Add an item; returns the batch if this item filled it.
    pub fn push(&mut self, item: T, now: Instant) -> Option<Vec<T>> {
        if self.items.is_empty() {
            self.opened_at = Some(now);
        }
        self.items.push(item);

        if self.items.len() >= self.max_items {
            self.take()
        } else {
            None
        }
    }

    /// Close the open batch if its window has elapsed.
    pub fn poll_expired(&mut self, now: Instant) -> Option<Vec<T>> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.take(),
            _ => None,
        }
    }

    /// When the open batch must be closed; `None` when nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.window)
    }

    /// Close the open batch regardless of size or age.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        self.take()
    }

    /// Items in the open batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no batch is open.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn take(&mut self) -> Option<Vec<T>> {
        self.opened_at = None;
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::replace(
                &mut self.items,
                Vec::with_capacity(self.max_items),
            ))
        }
    }
}

/// Drive `batcher` from `input` until the input closes, sending every
/// closed batch to `output`. The open batch is flushed on close.
///
/// Returns the number of batches emitted.
pub async fn run_batcher<T: Send>(
    mut batcher: Batcher<T>,
    mut input: mpsc::Receiver<T>,
    output: mpsc::Sender<Vec<T>>,
) -> usize {
    let mut emitted = 0;

    loop {
        let deadline = batcher.deadline();
        let closed = tokio::select! {
            biased;

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                batcher.poll_expired(Instant::now())
            }
            item = input.recv() => match item {
                Some(item) => {
                    // a window that ran out while the item was in flight closes first
                    if let Some(expired) = batcher.poll_expired(Instant::now()) {
                        if output.send(expired).await.is_err() {
                            return emitted;
                        }
                        emitted += 1;
                    }
                    batcher.push(item, Instant::now())
                }
                None => {
                    if let Some(rest) = batcher.flush() {
                        debug!(items = rest.len(), "Flushing final batch");
                        if output.send(rest).await.is_ok() {
                            emitted += 1;
                        }
                    }
                    return emitted;
                }
            },
        };

        if let Some(batch) = closed {
            debug!(items = batch.len(), "Batch closed");
            if output.send(batch).await.is_err() {
                return emitted;
            }
            emitted += 1;
        }
    }
}
