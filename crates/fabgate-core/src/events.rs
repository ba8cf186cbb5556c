//! `ChaincodeEventStream` — flattens block batches into individual events.
//!
//! The adapter pulls one [`BlockEventBatch`] at a time from its upstream
//! source and hands out the batch's records one by one, in their original
//! order, before pulling the next batch. Records are decoded only when they
//! are requested, so a consumer that stops mid-batch never pays for the rest.
//!
//! Closing the adapter closes the upstream source. Reaching the natural end
//! of the upstream stream does not.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::stream::CloseableStream;
use crate::types::{BlockEventBatch, ChaincodeEvent, RawEventRecord};

/// Counters snapshot for one event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMetrics {
    pub batches_received: u64,
    pub events_emitted: u64,
}

/// Records of the batch currently being drained.
#[derive(Default)]
struct BatchCursor {
    block_number: u64,
    pending: VecDeque<RawEventRecord>,
}

/// Closable stream of [`ChaincodeEvent`] over a closable stream of batches.
///
/// The upstream source is owned exclusively by this adapter; wrapping the
/// same source twice would consume and close it twice.
pub struct ChaincodeEventStream<S> {
    upstream: S,
    closed: AtomicBool,
    cursor: Mutex<BatchCursor>,
    batches_received: AtomicU64,
    events_emitted: AtomicU64,
}

impl<S> ChaincodeEventStream<S>
where
    S: CloseableStream<Item = BlockEventBatch>,
{
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            closed: AtomicBool::new(false),
            cursor: Mutex::new(BatchCursor::default()),
            batches_received: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
        }
    }

    /// Returns `true` once `close` has been called on this adapter.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> StreamMetrics {
        StreamMetrics {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<S> CloseableStream for ChaincodeEventStream<S>
where
    S: CloseableStream<Item = BlockEventBatch>,
{
    type Item = ChaincodeEvent;

    async fn next(&self) -> Option<Result<ChaincodeEvent, GatewayError>> {
        if self.is_closed() {
            return None;
        }
        let mut cursor = self.cursor.lock().await;
        loop {
            // Re-checked after every upstream wait: a close that raced with
            // the receive discards whatever arrived.
            if self.is_closed() {
                cursor.pending.clear();
                return None;
            }

            if let Some(record) = cursor.pending.pop_front() {
                self.events_emitted.fetch_add(1, Ordering::Relaxed);
                return Some(Ok(record.decode(cursor.block_number)));
            }

            let batch = match self.upstream.next().await? {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::debug!(error = %e, "chaincode event stream receive failed");
                    return Some(Err(e));
                }
            };

            self.batches_received.fetch_add(1, Ordering::Relaxed);
            cursor.block_number = batch.block_number();
            cursor.pending = batch.into_events().into();
            tracing::trace!(
                block = cursor.block_number,
                events = cursor.pending.len(),
                "received block event batch"
            );
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("closing chaincode event stream");
        }
        self.upstream.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::channel;
    use crate::stream::CloseableStreamExt;

    fn record(name: &str) -> RawEventRecord {
        RawEventRecord::new("cc1", name, format!("tx-{name}"), vec![])
    }

    #[tokio::test]
    async fn empty_batches_are_skipped() {
        let (tx, upstream) = channel(4);
        tx.send(Ok(BlockEventBatch::new(1, vec![]))).await.unwrap();
        tx.send(Ok(BlockEventBatch::new(2, vec![record("a")]))).await.unwrap();
        drop(tx);

        let events = ChaincodeEventStream::new(upstream);
        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.block_number(), 2);
        assert!(events.next().await.is_none());
        assert_eq!(
            events.metrics(),
            StreamMetrics { batches_received: 2, events_emitted: 1 }
        );
    }

    #[tokio::test]
    async fn works_as_futures_stream() {
        use futures::StreamExt;

        let (tx, upstream) = channel(4);
        tx.send(Ok(BlockEventBatch::new(7, vec![record("a"), record("b")])))
            .await
            .unwrap();
        drop(tx);

        let names: Vec<String> = ChaincodeEventStream::new(upstream)
            .into_stream()
            .map(|ev| ev.unwrap().event_name().to_string())
            .collect()
            .await;
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_tx, upstream) = channel::<BlockEventBatch>(1);
        let events = ChaincodeEventStream::new(upstream);
        events.close();
        events.close();
        assert!(events.is_closed());
        assert!(events.next().await.is_none());
    }
}
