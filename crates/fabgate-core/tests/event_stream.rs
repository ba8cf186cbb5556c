//! Behavioural tests for the chaincode event stream adapter.
//!
//! Upstream sources are scripted: each test queues the batches (or errors)
//! the gateway would deliver and counts how often the adapter closes it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fabgate_core::channel::channel;
use fabgate_core::{
    BlockEventBatch, ChaincodeEvent, ChaincodeEventStream, CloseableStream, GatewayError,
    RawEventRecord,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Upstream that replays a fixed script and records close calls.
#[derive(Clone, Default)]
struct Scripted {
    items: Arc<Mutex<VecDeque<Result<BlockEventBatch, GatewayError>>>>,
    pulls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(items: Vec<Result<BlockEventBatch, GatewayError>>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.into())),
            ..Default::default()
        }
    }

    fn batches(batches: Vec<BlockEventBatch>) -> Self {
        Self::new(batches.into_iter().map(Ok).collect())
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloseableStream for Scripted {
    type Item = BlockEventBatch;

    async fn next(&self) -> Option<Result<BlockEventBatch, GatewayError>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().pop_front()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn rec(name: &str, tx: &str, payload: &[u8]) -> RawEventRecord {
    RawEventRecord::new("cc1", name, tx, payload.to_vec())
}

async fn collect<S: CloseableStream<Item = ChaincodeEvent>>(stream: &S) -> Vec<ChaincodeEvent> {
    let mut out = vec![];
    while let Some(event) = stream.next().await {
        out.push(event.expect("unexpected stream error"));
    }
    out
}

// ─── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_block_scenario_in_exact_order() {
    let upstream = Scripted::batches(vec![
        BlockEventBatch::new(5, vec![rec("ev1", "t1", &[1, 2])]),
        BlockEventBatch::new(6, vec![rec("ev2", "t2", &[]), rec("ev3", "t3", &[9])]),
    ]);
    let events = collect(&ChaincodeEventStream::new(upstream.clone())).await;

    let summary: Vec<_> = events
        .iter()
        .map(|e| (e.block_number(), e.event_name(), e.transaction_id(), e.payload().to_vec()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (5, "ev1", "t1", vec![1, 2]),
            (6, "ev2", "t2", vec![]),
            (6, "ev3", "t3", vec![9]),
        ]
    );
    assert!(events.iter().all(|e| e.chaincode_name() == "cc1"));
}

#[tokio::test]
async fn output_length_is_sum_of_records_in_block_order() {
    let batches: Vec<_> = (10..20u64)
        .map(|block| {
            let records = (0..(block % 4 + 1))
                .map(|i| rec(&format!("ev{i}"), &format!("tx{block}-{i}"), &[]))
                .collect();
            BlockEventBatch::new(block, records)
        })
        .collect();
    let expected: usize = batches.iter().map(BlockEventBatch::len).sum();

    let events = collect(&ChaincodeEventStream::new(Scripted::batches(batches))).await;
    assert_eq!(events.len(), expected);

    for pair in events.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.block_number() <= b.block_number());
        if a.block_number() == b.block_number() {
            assert!(a.event_name() < b.event_name(), "intra-block order broken");
        }
    }
}

#[tokio::test]
async fn batch_is_pulled_only_when_previous_is_drained() {
    let upstream = Scripted::batches(vec![
        BlockEventBatch::new(1, vec![rec("a", "t1", &[]), rec("b", "t1", &[])]),
        BlockEventBatch::new(2, vec![rec("c", "t2", &[])]),
    ]);
    let events = ChaincodeEventStream::new(upstream.clone());

    events.next().await.unwrap().unwrap();
    events.next().await.unwrap().unwrap();
    assert_eq!(upstream.pulls(), 1);

    events.next().await.unwrap().unwrap();
    assert_eq!(upstream.pulls(), 2);
}

// ─── Close ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_before_first_element() {
    let upstream = Scripted::batches(vec![BlockEventBatch::new(1, vec![rec("a", "t1", &[])])]);
    let events = ChaincodeEventStream::new(upstream.clone());

    events.close();
    assert!(events.next().await.is_none());
    assert_eq!(upstream.closes(), 1);
    assert_eq!(upstream.pulls(), 0);
}

#[tokio::test]
async fn close_mid_batch_halts_production() {
    let upstream = Scripted::batches(vec![
        BlockEventBatch::new(1, vec![rec("a", "t1", &[]), rec("b", "t1", &[])]),
        BlockEventBatch::new(2, vec![rec("c", "t2", &[])]),
    ]);
    let events = ChaincodeEventStream::new(upstream.clone());

    let first = events.next().await.unwrap().unwrap();
    assert_eq!(first.event_name(), "a");

    events.close();
    assert!(events.next().await.is_none());
    assert!(events.next().await.is_none());
    assert_eq!(upstream.closes(), 1);
    assert_eq!(events.metrics().events_emitted, 1);
}

#[tokio::test]
async fn each_close_reaches_upstream() {
    let upstream = Scripted::default();
    let events = ChaincodeEventStream::new(upstream.clone());
    events.close();
    events.close();
    assert_eq!(upstream.closes(), 2);
}

#[tokio::test]
async fn natural_end_does_not_close_upstream() {
    let upstream = Scripted::batches(vec![BlockEventBatch::new(3, vec![rec("a", "t1", &[])])]);
    let events = ChaincodeEventStream::new(upstream.clone());

    assert_eq!(collect(&events).await.len(), 1);
    assert!(events.next().await.is_none());
    assert_eq!(upstream.closes(), 0);
}

#[tokio::test]
async fn concurrent_close_completes_pending_next() {
    let (_tx, upstream) = channel::<BlockEventBatch>(1);
    let events = Arc::new(ChaincodeEventStream::new(upstream));

    let pending = {
        let events = Arc::clone(&events);
        tokio::spawn(async move { events.next().await.is_none() })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    events.close();

    let ended = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("pending next was not released by close")
        .unwrap();
    assert!(ended);
}

// ─── Defaults & errors ────────────────────────────────────────────────────────

#[tokio::test]
async fn absent_fields_take_defaults() {
    let upstream = Scripted::batches(vec![
        BlockEventBatch {
            block_number: None,
            events: Some(vec![RawEventRecord::default()]),
        },
        BlockEventBatch {
            block_number: Some(4),
            events: None,
        },
        BlockEventBatch::new(5, vec![rec("x", "t5", &[])]),
    ]);
    let events = collect(&ChaincodeEventStream::new(upstream)).await;

    assert_eq!(events.len(), 2);
    let first = &events[0];
    assert_eq!(first.block_number(), 0);
    assert_eq!(first.chaincode_name(), "");
    assert_eq!(first.event_name(), "");
    assert_eq!(first.transaction_id(), "");
    assert!(first.payload().is_empty());
    assert_eq!(events[1].block_number(), 5);
}

#[tokio::test]
async fn upstream_error_passes_through() {
    let upstream = Scripted::new(vec![
        Ok(BlockEventBatch::new(1, vec![rec("a", "t1", &[])])),
        Err(GatewayError::Transport("connection reset".into())),
        Ok(BlockEventBatch::new(2, vec![rec("b", "t2", &[])])),
    ]);
    let events = ChaincodeEventStream::new(upstream.clone());

    assert_eq!(events.next().await.unwrap().unwrap().event_name(), "a");
    match events.next().await {
        Some(Err(GatewayError::Transport(msg))) => assert_eq!(msg, "connection reset"),
        other => panic!("expected transport error, got {other:?}"),
    }
    // No retry and no teardown: the consumer decides what to do next.
    assert_eq!(upstream.closes(), 0);
    assert_eq!(events.next().await.unwrap().unwrap().event_name(), "b");
}
