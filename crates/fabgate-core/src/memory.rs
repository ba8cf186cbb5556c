//! In-process gateway serving chaincode events from a ledger held in memory.
//!
//! Used by tests and by the `fabgate replay` command. Each request gets its
//! own producer task feeding a [`ChannelStream`](crate::ChannelStream); the
//! task stops as soon as the consumer closes the stream.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::channel::{channel, ChannelSender};
use crate::config::NetworkConfig;
use crate::error::GatewayError;
use crate::network::GatewayClient;
use crate::request::{ChaincodeEventsRequest, SignedChaincodeEventsRequest, StartPosition};
use crate::stream::BoxCloseableStream;
use crate::types::BlockEventBatch;

#[derive(Default)]
struct LedgerState {
    batches: Vec<BlockEventBatch>,
    /// No more blocks will be committed; streams end once drained.
    finished: bool,
}

#[derive(Default)]
struct Ledger {
    state: Mutex<LedgerState>,
    appended: Notify,
}

impl Ledger {
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A [`GatewayClient`] over an in-memory ledger of block event batches.
pub struct MemoryGateway {
    ledger: Arc<Ledger>,
    capacity: usize,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// An empty, live ledger.
    pub fn new() -> Self {
        Self::with_config(&NetworkConfig::default())
    }

    /// An empty ledger whose streams buffer `config.channel_capacity` batches.
    pub fn with_config(config: &NetworkConfig) -> Self {
        Self {
            ledger: Arc::new(Ledger::default()),
            capacity: config.channel_capacity,
        }
    }

    /// A ledger pre-populated with `batches`, which must be in strictly
    /// increasing block order.
    pub fn from_batches(
        batches: impl IntoIterator<Item = BlockEventBatch>,
    ) -> Result<Self, GatewayError> {
        let gateway = Self::new();
        for batch in batches {
            gateway.push(batch)?;
        }
        Ok(gateway)
    }

    /// Commit a new block. Open streams pick it up immediately.
    pub fn push(&self, batch: BlockEventBatch) -> Result<(), GatewayError> {
        let mut state = self.ledger.lock();
        if state.finished {
            return Err(GatewayError::Closed);
        }
        if let Some(last) = state.batches.last() {
            if batch.block_number() <= last.block_number() {
                return Err(GatewayError::InvalidArgument {
                    reason: format!(
                        "block {} does not follow block {}",
                        batch.block_number(),
                        last.block_number()
                    ),
                });
            }
        }
        state.batches.push(batch);
        drop(state);
        self.ledger.appended.notify_waiters();
        Ok(())
    }

    /// Stop committing blocks. Streams end after the last stored block.
    pub fn finish(&self) {
        self.ledger.lock().finished = true;
        self.ledger.appended.notify_waiters();
    }

    /// Number of committed blocks.
    pub fn len(&self) -> usize {
        self.ledger.lock().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl GatewayClient for MemoryGateway {
    async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<BoxCloseableStream<BlockEventBatch>, GatewayError> {
        let (request, _signature) = request.into_parts();
        let start_index = {
            let state = self.ledger.lock();
            match request.start() {
                StartPosition::NextCommit => state.batches.len(),
                StartPosition::Block(n) => state
                    .batches
                    .iter()
                    .position(|b| b.block_number() >= n)
                    .unwrap_or(state.batches.len()),
            }
        };
        let (tx, stream) = channel(self.capacity);
        let ledger = Arc::clone(&self.ledger);
        tokio::spawn(async move {
            serve(ledger, request, start_index, tx).await;
        });
        Ok(Box::new(stream))
    }
}

/// Producer loop for one request.
async fn serve(
    ledger: Arc<Ledger>,
    request: ChaincodeEventsRequest,
    mut index: usize,
    tx: ChannelSender<BlockEventBatch>,
) {
    let mut skip_through = request.after_transaction_id().map(str::to_owned);

    loop {
        let appended = ledger.appended.notified();
        tokio::pin!(appended);
        appended.as_mut().enable();

        let (next, finished) = {
            let state = ledger.lock();
            (state.batches.get(index).cloned(), state.finished)
        };

        let Some(batch) = next else {
            if finished {
                tracing::debug!(chaincode = request.chaincode(), "ledger drained");
                return;
            }
            tokio::select! {
                _ = appended => {}
                _ = tx.closed() => return,
            }
            continue;
        };
        index += 1;

        let skip = skip_through.take().filter(|_| {
            request.start() == StartPosition::Block(batch.block_number())
        });
        let batch = select_events(batch, request.chaincode(), skip.as_deref());
        if batch.is_empty() {
            continue;
        }

        if tx.send(Ok(batch)).await.is_err() {
            tracing::debug!(chaincode = request.chaincode(), "event stream closed by consumer");
            return;
        }
    }
}

/// Keep the records of `chaincode`, dropping everything up to and including
/// the last record of transaction `skip_through`.
fn select_events(
    batch: BlockEventBatch,
    chaincode: &str,
    skip_through: Option<&str>,
) -> BlockEventBatch {
    let block_number = batch.block_number;
    let mut events = batch.into_events();

    if let Some(tx_id) = skip_through {
        if let Some(pos) = events
            .iter()
            .rposition(|e| e.tx_id.as_deref() == Some(tx_id))
        {
            events.drain(..=pos);
        }
    }

    events.retain(|e| e.chaincode_id.as_deref().unwrap_or_default() == chaincode);
    BlockEventBatch {
        block_number,
        events: Some(events),
    }
}
