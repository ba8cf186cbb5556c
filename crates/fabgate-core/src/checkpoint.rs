//! Checkpointing — remembers the last processed ledger position so an event
//! stream can be resumed just after the last event the application handled.
//!
//! Only an in-memory checkpointer is provided; durable storage is up to the
//! application, which can implement [`Checkpoint`] over its own store.

use std::sync::{Mutex, PoisonError};

use crate::types::ChaincodeEvent;

/// A ledger position to resume from.
pub trait Checkpoint: Send + Sync {
    /// Block at which to resume, `None` if nothing has been checkpointed.
    fn block_number(&self) -> Option<u64>;

    /// Last processed transaction within [`block_number`](Self::block_number).
    fn transaction_id(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct Position {
    block_number: Option<u64>,
    transaction_id: Option<String>,
}

/// Checkpoint held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    position: Mutex<Position>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that every event in `block_number` has been processed.
    /// Resumption starts at the following block.
    pub fn checkpoint_block(&self, block_number: u64) {
        self.set(Position {
            block_number: Some(block_number.saturating_add(1)),
            transaction_id: None,
        });
    }

    /// Record that events up to and including `transaction_id` in
    /// `block_number` have been processed.
    pub fn checkpoint_transaction(&self, block_number: u64, transaction_id: impl Into<String>) {
        self.set(Position {
            block_number: Some(block_number),
            transaction_id: Some(transaction_id.into()),
        });
    }

    /// Record that `event` has been processed.
    pub fn checkpoint_chaincode_event(&self, event: &ChaincodeEvent) {
        self.checkpoint_transaction(event.block_number(), event.transaction_id());
    }

    fn set(&self, position: Position) {
        tracing::trace!(
            block = ?position.block_number,
            tx = ?position.transaction_id,
            "checkpoint updated"
        );
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }
}

impl Checkpoint for InMemoryCheckpointer {
    fn block_number(&self) -> Option<u64> {
        self.position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .block_number
    }

    fn transaction_id(&self) -> Option<String> {
        self.position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transaction_id
            .clone()
    }
}
