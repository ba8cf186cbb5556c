//! Chaincode events requests.
//!
//! A request names the channel, the chaincode and the ledger position to
//! start reading from. Its serialized [`bytes`](ChaincodeEventsRequest::bytes)
//! and SHA-256 [`digest`](ChaincodeEventsRequest::digest) support off-line
//! signing: the digest is signed elsewhere and the signature reattached with
//! [`Network::new_signed_chaincode_events_request`](crate::Network::new_signed_chaincode_events_request).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::checkpoint::Checkpoint;
use crate::error::GatewayError;

/// Where in the ledger an event stream begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "blockNumber", rename_all = "camelCase")]
pub enum StartPosition {
    /// The next block committed after the request is received.
    #[default]
    NextCommit,
    /// A specific block, which may already be committed (replay).
    Block(u64),
}

// ─── ChaincodeEventsRequest ──────────────────────────────────────────────────

/// An unsigned request for the events of one chaincode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaincodeEventsRequest {
    channel: String,
    chaincode: String,
    #[serde(default)]
    start: StartPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after_transaction_id: Option<String>,
}

impl ChaincodeEventsRequest {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn chaincode(&self) -> &str {
        &self.chaincode
    }

    pub fn start(&self) -> StartPosition {
        self.start
    }

    /// Events of the start block up to and including this transaction are skipped.
    pub fn after_transaction_id(&self) -> Option<&str> {
        self.after_transaction_id.as_deref()
    }

    /// Canonical serialized form.
    pub fn bytes(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// SHA-256 of [`bytes`](Self::bytes); this is what a signer signs.
    pub fn digest(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(Sha256::digest(self.bytes()?).to_vec())
    }

    /// Parse serialized request bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GatewayError> {
        let request: Self =
            serde_json::from_slice(bytes).map_err(|e| GatewayError::InvalidRequest {
                reason: e.to_string(),
            })?;
        if request.chaincode.is_empty() {
            return Err(GatewayError::InvalidRequest {
                reason: "missing chaincode name".into(),
            });
        }
        Ok(request)
    }
}

// ─── SignedChaincodeEventsRequest ────────────────────────────────────────────

/// A request together with the signature over its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedChaincodeEventsRequest {
    request: ChaincodeEventsRequest,
    signature: Vec<u8>,
}

impl SignedChaincodeEventsRequest {
    pub fn new(request: ChaincodeEventsRequest, signature: Vec<u8>) -> Self {
        Self { request, signature }
    }

    pub fn request(&self) -> &ChaincodeEventsRequest {
        &self.request
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn into_parts(self) -> (ChaincodeEventsRequest, Vec<u8>) {
        (self.request, self.signature)
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

/// Fluent builder for [`ChaincodeEventsRequest`].
///
/// # Example
///
/// ```rust
/// use fabgate_core::{ChaincodeEventsRequestBuilder, StartPosition};
///
/// let request = ChaincodeEventsRequestBuilder::new("mychannel", "basic")
///     .start_block(101)
///     .build();
/// assert_eq!(request.start(), StartPosition::Block(101));
/// ```
#[derive(Debug, Clone)]
pub struct ChaincodeEventsRequestBuilder {
    request: ChaincodeEventsRequest,
}

impl ChaincodeEventsRequestBuilder {
    pub fn new(channel: impl Into<String>, chaincode: impl Into<String>) -> Self {
        Self {
            request: ChaincodeEventsRequest {
                channel: channel.into(),
                chaincode: chaincode.into(),
                start: StartPosition::NextCommit,
                after_transaction_id: None,
            },
        }
    }

    /// Start reading at `block_number`.
    pub fn start_block(mut self, block_number: u64) -> Self {
        self.request.start = StartPosition::Block(block_number);
        self
    }

    /// Resume after the position recorded in `checkpoint`.
    ///
    /// An empty checkpoint leaves the start position unchanged.
    pub fn checkpoint(mut self, checkpoint: &dyn Checkpoint) -> Self {
        if let Some(block_number) = checkpoint.block_number() {
            self.request.start = StartPosition::Block(block_number);
            self.request.after_transaction_id = checkpoint.transaction_id();
        }
        self
    }

    pub fn build(self) -> ChaincodeEventsRequest {
        self.request
    }
}
