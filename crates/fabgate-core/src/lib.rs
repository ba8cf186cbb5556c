//! fabgate-core — chaincode event streaming for a Fabric-style gateway client.
//!
//! # Architecture
//!
//! ```text
//! Network ── ChaincodeEventsRequest ── sign ──► GatewayClient
//!                                                   │
//!                                   CloseableStream<BlockEventBatch>
//!                                                   │
//!                                                   ▼
//!                                        ChaincodeEventStream
//!                                                   │
//!                                   CloseableStream<ChaincodeEvent>
//! ```
//!
//! - [`CloseableStream`] — async source that can be closed early
//! - [`ChaincodeEventStream`] — flattens block batches into ordered events
//! - [`ChaincodeEventsRequest`] — start position, bytes and digest for off-line signing
//! - [`Network`] — facade tying requests, signing and the gateway together
//! - [`MemoryGateway`] — in-process gateway for tests and replay tooling

pub mod channel;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod network;
pub mod request;
pub mod stream;
pub mod types;

pub use channel::{ChannelSender, ChannelStream};
pub use checkpoint::{Checkpoint, InMemoryCheckpointer};
pub use config::NetworkConfig;
pub use error::GatewayError;
pub use events::{ChaincodeEventStream, StreamMetrics};
pub use memory::MemoryGateway;
pub use network::{ChaincodeEvents, GatewayClient, Network, Signer};
pub use request::{
    ChaincodeEventsRequest, ChaincodeEventsRequestBuilder, SignedChaincodeEventsRequest,
    StartPosition,
};
pub use stream::{BoxCloseableStream, CloseableStream, CloseableStreamExt};
pub use types::{BlockEventBatch, ChaincodeEvent, RawEventRecord};
