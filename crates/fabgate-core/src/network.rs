//! The `Network` facade and its external collaborators.
//!
//! A [`Network`] represents one channel. It builds chaincode events
//! requests, gets them signed, hands them to a [`GatewayClient`] and wraps
//! the returned batch stream in a [`ChaincodeEventStream`].
//!
//! # Chaincode events example
//!
//! ```rust,no_run
//! # use fabgate_core::{CloseableStream, GatewayError, Network};
//! # async fn run(network: Network) -> Result<(), GatewayError> {
//! let events = network.chaincode_events("basic").await?;
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     println!("{} {}", event.block_number(), event.event_name());
//! }
//! events.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Replay example
//!
//! ```rust,no_run
//! # use fabgate_core::{CloseableStream, GatewayError, Network};
//! # async fn run(network: Network) -> Result<(), GatewayError> {
//! let request = network.new_chaincode_events_request("basic")?.start_block(101).build();
//! let events = network.get_events(request).await?;
//! # events.close();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NetworkConfig;
use crate::error::GatewayError;
use crate::events::ChaincodeEventStream;
use crate::request::{
    ChaincodeEventsRequest, ChaincodeEventsRequestBuilder, SignedChaincodeEventsRequest,
};
use crate::stream::BoxCloseableStream;
use crate::types::BlockEventBatch;

/// The stream type returned by [`Network`].
pub type ChaincodeEvents = ChaincodeEventStream<BoxCloseableStream<BlockEventBatch>>;

/// Connection to the gateway service that serves chaincode events.
///
/// Implementations negotiate the start position, authenticate the signed
/// request and own any transport-level retries.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Open a stream of block event batches for `request`.
    async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<BoxCloseableStream<BlockEventBatch>, GatewayError>;
}

/// Produces digital signatures over request digests.
pub trait Signer: Send + Sync {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, GatewayError>;
}

/// A channel on the ledger network.
pub struct Network {
    name: String,
    client: Arc<dyn GatewayClient>,
    signer: Option<Arc<dyn Signer>>,
}

impl Network {
    pub fn new(name: impl Into<String>, client: Arc<dyn GatewayClient>) -> Self {
        Self {
            name: name.into(),
            client,
            signer: None,
        }
    }

    pub fn from_config(config: &NetworkConfig, client: Arc<dyn GatewayClient>) -> Self {
        Self::new(config.channel.clone(), client)
    }

    /// Sign requests with `signer`. Without one, only pre-signed requests
    /// can be submitted.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events of `chaincode_name` starting from the next committed block.
    pub async fn chaincode_events(
        &self,
        chaincode_name: &str,
    ) -> Result<ChaincodeEvents, GatewayError> {
        let request = self.new_chaincode_events_request(chaincode_name)?.build();
        self.get_events(request).await
    }

    /// Start building a request, e.g. to replay from a given block.
    pub fn new_chaincode_events_request(
        &self,
        chaincode_name: &str,
    ) -> Result<ChaincodeEventsRequestBuilder, GatewayError> {
        if chaincode_name.is_empty() {
            return Err(GatewayError::InvalidArgument {
                reason: "chaincode name must not be empty".into(),
            });
        }
        Ok(ChaincodeEventsRequestBuilder::new(&self.name, chaincode_name))
    }

    /// Reassemble a request that was serialized and signed off-line.
    pub fn new_signed_chaincode_events_request(
        &self,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<SignedChaincodeEventsRequest, GatewayError> {
        let request = ChaincodeEventsRequest::from_bytes(bytes)?;
        if request.channel() != self.name {
            return Err(GatewayError::InvalidRequest {
                reason: format!(
                    "request is for channel '{}', not '{}'",
                    request.channel(),
                    self.name
                ),
            });
        }
        Ok(SignedChaincodeEventsRequest::new(request, signature))
    }

    /// Sign `request` with the configured signer.
    pub fn sign(
        &self,
        request: ChaincodeEventsRequest,
    ) -> Result<SignedChaincodeEventsRequest, GatewayError> {
        let signer = self.signer.as_ref().ok_or(GatewayError::Unsigned)?;
        let signature = signer.sign(&request.digest()?)?;
        Ok(SignedChaincodeEventsRequest::new(request, signature))
    }

    /// Sign and submit `request`.
    pub async fn get_events(
        &self,
        request: ChaincodeEventsRequest,
    ) -> Result<ChaincodeEvents, GatewayError> {
        let signed = self.sign(request)?;
        self.get_signed_events(signed).await
    }

    /// Submit an already signed request.
    pub async fn get_signed_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<ChaincodeEvents, GatewayError> {
        tracing::debug!(
            channel = %self.name,
            chaincode = %request.request().chaincode(),
            start = ?request.request().start(),
            "opening chaincode event stream"
        );
        let upstream = self.client.chaincode_events(request).await?;
        Ok(ChaincodeEventStream::new(upstream))
    }
}
