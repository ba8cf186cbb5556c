//! Wire messages from the gateway and the decoded chaincode event.
//!
//! Wire messages are loosely typed: every field may be absent. Absent
//! fields are not errors; they resolve to the defaults documented on each
//! accessor when the message is decoded.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

// ─── BlockEventBatch ─────────────────────────────────────────────────────────

/// All chaincode events of interest committed in one block.
///
/// A gateway emits batches in strictly increasing block order per stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEventBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<RawEventRecord>>,
}

impl BlockEventBatch {
    /// Create a fully populated batch.
    pub fn new(block_number: u64, events: Vec<RawEventRecord>) -> Self {
        Self {
            block_number: Some(block_number),
            events: Some(events),
        }
    }

    /// Parse a batch from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GatewayError> {
        serde_json::from_slice(bytes).map_err(|e| GatewayError::Decode {
            reason: format!("block event batch: {e}"),
        })
    }

    /// Block number, `0` when absent.
    pub fn block_number(&self) -> u64 {
        self.block_number.unwrap_or(0)
    }

    /// Number of records, `0` when the event list is absent.
    pub fn len(&self) -> usize {
        self.events.as_ref().map_or(0, Vec::len)
    }

    /// Returns `true` if the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the records, an empty list when absent.
    pub fn into_events(self) -> Vec<RawEventRecord> {
        self.events.unwrap_or_default()
    }
}

// ─── RawEventRecord ──────────────────────────────────────────────────────────

/// One chaincode event as carried on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaincode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Hex-encoded on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_payload")]
    pub payload: Option<Vec<u8>>,
}

impl RawEventRecord {
    /// Create a fully populated record.
    pub fn new(
        chaincode_id: impl Into<String>,
        event_name: impl Into<String>,
        tx_id: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            chaincode_id: Some(chaincode_id.into()),
            event_name: Some(event_name.into()),
            tx_id: Some(tx_id.into()),
            payload: Some(payload.into()),
        }
    }

    /// Decode into a [`ChaincodeEvent`] tagged with `block_number`.
    ///
    /// Absent chaincode id, event name and transaction id become empty
    /// strings; an absent payload becomes an empty byte vector.
    pub fn decode(self, block_number: u64) -> ChaincodeEvent {
        ChaincodeEvent {
            block_number,
            transaction_id: self.tx_id.unwrap_or_default(),
            chaincode_name: self.chaincode_id.unwrap_or_default(),
            event_name: self.event_name.unwrap_or_default(),
            payload: self.payload.unwrap_or_default(),
        }
    }
}

mod hex_payload {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let Some(text) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let text = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(text).map(Some).map_err(D::Error::custom)
    }
}

// ─── ChaincodeEvent ──────────────────────────────────────────────────────────

/// An event emitted by a chaincode transaction function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaincodeEvent {
    block_number: u64,
    transaction_id: String,
    chaincode_name: String,
    event_name: String,
    #[serde(serialize_with = "serialize_hex")]
    payload: Vec<u8>,
}

fn serialize_hex<S, T>(bytes: &T, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: AsRef<[u8]>,
{
    s.serialize_str(&hex::encode(bytes))
}

impl ChaincodeEvent {
    /// Block in which the emitting transaction was committed.
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Transaction that emitted the event.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn chaincode_name(&self) -> &str {
        &self.chaincode_name
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Application-defined payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
