//! Network configuration.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Configuration for a [`Network`](crate::Network) and the streams it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Channel (network) name, e.g. `"mychannel"`.
    pub channel: String,
    /// Buffered batches per event stream before the producer waits.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channel: "mychannel".into(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl NetworkConfig {
    /// Config for `channel` with default settings.
    pub fn for_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    /// Parse from JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GatewayError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = NetworkConfig::from_json(br#"{"channel":"assets"}"#).unwrap();
        assert_eq!(cfg.channel, "assets");
        assert_eq!(cfg.channel_capacity, 64);
    }

    #[test]
    fn missing_channel_is_error() {
        assert!(NetworkConfig::from_json(b"{}").is_err());
    }
}
