//! Bridge configuration.

use serde::{Deserialize, Serialize};

/// Port name the channel handler is registered under.
pub const DEFAULT_PORT: &str = "dibc";

/// Blocks after which a packet sent by the controller times out.
pub const DEFAULT_PACKET_TIMEOUT: u64 = 1000;

/// Configuration of the bridge.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Name of the port serving channel requests.
    #[serde(default = "default_port")]
    pub port: String,
    /// Timeout, in blocks, of packets sent through the port.
    #[serde(default = "default_packet_timeout")]
    pub packet_timeout: u64,
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

const fn default_packet_timeout() -> u64 {
    DEFAULT_PACKET_TIMEOUT
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            packet_timeout: default_packet_timeout(),
        }
    }
}
