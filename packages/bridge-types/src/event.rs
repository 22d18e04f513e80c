//! Lifecycle notifications delivered to the controller.

use serde::{Deserialize, Serialize};

use crate::{
    channel::{ChannelEndpoint, Order},
    packet::Packet,
};

/// Description of an IBC channel or packet lifecycle event.
///
/// On the wire this is a JSON object whose `type` field names the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
#[allow(missing_docs)]
pub enum ControllerEvent {
    /// A channel opening handshake was started on this chain.
    ChannelOpenInit {
        order: Order,
        connection_hops: Vec<String>,
        port_id: String,
        channel_id: String,
        counterparty: ChannelEndpoint,
        version: String,
    },
    /// The counterparty started a handshake that reached this chain.
    ChannelOpenTry {
        order: Order,
        connection_hops: Vec<String>,
        port_id: String,
        channel_id: String,
        counterparty: ChannelEndpoint,
        version: String,
        counterparty_version: String,
    },
    /// The counterparty accepted our handshake.
    ChannelOpenAck {
        port_id: String,
        channel_id: String,
        counterparty_version: String,
    },
    /// The handshake completed on this chain.
    ChannelOpenConfirm { port_id: String, channel_id: String },
    /// Closing of the channel was started.
    ChannelCloseInit { port_id: String, channel_id: String },
    /// The counterparty confirmed the channel closed.
    ChannelCloseConfirm { port_id: String, channel_id: String },
    /// A packet arrived and awaits the controller's acknowledgement.
    PacketReceived { packet: Packet },
    /// A packet we sent was acknowledged by the counterparty.
    PacketAcknowledged {
        packet: Packet,
        #[serde(with = "dibc_utils::serde::base64_bytes")]
        acknowledgement: Vec<u8>,
    },
    /// A packet we sent timed out.
    PacketTimedOut { packet: Packet },
}

impl ControllerEvent {
    /// The `type` tag carried on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChannelOpenInit { .. } => "channel-open-init",
            Self::ChannelOpenTry { .. } => "channel-open-try",
            Self::ChannelOpenAck { .. } => "channel-open-ack",
            Self::ChannelOpenConfirm { .. } => "channel-open-confirm",
            Self::ChannelCloseInit { .. } => "channel-close-init",
            Self::ChannelCloseConfirm { .. } => "channel-close-confirm",
            Self::PacketReceived { .. } => "packet-received",
            Self::PacketAcknowledged { .. } => "packet-acknowledged",
            Self::PacketTimedOut { .. } => "packet-timed-out",
        }
    }

    /// Render the event as the message text sent to the controller.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
