//! The packet handed to the ledger's IBC keeper.

use ibc_proto::ibc::core::{channel::v1::Packet as RawPacket, client::v1::Height as RawHeight};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelEndpoint;

/// An IBC packet.
///
/// Heights are plain block heights of revision 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Send sequence on the source channel.
    #[serde(with = "dibc_utils::serde::number_as_string")]
    pub sequence: u64,
    /// Sending end.
    pub source: ChannelEndpoint,
    /// Receiving end.
    pub destination: ChannelEndpoint,
    /// Opaque payload.
    #[serde(rename = "data64", with = "dibc_utils::serde::base64_bytes")]
    pub data: Vec<u8>,
    /// Block height after which the packet times out.
    #[serde(with = "dibc_utils::serde::number_as_string")]
    pub timeout_height: u64,
    /// Timestamp (ns) after which the packet times out, 0 if unused.
    #[serde(with = "dibc_utils::serde::number_as_string", default)]
    pub timeout_timestamp: u64,
}

impl Packet {
    /// Build a packet that times out by height only.
    #[must_use]
    pub const fn new(
        data: Vec<u8>,
        sequence: u64,
        source: ChannelEndpoint,
        destination: ChannelEndpoint,
        timeout_height: u64,
    ) -> Self {
        Self {
            sequence,
            source,
            destination,
            data,
            timeout_height,
            timeout_timestamp: 0,
        }
    }
}

impl From<Packet> for RawPacket {
    fn from(packet: Packet) -> Self {
        Self {
            sequence: packet.sequence,
            source_port: packet.source.port,
            source_channel: packet.source.channel,
            destination_port: packet.destination.port,
            destination_channel: packet.destination.channel,
            data: packet.data,
            timeout_height: Some(RawHeight {
                revision_number: 0,
                revision_height: packet.timeout_height,
            }),
            timeout_timestamp: packet.timeout_timestamp,
        }
    }
}

impl From<RawPacket> for Packet {
    fn from(raw: RawPacket) -> Self {
        Self {
            sequence: raw.sequence,
            source: ChannelEndpoint::new(raw.source_port, raw.source_channel),
            destination: ChannelEndpoint::new(raw.destination_port, raw.destination_channel),
            data: raw.data,
            timeout_height: raw.timeout_height.map_or(0, |h| h.revision_height),
            timeout_timestamp: raw.timeout_timestamp,
        }
    }
}

/// Name under which the capability for a channel is claimed.
#[must_use]
pub fn channel_capability_path(port_id: &str, channel_id: &str) -> String {
    format!("capabilities/ports/{port_id}/channels/{channel_id}")
}
