use dibc_bridge_types::MessageError;
use thiserror::Error;

use crate::{controller::ControllerError, keeper::KeeperError};

/// Errors surfaced by the bridge to the ledger or to the controller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The port request is not valid JSON of the expected shape.
    #[error("failed to parse channel message: {0}")]
    Parse(#[source] serde_json::Error),

    /// The port request named a method we do not serve.
    #[error("unrecognized method {0}")]
    UnrecognizedMethod(String),

    /// `ack` arrived while no packet was awaiting acknowledgement.
    #[error("current packet is already acknowledged")]
    NoPendingPacket,

    /// A packet arrived while another one still awaits acknowledgement.
    #[error("packet {sequence} is still awaiting acknowledgement")]
    PacketAlreadyPending {
        /// Sequence of the packet occupying the slot.
        sequence: u64,
    },

    /// The keeper has no send sequence for the channel.
    #[error("unknown sequence number for {port}/{channel}")]
    UnknownSequence {
        /// Destination port of the request.
        port: String,
        /// Destination channel of the request.
        channel: String,
    },

    /// `block height + packet timeout` does not fit in a height.
    #[error("packet timeout overflows block height {height}")]
    TimeoutOverflow {
        /// Current block height.
        height: u64,
    },

    /// No handler is registered under the requested port name.
    #[error("no handler registered for port {0}")]
    UnknownPort(String),

    /// A handler is already registered under this port name.
    #[error("port {0} already has a handler")]
    PortAlreadyRegistered(String),

    /// The channel capability handed over by the IBC module could not be claimed.
    #[error("channel capability not found: {0}")]
    ChannelCapabilityNotFound(#[source] KeeperError),

    /// The keeper refused the operation.
    #[error(transparent)]
    Keeper(#[from] KeeperError),

    /// The controller call failed.
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// The event could not be rendered for the controller.
    #[error("failed to encode controller event: {0}")]
    EventEncoding(#[source] serde_json::Error),
}

impl From<MessageError> for BridgeError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Json(err) => Self::Parse(err),
            MessageError::UnrecognizedMethod(method) => Self::UnrecognizedMethod(method),
        }
    }
}
