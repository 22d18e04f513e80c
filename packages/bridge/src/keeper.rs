//! The ledger-side collaborators the bridge drives.

use dibc_bridge_types::Packet;
use thiserror::Error;

/// Read access to the ledger's current execution context.
pub trait ExecutionContext {
    /// Height of the block being executed.
    fn block_height(&self) -> u64;

    /// Whether the current transaction is only being simulated.
    ///
    /// Simulated transactions never reach the controller.
    fn is_simulation(&self) -> bool {
        false
    }
}

/// Failure reported by the keeper. The message is passed through unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct KeeperError {
    message: String,
}

impl KeeperError {
    /// Wrap a keeper failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The IBC keeper performing the authoritative channel and packet mutations.
///
/// The bridge does not duplicate any of the keeper's validation.
pub trait Keeper {
    /// Execution context the keeper operates in.
    type Context: ExecutionContext;
    /// Capability token handed over by the IBC module.
    type Capability;

    /// Record the acknowledgement for a received packet.
    ///
    /// # Errors
    /// Whatever the keeper rejects.
    fn packet_executed(
        &mut self,
        ctx: &mut Self::Context,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<(), KeeperError>;

    /// Start closing the channel `port_id/channel_id`.
    ///
    /// # Errors
    /// Whatever the keeper rejects.
    fn chan_close_init(
        &mut self,
        ctx: &mut Self::Context,
        port_id: &str,
        channel_id: &str,
    ) -> Result<(), KeeperError>;

    /// Next send sequence of `port_id/channel_id`, `None` if the channel is unknown.
    fn next_sequence_send(&self, ctx: &Self::Context, port_id: &str, channel_id: &str)
        -> Option<u64>;

    /// Commit and emit an outgoing packet.
    ///
    /// # Errors
    /// Whatever the keeper rejects.
    fn send_packet(&mut self, ctx: &mut Self::Context, packet: Packet) -> Result<(), KeeperError>;

    /// Take ownership of `capability` under `name`.
    ///
    /// # Errors
    /// Returns an error if the capability cannot be claimed.
    fn claim_capability(
        &mut self,
        ctx: &mut Self::Context,
        capability: &Self::Capability,
        name: &str,
    ) -> Result<(), KeeperError>;
}
