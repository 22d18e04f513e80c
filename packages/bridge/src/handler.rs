//! The `dibc` port: channel operations requested by the controller.

use dibc_bridge_types::{ChannelMessage, Method, Packet};

use crate::{
    config::DEFAULT_PACKET_TIMEOUT,
    context::BridgeContext,
    error::BridgeError,
    keeper::{ExecutionContext, Keeper},
    ports::PortHandler,
};

/// Response returned by every successful channel request.
pub const SUCCESS_RESPONSE: &str = "true";

/// Serves `ack`, `close` and `send` requests against the keeper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelHandler {
    packet_timeout: u64,
}

impl ChannelHandler {
    /// A handler whose outgoing packets time out `packet_timeout` blocks after sending.
    #[must_use]
    pub const fn new(packet_timeout: u64) -> Self {
        Self { packet_timeout }
    }

    /// Number of blocks after which outgoing packets time out.
    #[must_use]
    pub const fn packet_timeout(&self) -> u64 {
        self.packet_timeout
    }

    /// Acknowledge the pending packet with the request payload.
    ///
    /// The slot is emptied before the keeper runs, so a failed
    /// acknowledgement still frees it.
    fn ack<K: Keeper>(
        ctx: &mut BridgeContext<'_, K>,
        message: &ChannelMessage,
    ) -> Result<String, BridgeError> {
        let packet = ctx
            .take_current_packet()
            .ok_or(BridgeError::NoPendingPacket)?;
        let acknowledgement = message.data();

        tracing::debug!(
            sequence = packet.sequence,
            ack_len = acknowledgement.len(),
            "acknowledging packet"
        );
        let (execution, keeper) = ctx.split();
        keeper.packet_executed(execution, &packet, &acknowledgement)?;
        Ok(SUCCESS_RESPONSE.to_string())
    }

    fn close<K: Keeper>(
        ctx: &mut BridgeContext<'_, K>,
        message: &ChannelMessage,
    ) -> Result<String, BridgeError> {
        let destination = &message.tuple.destination;
        tracing::debug!(channel = %destination, "closing channel");

        let (execution, keeper) = ctx.split();
        keeper.chan_close_init(execution, &destination.port, &destination.channel)?;
        Ok(SUCCESS_RESPONSE.to_string())
    }

    fn send<K: Keeper>(
        &self,
        ctx: &mut BridgeContext<'_, K>,
        message: &ChannelMessage,
    ) -> Result<String, BridgeError> {
        let tuple = &message.tuple;
        let (execution, keeper) = ctx.split();

        let sequence = keeper
            .next_sequence_send(execution, &tuple.destination.port, &tuple.destination.channel)
            .ok_or_else(|| BridgeError::UnknownSequence {
                port: tuple.destination.port.clone(),
                channel: tuple.destination.channel.clone(),
            })?;

        let height = execution.block_height();
        let timeout_height = height
            .checked_add(self.packet_timeout)
            .ok_or(BridgeError::TimeoutOverflow { height })?;

        let packet = Packet::new(
            message.data(),
            sequence,
            tuple.source.clone(),
            tuple.destination.clone(),
            timeout_height,
        );
        tracing::debug!(
            sequence,
            timeout_height,
            source = %tuple.source,
            destination = %tuple.destination,
            "sending packet"
        );
        keeper.send_packet(execution, packet)?;
        Ok(SUCCESS_RESPONSE.to_string())
    }
}

impl Default for ChannelHandler {
    fn default() -> Self {
        Self::new(DEFAULT_PACKET_TIMEOUT)
    }
}

impl<K: Keeper> PortHandler<K> for ChannelHandler {
    fn receive(&self, ctx: &mut BridgeContext<'_, K>, request: &str) -> Result<String, BridgeError> {
        tracing::debug!(request, "channel handler received");

        let message = ChannelMessage::from_json(request)?;
        match message.method {
            Method::Ack => Self::ack(ctx, &message),
            Method::Close => Self::close(ctx, &message),
            Method::Send => self.send(ctx, &message),
        }
    }
}
