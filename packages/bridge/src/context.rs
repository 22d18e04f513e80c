//! Per-session state shared by both call directions.

use dibc_bridge_types::Packet;

use crate::{error::BridgeError, keeper::Keeper};

/// State of one bridging session.
///
/// Holds the ledger's execution context, the keeper and a single slot for
/// the received packet awaiting the controller's acknowledgement. The slot is
/// not a queue: a second packet cannot be received while one is pending.
pub struct BridgeContext<'a, K: Keeper> {
    execution: &'a mut K::Context,
    keeper: &'a mut K,
    current_packet: Option<Packet>,
}

impl<'a, K: Keeper> BridgeContext<'a, K> {
    /// Open a session over `execution` and `keeper` with an empty packet slot.
    pub fn new(execution: &'a mut K::Context, keeper: &'a mut K) -> Self {
        Self {
            execution,
            keeper,
            current_packet: None,
        }
    }

    /// The ledger's execution context.
    pub fn execution_context(&self) -> &K::Context {
        &*self.execution
    }

    /// Mutable access to the ledger's execution context, e.g. to move to the next block.
    pub fn execution_context_mut(&mut self) -> &mut K::Context {
        &mut *self.execution
    }

    /// The keeper.
    pub fn keeper(&self) -> &K {
        &*self.keeper
    }

    /// Mutable access to the keeper, e.g. to seed ledger state.
    pub fn keeper_mut(&mut self) -> &mut K {
        &mut *self.keeper
    }

    /// The packet awaiting acknowledgement, if any.
    pub const fn current_packet(&self) -> Option<&Packet> {
        self.current_packet.as_ref()
    }

    /// Occupy the packet slot.
    ///
    /// # Errors
    /// Returns [`BridgeError::PacketAlreadyPending`] if the slot is occupied.
    pub(crate) fn begin_packet(&mut self, packet: Packet) -> Result<(), BridgeError> {
        if let Some(pending) = &self.current_packet {
            return Err(BridgeError::PacketAlreadyPending {
                sequence: pending.sequence,
            });
        }
        self.current_packet = Some(packet);
        Ok(())
    }

    /// Empty the packet slot, returning what it held.
    pub(crate) fn take_current_packet(&mut self) -> Option<Packet> {
        self.current_packet.take()
    }

    /// Borrow the execution context and the keeper together.
    pub(crate) fn split(&mut self) -> (&mut K::Context, &mut K) {
        (&mut *self.execution, &mut *self.keeper)
    }
}

impl<K: Keeper> core::fmt::Debug for BridgeContext<'_, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("current_packet", &self.current_packet)
            .finish_non_exhaustive()
    }
}
