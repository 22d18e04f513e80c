//! The in-memory ledger a replay runs against.

use std::collections::BTreeMap;

use dibc_bridge::{ExecutionContext, Keeper, KeeperError};
use dibc_bridge_types::{ChannelEndpoint, Packet};

/// Block being replayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Current block height.
    pub height: u64,
    /// Whether the block's transactions are simulated.
    pub simulation: bool,
}

impl ExecutionContext for BlockContext {
    fn block_height(&self) -> u64 {
        self.height
    }

    fn is_simulation(&self) -> bool {
        self.simulation
    }
}

/// Channels, capabilities and packets of the replayed ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    next_sequence_send: BTreeMap<ChannelEndpoint, u64>,
    capabilities: BTreeMap<String, String>,
    sent: Vec<Packet>,
    executed: Vec<(Packet, Vec<u8>)>,
    closed: Vec<ChannelEndpoint>,
}

impl MemoryLedger {
    /// Open `port/channel` with `next_sequence` as its next send sequence.
    pub fn open_channel(&mut self, port: &str, channel: &str, next_sequence: u64) {
        self.next_sequence_send
            .insert(ChannelEndpoint::new(port, channel), next_sequence);
    }

    /// Packets committed by `send_packet`, in order.
    #[must_use]
    pub fn sent_packets(&self) -> &[Packet] {
        &self.sent
    }

    /// Received packets acknowledged so far, with their acknowledgements.
    #[must_use]
    pub fn executed_packets(&self) -> &[(Packet, Vec<u8>)] {
        &self.executed
    }

    /// Channels whose closing was started.
    #[must_use]
    pub fn closed_channels(&self) -> &[ChannelEndpoint] {
        &self.closed
    }

    fn channel(&self, port_id: &str, channel_id: &str) -> Result<ChannelEndpoint, KeeperError> {
        let endpoint = ChannelEndpoint::new(port_id, channel_id);
        if self.next_sequence_send.contains_key(&endpoint) {
            Ok(endpoint)
        } else {
            Err(KeeperError::new(format!("channel {endpoint} not found")))
        }
    }
}

impl Keeper for MemoryLedger {
    type Context = BlockContext;
    type Capability = String;

    fn packet_executed(
        &mut self,
        _ctx: &mut BlockContext,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<(), KeeperError> {
        if self.executed.iter().any(|(done, _)| done == packet) {
            return Err(KeeperError::new(format!(
                "acknowledgement for packet {} already written",
                packet.sequence
            )));
        }
        self.executed.push((packet.clone(), acknowledgement.to_vec()));
        Ok(())
    }

    fn chan_close_init(
        &mut self,
        _ctx: &mut BlockContext,
        port_id: &str,
        channel_id: &str,
    ) -> Result<(), KeeperError> {
        let endpoint = self.channel(port_id, channel_id)?;
        if self.closed.contains(&endpoint) {
            return Err(KeeperError::new(format!("channel {endpoint} is already closing")));
        }
        self.closed.push(endpoint);
        Ok(())
    }

    fn next_sequence_send(
        &self,
        _ctx: &BlockContext,
        port_id: &str,
        channel_id: &str,
    ) -> Option<u64> {
        self.next_sequence_send
            .get(&ChannelEndpoint::new(port_id, channel_id))
            .copied()
    }

    fn send_packet(&mut self, _ctx: &mut BlockContext, packet: Packet) -> Result<(), KeeperError> {
        let destination = self.channel(&packet.destination.port, &packet.destination.channel)?;
        if self.closed.contains(&destination) {
            return Err(KeeperError::new(format!("channel {destination} is closing")));
        }
        if let Some(sequence) = self.next_sequence_send.get_mut(&destination) {
            *sequence += 1;
        }
        self.sent.push(packet);
        Ok(())
    }

    fn claim_capability(
        &mut self,
        _ctx: &mut BlockContext,
        capability: &String,
        name: &str,
    ) -> Result<(), KeeperError> {
        match self.capabilities.get(name) {
            Some(owner) if owner != capability => Err(KeeperError::new(format!(
                "capability {name} is already claimed"
            ))),
            _ => {
                self.capabilities.insert(name.to_string(), capability.clone());
                Ok(())
            }
        }
    }
}
