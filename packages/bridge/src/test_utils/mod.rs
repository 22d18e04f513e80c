//! In-memory keeper and scripted controller for tests and replays.

use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet, VecDeque},
};

use dibc_bridge_types::{ChannelEndpoint, Packet};

use crate::{
    controller::{Controller, ControllerError, PortDispatch},
    keeper::{ExecutionContext, Keeper, KeeperError},
};

/// Execution context with a settable height and simulation flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryContext {
    /// Current block height.
    pub height: u64,
    /// Whether the current transaction is simulated.
    pub simulation: bool,
}

impl MemoryContext {
    /// A non-simulated context at `height`.
    #[must_use]
    pub const fn at_height(height: u64) -> Self {
        Self {
            height,
            simulation: false,
        }
    }
}

impl ExecutionContext for MemoryContext {
    fn block_height(&self) -> u64 {
        self.height
    }

    fn is_simulation(&self) -> bool {
        self.simulation
    }
}

/// A keeper that records every mutation it is asked to perform.
///
/// Channels must be opened with [`MemoryKeeper::open_channel`] before
/// packets can be sent on them or they can be closed.
#[derive(Debug, Default)]
pub struct MemoryKeeper {
    next_sequence_send: BTreeMap<ChannelEndpoint, u64>,
    sent: Vec<Packet>,
    executed: Vec<(Packet, Vec<u8>)>,
    closed: Vec<ChannelEndpoint>,
    claimed: Vec<String>,
    denied_capabilities: BTreeSet<String>,
    fail_packet_executed: Option<KeeperError>,
    fail_send: Option<KeeperError>,
    fail_close: Option<KeeperError>,
    calls: Cell<usize>,
}

impl MemoryKeeper {
    /// Open `port/channel` with `next_sequence` as its next send sequence.
    pub fn open_channel(&mut self, port: &str, channel: &str, next_sequence: u64) {
        self.next_sequence_send
            .insert(ChannelEndpoint::new(port, channel), next_sequence);
    }

    /// Refuse to claim `capability`.
    pub fn deny_capability(&mut self, capability: &str) {
        self.denied_capabilities.insert(capability.to_string());
    }

    /// Make every `packet_executed` fail with `message`.
    pub fn fail_packet_executed(&mut self, message: &str) {
        self.fail_packet_executed = Some(KeeperError::new(message));
    }

    /// Make every `send_packet` fail with `message`.
    pub fn fail_send_packet(&mut self, message: &str) {
        self.fail_send = Some(KeeperError::new(message));
    }

    /// Make every `chan_close_init` fail with `message`.
    pub fn fail_chan_close(&mut self, message: &str) {
        self.fail_close = Some(KeeperError::new(message));
    }

    /// Packets committed by `send_packet`, in order.
    #[must_use]
    pub fn sent_packets(&self) -> &[Packet] {
        &self.sent
    }

    /// Packets acknowledged through `packet_executed`, with their acknowledgements.
    #[must_use]
    pub fn executed_packets(&self) -> &[(Packet, Vec<u8>)] {
        &self.executed
    }

    /// Channels closed through `chan_close_init`.
    #[must_use]
    pub fn closed_channels(&self) -> &[ChannelEndpoint] {
        &self.closed
    }

    /// Capability names claimed so far.
    #[must_use]
    pub fn claimed_capabilities(&self) -> &[String] {
        &self.claimed
    }

    /// Number of keeper operations invoked, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl Keeper for MemoryKeeper {
    type Context = MemoryContext;
    type Capability = String;

    fn packet_executed(
        &mut self,
        _ctx: &mut MemoryContext,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<(), KeeperError> {
        self.count();
        if let Some(err) = &self.fail_packet_executed {
            return Err(err.clone());
        }
        self.executed.push((packet.clone(), acknowledgement.to_vec()));
        Ok(())
    }

    fn chan_close_init(
        &mut self,
        _ctx: &mut MemoryContext,
        port_id: &str,
        channel_id: &str,
    ) -> Result<(), KeeperError> {
        self.count();
        if let Some(err) = &self.fail_close {
            return Err(err.clone());
        }
        let endpoint = ChannelEndpoint::new(port_id, channel_id);
        if !self.next_sequence_send.contains_key(&endpoint) {
            return Err(KeeperError::new(format!("channel {endpoint} not found")));
        }
        self.closed.push(endpoint);
        Ok(())
    }

    fn next_sequence_send(
        &self,
        _ctx: &MemoryContext,
        port_id: &str,
        channel_id: &str,
    ) -> Option<u64> {
        self.count();
        self.next_sequence_send
            .get(&ChannelEndpoint::new(port_id, channel_id))
            .copied()
    }

    fn send_packet(&mut self, _ctx: &mut MemoryContext, packet: Packet) -> Result<(), KeeperError> {
        self.count();
        if let Some(err) = &self.fail_send {
            return Err(err.clone());
        }
        let sequence = self
            .next_sequence_send
            .get_mut(&packet.destination)
            .ok_or_else(|| KeeperError::new(format!("channel {} not found", packet.destination)))?;
        *sequence += 1;
        self.sent.push(packet);
        Ok(())
    }

    fn claim_capability(
        &mut self,
        _ctx: &mut MemoryContext,
        capability: &String,
        name: &str,
    ) -> Result<(), KeeperError> {
        self.count();
        if self.denied_capabilities.contains(capability) {
            return Err(KeeperError::new(format!("capability {capability} is owned elsewhere")));
        }
        self.claimed.push(name.to_string());
        Ok(())
    }
}

/// One scripted controller reaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedCall {
    requests: Vec<(String, String)>,
    outcome: Result<String, String>,
}

impl ScriptedCall {
    /// Answer the call with `response`.
    pub fn respond(response: impl Into<String>) -> Self {
        Self {
            requests: Vec::new(),
            outcome: Ok(response.into()),
        }
    }

    /// Reject the call with `reason`.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            requests: Vec::new(),
            outcome: Err(reason.into()),
        }
    }

    /// Issue `request` to `port` before answering.
    #[must_use]
    pub fn with_request(mut self, port: impl Into<String>, request: impl Into<String>) -> Self {
        self.requests.push((port.into(), request.into()));
        self
    }
}

/// A controller that plays back a script and records what it saw.
///
/// Once the script is exhausted every call is answered with `"true"`.
#[derive(Debug, Default)]
pub struct ScriptedController {
    script: VecDeque<ScriptedCall>,
    messages: Vec<String>,
    port_results: Vec<Result<String, String>>,
}

impl ScriptedController {
    /// A controller with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `call` to the script.
    #[must_use]
    pub fn then(mut self, call: ScriptedCall) -> Self {
        self.script.push_back(call);
        self
    }

    /// Messages received, in order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.messages.len()
    }

    /// Results of the port requests issued, errors rendered as text.
    #[must_use]
    pub fn port_results(&self) -> &[Result<String, String>] {
        &self.port_results
    }
}

impl Controller for ScriptedController {
    fn call(
        &mut self,
        message: &str,
        ports: &mut dyn PortDispatch,
    ) -> Result<String, ControllerError> {
        self.messages.push(message.to_string());
        let step = self
            .script
            .pop_front()
            .unwrap_or_else(|| ScriptedCall::respond("true"));

        for (port, request) in &step.requests {
            let result = ports
                .call_port(port, request)
                .map_err(|err| err.to_string());
            self.port_results.push(result);
        }
        step.outcome.map_err(ControllerError::Rejected)
    }
}
