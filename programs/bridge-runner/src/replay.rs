//! Replays a recorded ledger event log through the bridge.

use std::io::BufRead;

use dibc_bridge::{BridgeConfig, BridgeContext, BridgeError, Controller, IbcModule};
use dibc_bridge_types::{ChannelEndpoint, Order, Packet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::ControllerCommand,
    controller::ProcessController,
    ledger::{BlockContext, MemoryLedger},
};

/// One entry of the event log.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum LedgerEvent {
    /// Start executing block `height`.
    BeginBlock {
        /// Block height.
        height: u64,
        /// Whether the block's transactions are only simulated.
        #[serde(default)]
        simulation: bool,
    },
    /// Seed the ledger with an open channel.
    OpenChannel {
        /// Port of the channel.
        port: String,
        /// Channel identifier.
        channel: String,
        /// Next send sequence.
        #[serde(default = "first_sequence")]
        next_sequence: u64,
    },
    /// A handshake was started on this chain.
    ChanOpenInit {
        /// Channel ordering.
        #[serde(default)]
        order: Order,
        /// Connections the channel runs over.
        #[serde(default)]
        connection_hops: Vec<String>,
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
        /// Capability handed over with the channel.
        capability: String,
        /// The other end.
        counterparty: ChannelEndpoint,
        /// Proposed version.
        #[serde(default)]
        version: String,
    },
    /// The counterparty's handshake reached this chain.
    ChanOpenTry {
        /// Channel ordering.
        #[serde(default)]
        order: Order,
        /// Connections the channel runs over.
        #[serde(default)]
        connection_hops: Vec<String>,
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
        /// The other end.
        counterparty: ChannelEndpoint,
        /// Our version.
        #[serde(default)]
        version: String,
        /// The counterparty's version.
        #[serde(default)]
        counterparty_version: String,
    },
    /// The counterparty accepted our handshake.
    ChanOpenAck {
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
        /// The counterparty's version.
        #[serde(default)]
        counterparty_version: String,
    },
    /// The handshake completed.
    ChanOpenConfirm {
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
    },
    /// Closing was started.
    ChanCloseInit {
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
    },
    /// The counterparty confirmed the close.
    ChanCloseConfirm {
        /// Our port.
        port_id: String,
        /// Our channel.
        channel_id: String,
    },
    /// A packet arrived.
    RecvPacket {
        /// The packet.
        packet: Packet,
    },
    /// A packet we sent was acknowledged.
    AcknowledgementPacket {
        /// The packet.
        packet: Packet,
        /// The acknowledgement, base64.
        #[serde(with = "dibc_utils::serde::base64_bytes")]
        acknowledgement: Vec<u8>,
    },
    /// A packet we sent timed out.
    TimeoutPacket {
        /// The packet.
        packet: Packet,
    },
}

const fn first_sequence() -> u64 {
    1
}

/// Failure to read the event log. Failures of individual events are
/// recorded in the [`ReplaySummary`] instead.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the log failed.
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),

    /// A line of the log is not an event.
    #[error("invalid event on line {line}: {source}")]
    Decode {
        /// 1-based line number.
        line: usize,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// An event the bridge refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplayFailure {
    /// 1-based line number of the event.
    pub line: usize,
    /// The error text.
    pub error: String,
}

/// What the ledger saw during a replay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Number of events applied, failed ones included.
    pub events: usize,
    /// Events the bridge refused.
    pub failures: Vec<ReplayFailure>,
    /// Controller responses, by line number.
    pub responses: Vec<(usize, String)>,
    /// Packets sent by the controller.
    pub packets_sent: Vec<Packet>,
    /// Sequences of received packets the controller acknowledged.
    pub packets_acknowledged: Vec<u64>,
    /// Channels the controller closed.
    pub channels_closed: Vec<ChannelEndpoint>,
    /// Sequence of the received packet still awaiting acknowledgement.
    pub pending_packet: Option<u64>,
}

/// Apply one event to the bridge session.
///
/// # Errors
/// Returns the bridge's error for lifecycle events.
pub fn apply<C: Controller>(
    module: &mut IbcModule<MemoryLedger, C>,
    ctx: &mut BridgeContext<'_, MemoryLedger>,
    event: LedgerEvent,
) -> Result<Option<String>, BridgeError> {
    let response = match event {
        LedgerEvent::BeginBlock { height, simulation } => {
            let execution = ctx.execution_context_mut();
            execution.height = height;
            execution.simulation = simulation;
            tracing::debug!(height, simulation, "begin block");
            return Ok(None);
        }
        LedgerEvent::OpenChannel {
            port,
            channel,
            next_sequence,
        } => {
            ctx.keeper_mut().open_channel(&port, &channel, next_sequence);
            return Ok(None);
        }
        LedgerEvent::ChanOpenInit {
            order,
            connection_hops,
            port_id,
            channel_id,
            capability,
            counterparty,
            version,
        } => module.on_chan_open_init(
            ctx,
            order,
            &connection_hops,
            &port_id,
            &channel_id,
            &capability,
            &counterparty,
            &version,
        )?,
        LedgerEvent::ChanOpenTry {
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
            counterparty_version,
        } => module.on_chan_open_try(
            ctx,
            order,
            &connection_hops,
            &port_id,
            &channel_id,
            &counterparty,
            &version,
            &counterparty_version,
        )?,
        LedgerEvent::ChanOpenAck {
            port_id,
            channel_id,
            counterparty_version,
        } => module.on_chan_open_ack(ctx, &port_id, &channel_id, &counterparty_version)?,
        LedgerEvent::ChanOpenConfirm {
            port_id,
            channel_id,
        } => module.on_chan_open_confirm(ctx, &port_id, &channel_id)?,
        LedgerEvent::ChanCloseInit {
            port_id,
            channel_id,
        } => module.on_chan_close_init(ctx, &port_id, &channel_id)?,
        LedgerEvent::ChanCloseConfirm {
            port_id,
            channel_id,
        } => module.on_chan_close_confirm(ctx, &port_id, &channel_id)?,
        LedgerEvent::RecvPacket { packet } => module.on_recv_packet(ctx, &packet)?,
        LedgerEvent::AcknowledgementPacket {
            packet,
            acknowledgement,
        } => module.on_acknowledgement_packet(ctx, &packet, &acknowledgement)?,
        LedgerEvent::TimeoutPacket { packet } => module.on_timeout_packet(ctx, &packet)?,
    };
    Ok(Some(response))
}

/// Replay every event of `events` through `module` over a fresh in-memory ledger.
///
/// Blank lines are skipped.
///
/// # Errors
/// Returns an error if the log cannot be read or a line is not an event.
pub fn replay<C: Controller, R: BufRead>(
    module: &mut IbcModule<MemoryLedger, C>,
    events: R,
) -> Result<ReplaySummary, ReplayError> {
    let mut execution = BlockContext::default();
    let mut ledger = MemoryLedger::default();
    let mut summary = ReplaySummary::default();

    {
        let mut ctx = BridgeContext::new(&mut execution, &mut ledger);
        for (index, line) in events.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let number = index + 1;
            let event: LedgerEvent = serde_json::from_str(&line)
                .map_err(|source| ReplayError::Decode { line: number, source })?;

            summary.events += 1;
            match apply(module, &mut ctx, event) {
                Ok(Some(response)) => summary.responses.push((number, response)),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(line = number, %err, "event failed");
                    summary.failures.push(ReplayFailure {
                        line: number,
                        error: err.to_string(),
                    });
                }
            }
        }
        summary.pending_packet = ctx.current_packet().map(|packet| packet.sequence);
    }

    summary.packets_sent = ledger.sent_packets().to_vec();
    summary.packets_acknowledged = ledger
        .executed_packets()
        .iter()
        .map(|(packet, _)| packet.sequence)
        .collect();
    summary.channels_closed = ledger.closed_channels().to_vec();
    tracing::info!(
        events = summary.events,
        failures = summary.failures.len(),
        "replay finished"
    );
    Ok(summary)
}

/// Replay `events` against a controller process started from `command`.
///
/// The controller's stdin is closed and the process is waited for once the
/// replay ends, whether it succeeded or not.
///
/// # Errors
/// Returns an error if the controller cannot be started or waited for, or
/// if the replay fails.
pub fn replay_with_process<R: BufRead>(
    config: &BridgeConfig,
    command: &ControllerCommand,
    events: R,
) -> anyhow::Result<ReplaySummary> {
    let controller = ProcessController::spawn(command)?;
    let mut module = IbcModule::new(config, controller);

    let result = replay(&mut module, events);
    let status = module.into_controller().finish()?;
    tracing::info!(%status, "controller exited");
    Ok(result?)
}
