//! IBC module callbacks forwarded to the controller.

use dibc_bridge_types::{channel_capability_path, ChannelEndpoint, ControllerEvent, Order, Packet};

use crate::{
    config::BridgeConfig,
    context::BridgeContext,
    controller::Controller,
    error::BridgeError,
    handler::ChannelHandler,
    keeper::{ExecutionContext, Keeper},
    ports::{PortCaller, PortRouter},
};

/// The ledger's IBC module for the bridge port.
///
/// Every callback hands a [`ControllerEvent`] to the controller and blocks
/// until it answers. The answer is returned unchanged; a controller failure
/// fails the callback and it is up to the IBC module to roll back.
pub struct IbcModule<K: Keeper, C> {
    router: PortRouter<K>,
    controller: C,
}

impl<K: Keeper, C: Controller> IbcModule<K, C> {
    /// A module whose router serves the channel handler on `config.port`.
    pub fn new(config: &BridgeConfig, controller: C) -> Self {
        let router =
            PortRouter::with_port(config.port.clone(), ChannelHandler::new(config.packet_timeout));
        Self::with_router(router, controller)
    }

    /// A module over an existing port registry.
    pub const fn with_router(router: PortRouter<K>, controller: C) -> Self {
        Self { router, controller }
    }

    /// The port registry.
    pub const fn router(&self) -> &PortRouter<K> {
        &self.router
    }

    /// Mutable access to the port registry, e.g. to register more ports.
    pub fn router_mut(&mut self) -> &mut PortRouter<K> {
        &mut self.router
    }

    /// The controller.
    pub const fn controller(&self) -> &C {
        &self.controller
    }

    /// Mutable access to the controller.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Give up the module, returning its controller.
    pub fn into_controller(self) -> C {
        self.controller
    }

    /// A request issued by the controller outside of any callback.
    ///
    /// # Errors
    /// Whatever the port handler returns.
    pub fn handle_port_request(
        &self,
        ctx: &mut BridgeContext<'_, K>,
        port: &str,
        request: &str,
    ) -> Result<String, BridgeError> {
        self.router.dispatch(ctx, port, request)
    }

    /// A channel handshake was started on this chain.
    ///
    /// The channel capability is claimed before the controller hears about
    /// the channel. If the claim fails the controller is not called.
    ///
    /// # Errors
    /// [`BridgeError::ChannelCapabilityNotFound`] if the claim fails, otherwise
    /// the controller's error.
    #[allow(clippy::too_many_arguments)]
    pub fn on_chan_open_init(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        order: Order,
        connection_hops: &[String],
        port_id: &str,
        channel_id: &str,
        capability: &K::Capability,
        counterparty: &ChannelEndpoint,
        version: &str,
    ) -> Result<String, BridgeError> {
        let (execution, keeper) = ctx.split();
        keeper
            .claim_capability(
                execution,
                capability,
                &channel_capability_path(port_id, channel_id),
            )
            .map_err(BridgeError::ChannelCapabilityNotFound)?;

        self.notify(
            ctx,
            &ControllerEvent::ChannelOpenInit {
                order,
                connection_hops: connection_hops.to_vec(),
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
                counterparty: counterparty.clone(),
                version: version.to_string(),
            },
        )
    }

    /// The counterparty's handshake reached this chain.
    ///
    /// # Errors
    /// The controller's error.
    #[allow(clippy::too_many_arguments)]
    pub fn on_chan_open_try(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        order: Order,
        connection_hops: &[String],
        port_id: &str,
        channel_id: &str,
        counterparty: &ChannelEndpoint,
        version: &str,
        counterparty_version: &str,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::ChannelOpenTry {
                order,
                connection_hops: connection_hops.to_vec(),
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
                counterparty: counterparty.clone(),
                version: version.to_string(),
                counterparty_version: counterparty_version.to_string(),
            },
        )
    }

    /// The counterparty accepted our handshake.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_chan_open_ack(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        port_id: &str,
        channel_id: &str,
        counterparty_version: &str,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::ChannelOpenAck {
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
                counterparty_version: counterparty_version.to_string(),
            },
        )
    }

    /// The handshake completed on this chain.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_chan_open_confirm(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        port_id: &str,
        channel_id: &str,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::ChannelOpenConfirm {
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
            },
        )
    }

    /// Closing of a channel was started.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_chan_close_init(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        port_id: &str,
        channel_id: &str,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::ChannelCloseInit {
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
            },
        )
    }

    /// The counterparty confirmed a channel closed.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_chan_close_confirm(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        port_id: &str,
        channel_id: &str,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::ChannelCloseConfirm {
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
            },
        )
    }

    /// A packet arrived.
    ///
    /// The packet occupies the session's slot before the controller is
    /// called, so the controller can `ack` it while handling the call or
    /// later. If the call fails the slot is released again.
    ///
    /// # Errors
    /// [`BridgeError::PacketAlreadyPending`] if another packet still awaits
    /// acknowledgement (the controller is not called), otherwise the
    /// controller's error.
    pub fn on_recv_packet(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        packet: &Packet,
    ) -> Result<String, BridgeError> {
        let event = ControllerEvent::PacketReceived {
            packet: packet.clone(),
        };
        if ctx.execution_context().is_simulation() {
            return self.notify(ctx, &event);
        }

        ctx.begin_packet(packet.clone())?;
        let result = self.notify(ctx, &event);
        if result.is_err() {
            if let Some(released) = ctx.take_current_packet() {
                tracing::debug!(sequence = released.sequence, "released packet of failed receive");
            }
        }
        result
    }

    /// A packet we sent was acknowledged.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_acknowledgement_packet(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::PacketAcknowledged {
                packet: packet.clone(),
                acknowledgement: acknowledgement.to_vec(),
            },
        )
    }

    /// A packet we sent timed out.
    ///
    /// # Errors
    /// The controller's error.
    pub fn on_timeout_packet(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        packet: &Packet,
    ) -> Result<String, BridgeError> {
        self.notify(
            ctx,
            &ControllerEvent::PacketTimedOut {
                packet: packet.clone(),
            },
        )
    }

    fn notify(
        &mut self,
        ctx: &mut BridgeContext<'_, K>,
        event: &ControllerEvent,
    ) -> Result<String, BridgeError> {
        if ctx.execution_context().is_simulation() {
            tracing::debug!(event = event.kind(), "simulated transaction, controller not called");
            return Ok(String::new());
        }

        let message = event.to_json().map_err(BridgeError::EventEncoding)?;
        tracing::info!(event = event.kind(), "calling controller");

        let mut ports = PortCaller::new(&self.router, ctx);
        match self.controller.call(&message, &mut ports) {
            Ok(response) => Ok(response),
            Err(error) => {
                tracing::warn!(event = event.kind(), %error, "controller call failed");
                Err(error.into())
            }
        }
    }
}

impl<K: Keeper, C: core::fmt::Debug> core::fmt::Debug for IbcModule<K, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IbcModule")
            .field("router", &self.router)
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use dibc_bridge_types::{ChannelMessage, ChannelTuple};
    use rstest::rstest;

    use super::*;
    use crate::{
        controller::ControllerError,
        test_utils::{MemoryContext, MemoryKeeper, ScriptedCall, ScriptedController},
    };

    type Module = IbcModule<MemoryKeeper, ScriptedController>;

    fn module(controller: ScriptedController) -> Module {
        IbcModule::new(&BridgeConfig::default(), controller)
    }

    fn incoming(sequence: u64) -> Packet {
        Packet::new(
            b"ping".to_vec(),
            sequence,
            ChannelEndpoint::new("transfer", "channel-9"),
            ChannelEndpoint::new("dibc", "channel-2"),
            500,
        )
    }

    fn ack_request(reply: &[u8]) -> String {
        ChannelMessage::ack(ChannelTuple::default(), reply)
            .to_json()
            .unwrap()
    }

    fn message_type(message: &str) -> String {
        let json: serde_json::Value = serde_json::from_str(message).unwrap();
        json["type"].as_str().unwrap().to_string()
    }

    fn open_init(
        module: &mut Module,
        ctx: &mut BridgeContext<'_, MemoryKeeper>,
        capability: &str,
    ) -> Result<String, BridgeError> {
        module.on_chan_open_init(
            ctx,
            Order::Unordered,
            &["connection-0".to_string()],
            "dibc",
            "channel-0",
            &capability.to_string(),
            &ChannelEndpoint::new("transfer", ""),
            "v1",
        )
    }

    #[test]
    fn open_init_claims_capability_then_notifies() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new());

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        assert_eq!(open_init(&mut module, &mut ctx, "cap-0").unwrap(), "true");
        drop(ctx);

        assert_eq!(
            keeper.claimed_capabilities(),
            &["capabilities/ports/dibc/channels/channel-0".to_string()]
        );
        let messages = module.controller().messages();
        assert_eq!(messages.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(json["type"], "channel-open-init");
        assert_eq!(json["portId"], "dibc");
        assert_eq!(json["channelId"], "channel-0");
        assert_eq!(json["connectionHops"][0], "connection-0");
    }

    #[test]
    fn open_init_capability_failure_skips_controller() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        keeper.deny_capability("stolen");
        let mut module = module(ScriptedController::new());

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        let err = open_init(&mut module, &mut ctx, "stolen").unwrap_err();
        assert!(matches!(err, BridgeError::ChannelCapabilityNotFound(_)));
        assert!(err.to_string().starts_with("channel capability not found"));
        assert_eq!(module.controller().call_count(), 0);
    }

    #[rstest]
    #[case::open_try("channel-open-try")]
    #[case::open_ack("channel-open-ack")]
    #[case::open_confirm("channel-open-confirm")]
    #[case::close_init("channel-close-init")]
    #[case::close_confirm("channel-close-confirm")]
    #[case::recv("packet-received")]
    #[case::acknowledged("packet-acknowledged")]
    #[case::timed_out("packet-timed-out")]
    fn each_callback_sends_its_tag(#[case] tag: &str) {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new().then(ScriptedCall::respond("seen")));
        let counterparty = ChannelEndpoint::new("transfer", "channel-3");

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        let response = match tag {
            "channel-open-try" => module.on_chan_open_try(
                &mut ctx,
                Order::Ordered,
                &[],
                "dibc",
                "channel-1",
                &counterparty,
                "v1",
                "v1",
            ),
            "channel-open-ack" => module.on_chan_open_ack(&mut ctx, "dibc", "channel-1", "v1"),
            "channel-open-confirm" => module.on_chan_open_confirm(&mut ctx, "dibc", "channel-1"),
            "channel-close-init" => module.on_chan_close_init(&mut ctx, "dibc", "channel-1"),
            "channel-close-confirm" => module.on_chan_close_confirm(&mut ctx, "dibc", "channel-1"),
            "packet-received" => module.on_recv_packet(&mut ctx, &incoming(1)),
            "packet-acknowledged" => {
                module.on_acknowledgement_packet(&mut ctx, &incoming(1), b"ok")
            }
            "packet-timed-out" => module.on_timeout_packet(&mut ctx, &incoming(1)),
            other => unreachable!("{other}"),
        };

        assert_eq!(response.unwrap(), "seen");
        assert_eq!(module.controller().call_count(), 1);
        assert_eq!(message_type(&module.controller().messages()[0]), tag);
    }

    #[test]
    fn controller_error_is_returned_verbatim() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new().then(ScriptedCall::fail("not today")));

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        let err = module
            .on_chan_open_confirm(&mut ctx, "dibc", "channel-1")
            .unwrap_err();
        assert!(matches!(
            &err,
            BridgeError::Controller(ControllerError::Rejected(reason)) if reason == "not today"
        ));
        assert_eq!(err.to_string(), "not today");
    }

    #[test]
    fn recv_can_be_acked_during_the_call() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(
            ScriptedController::new()
                .then(ScriptedCall::respond("true").with_request("dibc", ack_request(b"pong"))),
        );

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module.on_recv_packet(&mut ctx, &incoming(4)).unwrap();
        assert!(ctx.current_packet().is_none());
        drop(ctx);

        assert_eq!(module.controller().port_results(), &[Ok("true".to_string())]);
        assert_eq!(keeper.executed_packets(), &[(incoming(4), b"pong".to_vec())]);
    }

    #[test]
    fn recv_can_be_acked_after_the_call() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new());

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module.on_recv_packet(&mut ctx, &incoming(4)).unwrap();
        assert_eq!(ctx.current_packet(), Some(&incoming(4)));

        let response = module
            .handle_port_request(&mut ctx, "dibc", &ack_request(b"later"))
            .unwrap();
        assert_eq!(response, "true");
        assert!(ctx.current_packet().is_none());
    }

    #[test]
    fn recv_while_pending_fails_without_calling_controller() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new());

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module.on_recv_packet(&mut ctx, &incoming(1)).unwrap();
        let err = module.on_recv_packet(&mut ctx, &incoming(2)).unwrap_err();
        assert!(matches!(err, BridgeError::PacketAlreadyPending { sequence: 1 }));
        assert_eq!(ctx.current_packet(), Some(&incoming(1)));
        assert_eq!(module.controller().call_count(), 1);
    }

    #[test]
    fn failed_recv_releases_the_slot() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(
            ScriptedController::new()
                .then(ScriptedCall::fail("cannot handle"))
                .then(ScriptedCall::respond("true")),
        );

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        assert!(module.on_recv_packet(&mut ctx, &incoming(1)).is_err());
        assert!(ctx.current_packet().is_none());
        module.on_recv_packet(&mut ctx, &incoming(2)).unwrap();
        assert_eq!(ctx.current_packet().map(|p| p.sequence), Some(2));
    }

    #[test]
    fn ack_request_without_packet_reports_to_controller() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(
            ScriptedController::new()
                .then(ScriptedCall::respond("true").with_request("dibc", ack_request(b"x"))),
        );

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module
            .on_chan_open_ack(&mut ctx, "dibc", "channel-1", "v1")
            .unwrap();
        assert_eq!(
            module.controller().port_results(),
            &[Err("current packet is already acknowledged".to_string())]
        );
        drop(ctx);
        assert!(keeper.executed_packets().is_empty());
    }

    #[test]
    fn controller_can_send_during_a_call() {
        let mut exec = MemoryContext::at_height(100);
        let mut keeper = MemoryKeeper::default();
        keeper.open_channel("transfer", "channel-0", 5);
        let tuple = ChannelTuple::new(
            ChannelEndpoint::new("transfer", "channel-1"),
            ChannelEndpoint::new("transfer", "channel-0"),
        );
        let send = ChannelMessage::send(tuple, b"hello").to_json().unwrap();
        let mut module = module(
            ScriptedController::new().then(ScriptedCall::respond("true").with_request("dibc", send)),
        );

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module
            .on_chan_open_confirm(&mut ctx, "transfer", "channel-0")
            .unwrap();
        drop(ctx);

        let sent = keeper.sent_packets();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sequence, 5);
        assert_eq!(sent[0].timeout_height, 1100);
    }

    #[test]
    fn unknown_port_is_reported_to_controller() {
        let mut exec = MemoryContext::at_height(1);
        let mut keeper = MemoryKeeper::default();
        let mut module = module(
            ScriptedController::new()
                .then(ScriptedCall::respond("true").with_request("vbank", "{}")),
        );

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        module.on_chan_close_init(&mut ctx, "dibc", "channel-1").unwrap();
        assert_eq!(
            module.controller().port_results(),
            &[Err("no handler registered for port vbank".to_string())]
        );
    }

    #[test]
    fn simulation_never_reaches_controller() {
        let mut exec = MemoryContext::at_height(1);
        exec.simulation = true;
        let mut keeper = MemoryKeeper::default();
        let mut module = module(ScriptedController::new());

        let mut ctx = BridgeContext::new(&mut exec, &mut keeper);
        assert_eq!(module.on_recv_packet(&mut ctx, &incoming(1)).unwrap(), "");
        assert!(ctx.current_packet().is_none());
        assert_eq!(open_init(&mut module, &mut ctx, "cap").unwrap(), "");
        drop(ctx);

        assert_eq!(module.controller().call_count(), 0);
        assert_eq!(keeper.claimed_capabilities().len(), 1);
    }

    #[test]
    fn custom_port_name() {
        let config = BridgeConfig {
            port: "ibc-port".to_string(),
            packet_timeout: 10,
        };
        let module: Module = IbcModule::new(&config, ScriptedController::new());
        assert!(module.router().contains("ibc-port"));
        assert!(!module.router().contains("dibc"));
    }
}
