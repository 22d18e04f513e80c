use dibc_bridge::{
    test_utils::{ScriptedCall, ScriptedController},
    BridgeConfig, IbcModule,
};
use dibc_bridge_runner::{
    ledger::MemoryLedger,
    replay::{replay, ReplayError},
};
use dibc_bridge_types::{ChannelEndpoint, ChannelMessage, ChannelTuple};
use serde_json::json;

fn log(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn packet(sequence: u64) -> serde_json::Value {
    json!({
        "sequence": sequence.to_string(),
        "source": { "port": "transfer", "channel": "channel-4" },
        "destination": { "port": "dibc", "channel": "channel-0" },
        "data64": "aGk=",
        "timeoutHeight": "100",
        "timeoutTimestamp": "0"
    })
}

fn module(controller: ScriptedController) -> IbcModule<MemoryLedger, ScriptedController> {
    IbcModule::new(&BridgeConfig::default(), controller)
}

#[test]
fn received_packet_acked_synchronously_and_reply_sent() {
    let tuple = ChannelTuple::new(
        ChannelEndpoint::new("dibc", "channel-0"),
        ChannelEndpoint::new("transfer", "channel-4"),
    );
    let ack = ChannelMessage::ack(tuple, b"pong").to_json().unwrap();
    let send = ChannelMessage::send(
        ChannelTuple::new(
            ChannelEndpoint::new("transfer", "channel-4"),
            ChannelEndpoint::new("dibc", "channel-0"),
        ),
        b"reply",
    )
    .to_json()
    .unwrap();

    let controller = ScriptedController::new().then(
        ScriptedCall::respond("handled")
            .with_request("dibc", ack)
            .with_request("dibc", send),
    );
    let mut module = module(controller);

    let events = log(&[
        json!({ "type": "begin-block", "height": 10 }),
        json!({ "type": "open-channel", "port": "dibc", "channel": "channel-0", "nextSequence": 7 }),
        json!({ "type": "recv-packet", "packet": packet(1) }),
    ]);
    let summary = replay(&mut module, events.as_bytes()).unwrap();

    assert_eq!(summary.events, 3);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.responses, vec![(3, "handled".to_string())]);
    assert_eq!(summary.packets_acknowledged, vec![1]);
    assert_eq!(summary.pending_packet, None);
    assert_eq!(summary.packets_sent.len(), 1);
    assert_eq!(summary.packets_sent[0].sequence, 7);
    assert_eq!(summary.packets_sent[0].timeout_height, 1010);
    assert_eq!(summary.packets_sent[0].data, b"reply");
}

#[test]
fn unacknowledged_packet_blocks_the_next_one() {
    let mut module = module(ScriptedController::new());
    let events = log(&[
        json!({ "type": "recv-packet", "packet": packet(1) }),
        json!({ "type": "recv-packet", "packet": packet(2) }),
    ]);

    let summary = replay(&mut module, events.as_bytes()).unwrap();
    assert_eq!(summary.events, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].line, 2);
    assert_eq!(summary.pending_packet, Some(1));
    assert_eq!(module.controller().call_count(), 1);
}

#[test]
fn controller_rejection_is_recorded_and_replay_continues() {
    let controller = ScriptedController::new()
        .then(ScriptedCall::fail("unknown counterparty"))
        .then(ScriptedCall::respond("ok"));
    let mut module = module(controller);
    let events = log(&[
        json!({
            "type": "chan-open-try",
            "order": "unordered",
            "connectionHops": ["connection-0"],
            "portId": "dibc",
            "channelId": "channel-1",
            "counterparty": { "port": "transfer", "channel": "channel-9" },
            "version": "v1",
            "counterpartyVersion": "v1"
        }),
        json!({ "type": "chan-open-confirm", "portId": "dibc", "channelId": "channel-1" }),
    ]);

    let summary = replay(&mut module, events.as_bytes()).unwrap();
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].error, "unknown counterparty");
    assert_eq!(summary.responses, vec![(2, "ok".to_string())]);
}

#[test]
fn simulated_blocks_skip_the_controller() {
    let mut module = module(ScriptedController::new());
    let events = log(&[
        json!({ "type": "begin-block", "height": 3, "simulation": true }),
        json!({ "type": "timeout-packet", "packet": packet(5) }),
        json!({ "type": "begin-block", "height": 4 }),
        json!({ "type": "acknowledgement-packet", "packet": packet(5), "acknowledgement": "b2s=" }),
    ]);

    let summary = replay(&mut module, events.as_bytes()).unwrap();
    assert_eq!(summary.responses, vec![(2, String::new()), (4, "true".to_string())]);
    assert_eq!(module.controller().call_count(), 1);
}

#[test]
fn invalid_line_aborts_with_its_number() {
    let mut module = module(ScriptedController::new());
    let events = "{\"type\":\"begin-block\",\"height\":1}\n\n{\"type\":\"launch\"}\n";

    let err = replay(&mut module, events.as_bytes()).unwrap_err();
    assert!(matches!(err, ReplayError::Decode { line: 3, .. }));
}

#[cfg(unix)]
mod process {
    use dibc_bridge::BridgeConfig;
    use dibc_bridge_runner::{
        config::ControllerCommand,
        replay::{replay_with_process, ReplayError},
    };

    /// A controller that ignores its input and leaves `marker` behind when it exits.
    fn exiting_controller(marker: &std::path::Path) -> ControllerCommand {
        ControllerCommand {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "cat > /dev/null; touch \"$0\"".to_string(),
                marker.display().to_string(),
            ],
        }
    }

    #[test]
    fn controller_is_waited_for_when_replay_fails() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("exited");

        let err = replay_with_process(
            &BridgeConfig::default(),
            &exiting_controller(&marker),
            "{\"type\":\"launch\"}\n".as_bytes(),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReplayError>(),
            Some(ReplayError::Decode { line: 1, .. })
        ));
        assert!(marker.exists());
    }

    #[test]
    fn controller_is_waited_for_after_replay() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("exited");

        let summary = replay_with_process(
            &BridgeConfig::default(),
            &exiting_controller(&marker),
            "{\"type\":\"begin-block\",\"height\":2}\n".as_bytes(),
        )
        .unwrap();

        assert_eq!(summary.events, 1);
        assert!(marker.exists());
    }
}
