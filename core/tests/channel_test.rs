use comms_core::{
    duplex_pair, loopback, Channel, CommsError, Direction, DummyReceiver, DummyTransmitter,
    Endpoint, Operation, Receiver, Result, Transmitter,
};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Sink {
        fn send(&self, message: &[u8]) -> Result<()>;
        fn close(&self) -> Result<()>;
    }
}

// Transmitter whose behaviour is scripted through a mocked sink
struct ScriptedTransmitter {
    address: String,
    sink: MockSink,
}

impl ScriptedTransmitter {
    fn new(address: &str, sink: MockSink) -> Self {
        Self {
            address: address.to_string(),
            sink,
        }
    }
}

impl Endpoint for ScriptedTransmitter {
    fn address(&self) -> &str {
        &self.address
    }

    fn close(&self) -> Result<()> {
        self.sink.close()
    }
}

impl Transmitter for ScriptedTransmitter {
    fn send(&self, message: &[u8]) -> Result<()> {
        self.sink.send(message)
    }
}

fn failing_sink() -> MockSink {
    let mut sink = MockSink::new();
    sink.expect_send()
        .returning(|_| Err(CommsError::transport("radio", "link down")));
    sink
}

fn rx(receiver: impl Receiver + 'static) -> Arc<dyn Receiver> {
    Arc::new(receiver)
}

fn tx(transmitter: impl Transmitter + 'static) -> Arc<dyn Transmitter> {
    Arc::new(transmitter)
}

#[test]
fn unknown_address_is_reported_for_both_operations() {
    let channel = Channel::point_to_point(None, None).unwrap();

    let err = channel.send_to(b"hello", "nowhere").unwrap_err();
    assert!(matches!(err, CommsError::AddressNotFound(ref a) if a == "nowhere"));

    let err = channel.receive_from("nowhere").unwrap_err();
    assert!(matches!(err, CommsError::AddressNotFound(ref a) if a == "nowhere"));
}

#[test]
fn wrong_direction_is_a_mismatch_not_a_missing_link() {
    let channel = Channel::point_to_point(
        Some(rx(DummyReceiver::new("sensor"))),
        Some(tx(DummyTransmitter::new("actuator"))),
    )
    .unwrap();

    match channel.send_to(b"x", "sensor") {
        Err(CommsError::DirectionMismatch {
            address,
            direction,
            operation,
        }) => {
            assert_eq!(address, "sensor");
            assert_eq!(direction, Direction::Incoming);
            assert_eq!(operation, Operation::Send);
        }
        other => panic!("expected direction mismatch, got {:?}", other),
    }

    assert!(matches!(
        channel.receive_from("actuator"),
        Err(CommsError::DirectionMismatch {
            direction: Direction::Outgoing,
            operation: Operation::Receive,
            ..
        })
    ));
}

#[test]
fn point_to_point_round_trip() {
    let (sender, receiver) = loopback("cmd.out", "cmd.in");
    let channel = Channel::point_to_point(Some(rx(receiver)), Some(tx(sender))).unwrap();

    let msg = vec![0x00, 0xff, 0x10, b'a'];
    channel.send_to(&msg, "cmd.out").unwrap();
    assert_eq!(channel.receive_from("cmd.in").unwrap(), Some(msg));
}

#[test]
fn empty_receiver_yields_none_repeatedly() {
    let (_sender, receiver) = loopback("out", "in");
    let channel = Channel::point_to_point(Some(rx(receiver)), None).unwrap();
    for _ in 0..5 {
        assert_eq!(channel.receive_from("in").unwrap(), None);
    }
}

#[test]
fn fan_out_broadcast_reaches_every_transmitter() {
    let pairs: Vec<_> = (0..3)
        .map(|i| loopback(format!("out.{}", i), format!("probe.{}", i)))
        .collect();
    let transmitters: Vec<Arc<dyn Transmitter>> =
        pairs.iter().map(|(t, _)| tx(t.clone())).collect();
    let channel = Channel::fan_out(rx(DummyReceiver::new("in")), transmitters).unwrap();

    assert_eq!(channel.send(b"tick").unwrap(), 3);
    for (_, probe) in &pairs {
        assert_eq!(probe.receive().unwrap(), Some(b"tick".to_vec()));
    }
}

#[test]
fn broadcast_attempts_all_links_and_reports_failures() {
    let (good_a, probe_a) = loopback("a", "probe.a");
    let (good_b, probe_b) = loopback("b", "probe.b");
    let channel = Channel::builder()
        .transmitter(good_a)
        .transmitter(ScriptedTransmitter::new("radio", failing_sink()))
        .transmitter(good_b)
        .build()
        .unwrap();

    match channel.send(b"status") {
        Err(CommsError::PartialDelivery {
            delivered,
            failures,
        }) => {
            assert_eq!(delivered, 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "radio");
        }
        other => panic!("expected partial delivery, got {:?}", other),
    }
    assert_eq!(probe_a.receive().unwrap(), Some(b"status".to_vec()));
    assert_eq!(probe_b.receive().unwrap(), Some(b"status".to_vec()));
}

#[test]
fn transport_errors_pass_through_unchanged() {
    let channel = Channel::builder()
        .transmitter(ScriptedTransmitter::new("radio", failing_sink()))
        .build()
        .unwrap();

    match channel.send_to(b"x", "radio") {
        Err(CommsError::Transport { address, source }) => {
            assert_eq!(address, "radio");
            assert_eq!(source.to_string(), "link down");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[test]
fn send_to_delegates_exactly_once() {
    let mut sink = MockSink::new();
    sink.expect_send().times(1).returning(|m| {
        assert_eq!(m, b"once");
        Ok(())
    });
    let channel = Channel::builder()
        .transmitter(ScriptedTransmitter::new("radio", sink))
        .build()
        .unwrap();

    channel.send_to(b"once", "radio").unwrap();
}

#[test]
fn duplicate_addresses_are_rejected() {
    let result = Channel::new(
        vec![rx(DummyReceiver::new("shared"))],
        vec![tx(DummyTransmitter::new("shared"))],
    );
    assert!(matches!(result, Err(CommsError::DuplicateAddress(ref a)) if a == "shared"));
}

#[test]
fn fan_in_gathers_one_entry_per_receiver_in_order() {
    let (t0, r0) = loopback("t0", "r0");
    let (_t1, r1) = loopback("t1", "r1");
    let (t2, r2) = loopback("t2", "r2");
    t0.send(b"zero").unwrap();
    t2.send(b"two").unwrap();

    let channel = Channel::fan_in(
        vec![rx(r0), rx(r1), rx(r2)],
        tx(DummyTransmitter::new("reply")),
    )
    .unwrap();

    let gathered = channel.receive();
    let summary: Vec<(String, Option<Vec<u8>>)> = gathered
        .into_iter()
        .map(|(address, msg)| (address, msg.unwrap()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("r0".to_string(), Some(b"zero".to_vec())),
            ("r1".to_string(), None),
            ("r2".to_string(), Some(b"two".to_vec())),
        ]
    );

    // Snapshot poll: the next call sees the drained state.
    assert!(channel.receive().into_iter().all(|(_, m)| m.unwrap().is_none()));
}

#[test]
fn mesh_views_split_by_direction() {
    let (a, b) = duplex_pair("a", "b");
    let channel = Channel::builder()
        .receiver(DummyReceiver::new("in.0"))
        .receiver(DummyReceiver::new("in.1"))
        .transmitter(DummyTransmitter::new("out.0"))
        .duplex(a)
        .build()
        .unwrap();

    let incoming: Vec<&str> = channel.incoming_links().map(|l| l.address()).collect();
    let outgoing: Vec<&str> = channel.outgoing_links().map(|l| l.address()).collect();
    assert_eq!(incoming, vec!["in.0", "in.1", "a"]);
    assert_eq!(outgoing, vec!["out.0", "a"]);

    channel.send_to(b"ping", "a").unwrap();
    assert_eq!(b.receive().unwrap(), Some(b"ping".to_vec()));
    b.send(b"pong").unwrap();
    assert_eq!(channel.receive_from("a").unwrap(), Some(b"pong".to_vec()));
}

#[test]
fn mesh_routes_between_many_receivers_and_transmitters() {
    let (west_tx, west_rx) = loopback("west.out", "west.in");
    let (east_tx, east_rx) = loopback("east.out", "east.in");
    let channel = Channel::mesh(
        vec![rx(west_rx), rx(east_rx)],
        vec![tx(west_tx), tx(east_tx)],
    )
    .unwrap();

    assert_eq!(channel.len(), 4);
    let addresses: Vec<&str> = channel.addresses().collect();
    assert_eq!(addresses, vec!["west.in", "east.in", "west.out", "east.out"]);
    assert_eq!(channel.incoming_links().count(), 2);
    assert_eq!(channel.outgoing_links().count(), 2);

    assert_eq!(channel.send(b"all").unwrap(), 2);
    channel.send_to(b"east only", "east.out").unwrap();

    let gathered: Vec<_> = channel
        .receive()
        .into_iter()
        .map(|(address, message)| (address, message.unwrap()))
        .collect();
    assert_eq!(
        gathered,
        vec![
            ("west.in".to_string(), Some(b"all".to_vec())),
            ("east.in".to_string(), Some(b"all".to_vec())),
        ]
    );
    assert_eq!(
        channel.receive_from("east.in").unwrap(),
        Some(b"east only".to_vec())
    );
    assert!(matches!(
        channel.send_to(b"x", "west.in"),
        Err(CommsError::DirectionMismatch { .. })
    ));
}

#[test]
fn close_reaches_every_link_and_collects_failures() {
    let mut ok_sink = MockSink::new();
    ok_sink.expect_close().times(1).returning(|| Ok(()));
    let mut bad_sink = MockSink::new();
    bad_sink
        .expect_close()
        .times(1)
        .returning(|| Err(CommsError::transport("b", "already gone")));

    let channel = Channel::builder()
        .transmitter(ScriptedTransmitter::new("a", ok_sink))
        .transmitter(ScriptedTransmitter::new("b", bad_sink))
        .build()
        .unwrap();

    match channel.close() {
        Err(CommsError::CloseFailed { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "b");
        }
        other => panic!("expected close failure, got {:?}", other),
    }
}

#[test]
fn channel_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Channel>();
}
