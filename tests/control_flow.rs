//! End to end control-channel flow over the public API: bind, listen,
//! decode, dispatch, drain, forward.
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::sync::mpsc;
use std::time::Duration;

use vjserver_rust::common::session::ChannelSink;
use vjserver_rust::control::receiver::{ControlReceiver, Transport};
use vjserver_rust::control::state::{drain_events, ControlEvent, ControlState};
use vjserver_rust::control::surface::{register_control_surface, SurfaceConfig};

fn send(port: u16, addr: &str, args: Vec<OscType>) {
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let data = encoder::encode(&OscPacket::Message(OscMessage {
        addr: String::from(addr),
        args,
    }))
    .unwrap();
    sender.send_to(&data, ("127.0.0.1", port)).unwrap();
}

#[test]
fn udp_control_flow_end_to_end() {
    let (event_tx, event_rx) = mpsc::channel();
    let mut receiver = ControlReceiver::new(Transport::Udp);
    register_control_surface(&mut receiver, event_tx, SurfaceConfig::default());
    receiver.bind(0).unwrap();
    let port = receiver.local_port().unwrap();
    let listener = receiver.listen(|_err| true).unwrap();

    // cursor update
    send(port, "/mousemove/1", vec![OscType::Int(150), OscType::Int(200)]);
    // tempo forward
    send(
        port,
        "/link/",
        vec![
            OscType::Double(120.0),
            OscType::Double(2.0),
            OscType::Double(0.5),
        ],
    );

    // collect both events, order-independent (two datagrams)
    let mut events = Vec::new();
    for _ in 0..2 {
        events.push(event_rx.recv_timeout(Duration::from_secs(2)).unwrap());
    }

    let (sink, session_rx) = ChannelSink::new();
    let (replay_tx, replay_rx) = mpsc::channel();
    for event in events {
        replay_tx.send(event).unwrap();
    }
    let mut state = ControlState::new();
    let handled = drain_events(&replay_rx, &mut state, &sink);
    assert_eq!(handled, 2);

    // the cursor state took the raw pixel coordinates
    assert_eq!(state.cursor, (150, 200));

    // the session saw exactly the documented payload shape
    let text = session_rx.try_recv().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let params = parsed["params"].as_array().unwrap();
    assert_eq!(params.len(), 3);
    assert_eq!(params[0]["name"], 100);
    assert_eq!(params[0]["value"], 120.0);
    assert_eq!(params[1]["name"], 101);
    assert_eq!(params[1]["value"], 2.0);
    assert_eq!(params[2]["name"], 102);
    assert_eq!(params[2]["value"], 0.5);

    listener.stop();
}

#[test]
fn unmatched_traffic_is_counted_not_fatal() {
    let (event_tx, event_rx) = mpsc::channel();
    let mut receiver = ControlReceiver::new(Transport::Udp);
    register_control_surface(&mut receiver, event_tx, SurfaceConfig::default());
    receiver.bind(0).unwrap();
    let port = receiver.local_port().unwrap();
    let listener = receiver.listen(|_err| true).unwrap();

    // single-segment address matches nothing (the catch-all needs two)
    send(port, "/mystery", vec![OscType::Int(1)]);
    // listener keeps running: a real message still arrives afterwards
    send(port, "/kv2status", vec![OscType::String(String::from("Tracking"))]);

    let event = event_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event, ControlEvent::TrackerStatus(String::from("Tracking")));
    let mut counted = false;
    for _ in 0..100 {
        if listener.unmatched_count() == 1 {
            counted = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(counted, "unmatched message was never counted");

    listener.stop();
}
