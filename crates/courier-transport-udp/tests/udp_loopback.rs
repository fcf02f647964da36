use std::net::UdpSocket;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use courier_codec::message::{decode_message_cbor, encode_message_cbor};
use courier_core::Message;
use courier_engine::{DeliveryEngine, EngineConfig, Outcome};
use courier_transport::{Inbound, RelayTransport};
use courier_transport_udp::{UdpTransport, UdpTransportConfig};

fn loopback_transport() -> UdpTransport {
    UdpTransport::bind(UdpTransportConfig::new("127.0.0.1:0", "127.0.0.1:0"))
        .expect("udp transport should bind")
}

fn peer_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("peer socket should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(3)))
        .expect("read timeout should apply");
    socket
}

fn recv_message(socket: &UdpSocket) -> (Message, std::net::SocketAddr) {
    let mut buf = vec![0_u8; 64 * 1024];
    let (len, src) = socket.recv_from(&mut buf).expect("datagram expected");
    let msg = decode_message_cbor(&buf[..len]).expect("datagram should decode");
    (msg, src)
}

#[test]
fn local_producer_messages_and_notifications_use_loopback_socket() {
    let mut transport = loopback_transport();
    let producer = peer_socket();

    let bytes = encode_message_cbor(&Message::new("INFO-2", "hello")).expect("encode");
    producer
        .send_to(&bytes, transport.local_addr())
        .expect("producer send");

    let msg = transport
        .receive_local()
        .expect("receive_local should succeed")
        .expect("local message expected");
    assert_eq!(msg.kind, "INFO-2");
    assert_eq!(msg.payload.as_bytes(), b"hello");
    assert_eq!(
        msg.origin,
        Some(producer.local_addr().expect("addr").to_string())
    );

    transport
        .send_local(&Message::new("ERROR", "unknown command: INFO-9"))
        .expect("send_local should queue");
    let (note, _) = recv_message(&producer);
    assert!(note.is_error());
    assert_eq!(transport.health_snapshot().local_received, 1);
}

#[test]
fn remote_sends_are_stamped_and_echoes_carry_receiver_origin() {
    let mut transport = loopback_transport();
    let receiver = peer_socket();
    let receiver_addr = receiver.local_addr().expect("addr").to_string();

    let msg = Message::new("INFO-3", "payload").with_destination(receiver_addr.clone());
    transport
        .send(&msg, &receiver_addr)
        .expect("send should queue");

    let (seen, src) = recv_message(&receiver);
    assert_eq!(src, transport.remote_addr());
    assert_eq!(seen.origin.as_deref(), Some(transport.identity()));
    assert_eq!(seen.destination.as_deref(), Some(receiver_addr.as_str()));

    let echo = encode_message_cbor(&seen).expect("encode echo");
    receiver.send_to(&echo, src).expect("echo send");

    let event = transport
        .receive(Duration::from_secs(3))
        .expect("receive should succeed")
        .expect("echo expected");
    assert_eq!(event, Inbound::Remote(msg.acknowledgment_from(receiver_addr)));
}

#[test]
fn undecodable_datagrams_are_dropped_silently() {
    let mut transport = loopback_transport();
    let receiver = peer_socket();

    receiver
        .send_to(&[0xff, 0x00, 0x01], transport.remote_addr())
        .expect("garbage send");
    let valid = encode_message_cbor(&Message::new("INFO-2", "ok")).expect("encode");
    receiver
        .send_to(&valid, transport.remote_addr())
        .expect("valid send");

    let event = transport
        .receive(Duration::from_secs(3))
        .expect("receive should succeed")
        .expect("valid datagram expected");
    assert_eq!(event.message().payload.as_bytes(), b"ok");
    assert_eq!(transport.health_snapshot().inbound_dropped, 1);
}

#[test]
fn remote_events_arriving_while_idle_are_kept_for_receive() {
    let mut transport = loopback_transport();
    let receiver = peer_socket();
    let producer = peer_socket();

    let ack = encode_message_cbor(&Message::new("INFO-2", "late ack")).expect("encode");
    receiver
        .send_to(&ack, transport.remote_addr())
        .expect("ack send");
    thread::sleep(Duration::from_millis(50));
    let local = encode_message_cbor(&Message::new("INFO-1", "next")).expect("encode");
    producer
        .send_to(&local, transport.local_addr())
        .expect("local send");

    let msg = transport
        .receive_local()
        .expect("receive_local should succeed")
        .expect("local message expected");
    assert_eq!(msg.payload.as_bytes(), b"next");

    let event = transport
        .receive(Duration::from_secs(3))
        .expect("receive should succeed")
        .expect("stashed ack expected");
    assert!(!event.is_local());
    assert_eq!(event.message().payload.as_bytes(), b"late ack");
}

#[test]
fn shutdown_flag_reports_closed_producer() {
    let mut transport = loopback_transport();
    transport.shutdown_flag().store(true, Ordering::Relaxed);
    assert_eq!(transport.receive_local().expect("receive_local"), None);
}

#[test]
fn engine_retries_over_udp_until_receiver_echoes() {
    let receiver = peer_socket();
    receiver
        .set_read_timeout(Some(Duration::from_secs(1)))
        .expect("read timeout should apply");
    let target = receiver.local_addr().expect("addr").to_string();

    // Drops the first datagram, echoes everything after it.
    let echo = thread::spawn(move || {
        let mut buf = vec![0_u8; 64 * 1024];
        let mut seen = 0_usize;
        while let Ok((len, src)) = receiver.recv_from(&mut buf) {
            seen += 1;
            if seen > 1 {
                let _ = receiver.send_to(&buf[..len], src);
            }
        }
        seen
    });

    let mut engine = DeliveryEngine::new(
        loopback_transport(),
        target,
        EngineConfig::with_ack_timeout(Duration::from_millis(200)),
    );
    let msg = Message::new("INFO-2", "over the wire");
    let report = engine.submit(msg.clone()).expect("submit should settle");

    match report.outcomes.as_slice() {
        [Outcome::Acknowledged {
            message, attempts, ..
        }] => {
            assert_eq!(message, &msg);
            assert!(*attempts >= 2, "first attempt was dropped");
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }

    drop(engine);
    let seen = echo.join().expect("echo thread should finish");
    assert!(seen >= 2);
}

#[test]
fn engine_reports_unknown_guarantee_to_local_producer_over_udp() {
    let producer = peer_socket();
    let mut engine = DeliveryEngine::new(
        loopback_transport(),
        "127.0.0.1:9",
        EngineConfig::default(),
    );
    let local_addr = engine.transport().local_addr();

    let bytes = encode_message_cbor(&Message::new("INFO-9", "?")).expect("encode");
    producer.send_to(&bytes, local_addr).expect("producer send");

    let report = engine
        .step()
        .expect("step should succeed")
        .expect("producer message expected");
    assert!(matches!(report.outcomes[0], Outcome::Rejected { .. }));

    let (note, _) = recv_message(&producer);
    assert!(note.is_error());
    assert_eq!(note.payload.as_bytes(), b"unknown command: INFO-9");
    assert_eq!(engine.stats().remote_sends, 0);
}
