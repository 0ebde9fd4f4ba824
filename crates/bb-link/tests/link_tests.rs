//! End-to-end tests for two links joined by a loopback transport

use bb_link::{LinkState, LinkTransport, LoopbackTransport, MultiplayerLink, MAX_FRAME_SIZE};
use std::cell::RefCell;
use std::rc::Rc;

fn joined_pair() -> (MultiplayerLink, MultiplayerLink, LoopbackTransport) {
    let (a, b) = LoopbackTransport::pair();
    let handle = a.clone();

    let mut left = MultiplayerLink::new();
    let mut right = MultiplayerLink::new();
    left.attach_transport(Box::new(a));
    right.attach_transport(Box::new(b));
    (left, right, handle)
}

fn connect(left: &mut MultiplayerLink, right: &mut MultiplayerLink) {
    left.set_enabled(true);
    right.set_enabled(true);
    // request/reply exchange
    left.update();
    right.update();
    left.update();
}

fn collector(link: &mut MultiplayerLink) -> Rc<RefCell<Vec<Vec<u8>>>> {
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    link.set_message_handler(move |data| sink.borrow_mut().push(data.to_vec()));
    received
}

#[test]
fn test_handshake_connects_both_sides() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);

    assert!(left.is_connected());
    assert!(right.is_connected());
    assert_eq!(left.state(), LinkState::Connected);
}

#[test]
fn test_one_side_enabled_stays_disconnected() {
    let (mut left, mut right, _) = joined_pair();
    left.set_enabled(true);
    right.update();
    left.update();

    assert!(!left.is_connected());
    assert_eq!(left.state(), LinkState::Disconnected);
    assert_eq!(right.state(), LinkState::Disabled);
}

#[test]
fn test_messages_delivered_in_order_once() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);
    let received = collector(&mut right);

    left.send_message(b"one");
    left.send_message(b"two");
    left.send_message(b"three");
    right.update();
    right.update();

    assert_eq!(
        *received.borrow(),
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
    assert_eq!(left.stats().frames_sent, 3);
    assert_eq!(right.stats().frames_received, 3);
}

#[test]
fn test_disabled_link_sends_nothing() {
    let (local, peer) = LoopbackTransport::pair();
    let mut link = MultiplayerLink::new();
    link.attach_transport(Box::new(local));

    link.send_message(&[0u8; 10]);
    link.update();

    assert_eq!(peer.pending(), 0);
    assert!(!link.is_connected());
}

#[test]
fn test_never_transmits_while_disconnected() {
    let (mut left, mut right, _) = joined_pair();
    left.set_enabled(true);
    right.update();
    left.update();

    let received = collector(&mut right);
    left.send_message(b"lost");
    right.update();

    assert!(received.borrow().is_empty());
    assert_eq!(left.stats().frames_dropped, 1);
}

#[test]
fn test_oversized_frame_dropped() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);
    let received = collector(&mut right);

    left.send_message(&vec![7u8; MAX_FRAME_SIZE + 1]);
    left.send_message(&vec![7u8; MAX_FRAME_SIZE]);
    right.update();

    assert_eq!(received.borrow().len(), 1);
    assert_eq!(received.borrow()[0].len(), MAX_FRAME_SIZE);
    assert_eq!(left.stats().frames_dropped, 1);
}

#[test]
fn test_disable_forces_disconnect() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);

    left.set_enabled(false);
    assert!(!left.is_connected());
    assert_eq!(left.state(), LinkState::Disabled);

    // the peer learns about it on its next update
    right.update();
    assert!(!right.is_connected());
    assert_eq!(right.state(), LinkState::Disconnected);
}

#[test]
fn test_reenable_reconnects() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);
    left.set_enabled(false);
    right.update();

    left.set_enabled(true);
    right.update();
    left.update();

    assert!(left.is_connected());
    assert!(right.is_connected());
}

#[test]
fn test_detach_transport_disconnects() {
    let (mut left, mut right, _) = joined_pair();
    connect(&mut left, &mut right);

    let transport = left.detach_transport();
    assert!(transport.is_some());
    assert!(left.is_enabled());
    assert_eq!(left.state(), LinkState::Disconnected);

    left.send_message(b"lost");
    assert_eq!(left.stats().frames_dropped, 1);
    assert!(left.detach_transport().is_none());

    // reattaching starts a fresh handshake
    left.attach_transport(transport.unwrap());
    right.update();
    left.update();
    assert!(left.is_connected());
}

#[test]
fn test_transport_close_disconnects() {
    let (mut left, mut right, handle) = joined_pair();
    connect(&mut left, &mut right);

    handle.close();
    assert!(!handle.is_open());
    left.update();
    right.update();

    assert!(!left.is_connected());
    assert!(!right.is_connected());
    assert_eq!(left.state(), LinkState::Disconnected);
}

#[test]
fn test_frames_received_while_disabled_are_not_delivered() {
    let (peer_end, local) = LoopbackTransport::pair();
    let mut link = MultiplayerLink::new();
    link.attach_transport(Box::new(local));
    let received = collector(&mut link);

    let mut peer = peer_end;
    peer.write_packet(b"32BLMLTI\x02").unwrap();
    peer.write_packet(b"32BLUSER\x03\x00abc").unwrap();
    link.update();

    assert!(received.borrow().is_empty());
    assert_eq!(link.stats().frames_dropped, 1);
}
