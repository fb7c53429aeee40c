mod common;

use common::{open_mock, wait_for_rx};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn ack_arrives_while_idle() {
    let (channel, device) = open_mock();

    device.feed(b"ACK\r");
    wait_for_rx(&channel, 4);

    assert_eq!(channel.read_line_if_available(b"\r").unwrap(), Some(b"ACK".to_vec()));
    assert_eq!(channel.read_line_if_available(b"\r").unwrap(), None);
}

#[test]
fn line_split_across_chunks() {
    let (channel, device) = open_mock();

    device.feed(b"A");
    device.feed(b"CK\r");
    wait_for_rx(&channel, 4);

    assert_eq!(channel.read_line_if_available(b"\r").unwrap(), Some(b"ACK".to_vec()));
}

#[test]
fn polling_before_terminator_returns_nothing() {
    let (channel, device) = open_mock();

    for _ in 0..10 {
        assert_eq!(channel.read_line_if_available(b"\r").unwrap(), None);
    }

    device.feed(b"partial");
    wait_for_rx(&channel, 7);
    for _ in 0..10 {
        assert_eq!(channel.read_line_if_available(b"\r").unwrap(), None);
    }
    assert_eq!(channel.available().unwrap(), 7);

    device.feed(b" line\rnext");
    wait_for_rx(&channel, 17);
    assert_eq!(
        channel.read_line_if_available(b"\r").unwrap(),
        Some(b"partial line".to_vec())
    );
    assert_eq!(channel.available().unwrap(), 4);
}

#[test]
fn consecutive_segments() {
    let (channel, device) = open_mock();

    device.feed(b"first\r\nsecond\r\ntail");
    wait_for_rx(&channel, 19);

    assert_eq!(channel.read_line_if_available(b"\r\n").unwrap(), Some(b"first".to_vec()));
    assert_eq!(channel.read_line_if_available(b"\r\n").unwrap(), Some(b"second".to_vec()));
    assert_eq!(channel.read_line_if_available(b"\r\n").unwrap(), None);
    assert_eq!(channel.read_string().unwrap(), "tail");
}

#[test]
fn concurrent_polling_sees_every_line_once() {
    let (channel, device) = open_mock();
    let channel = Arc::new(channel);

    const LINES: usize = 200;
    let feeder = thread::spawn(move || {
        for i in 0..LINES {
            device.feed(format!("line {i}\n").as_bytes());
        }
        device
    });

    let mut got = Vec::new();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while got.len() < LINES {
        assert!(std::time::Instant::now() < deadline, "only got {} lines", got.len());
        match channel.read_line_if_available(b"\n").unwrap() {
            Some(line) => got.push(String::from_utf8(line).unwrap()),
            None => thread::yield_now(),
        }
    }
    let _device = feeder.join().unwrap();

    let expected: Vec<String> = (0..LINES).map(|i| format!("line {i}")).collect();
    assert_eq!(got, expected);
    assert_eq!(channel.read_line_if_available(b"\n").unwrap(), None);
}
