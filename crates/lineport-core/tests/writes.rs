mod common;

use common::{open_mock, wait_until};
use pretty_assertions::assert_eq;

#[test]
fn writes_reach_the_wire_in_order() {
    let (channel, device) = open_mock();

    let messages: Vec<Vec<u8>> = (0..50).map(|i| format!("msg-{i};").into_bytes()).collect();
    for m in &messages {
        channel.write_bytes(m.clone()).unwrap();
    }
    wait_until(|| device.writes().len() == messages.len());

    assert_eq!(device.writes(), messages);
}

#[test]
fn write_str_queues_text() {
    let (channel, device) = open_mock();

    channel.write_str("Hello world\r\n").unwrap();
    wait_until(|| !device.wire().is_empty());

    assert_eq!(device.wire(), b"Hello world\r\n".to_vec());
}

#[test]
fn close_flushes_queued_writes() {
    let (channel, device) = open_mock();

    channel.write_bytes(b"one".to_vec()).unwrap();
    channel.write_bytes(b"two".as_slice()).unwrap();
    channel.close().unwrap();

    assert_eq!(device.wire(), b"onetwo".to_vec());
}
