#![allow(dead_code)]

use lineport_core::{AsyncLineChannel, MockDevice, MockTransport};
use std::thread;
use std::time::{Duration, Instant};

pub fn open_mock() -> (AsyncLineChannel, MockDevice) {
    let (port, device) = MockTransport::new();
    let channel = AsyncLineChannel::from_transport("MOCK0", 9600, port).expect("mock channel opens");
    (channel, device)
}

/// Block until at least `n` bytes are buffered.
pub fn wait_for_rx(channel: &AsyncLineChannel, n: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while channel.available().expect("channel open") < n {
        assert!(Instant::now() < deadline, "timed out waiting for {n} bytes");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Block until `cond` holds.
pub fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(1));
    }
}
