//! Byte-level access to a device.
//!
//! The channel owns two handles to the same device, one per worker, obtained
//! through [`Transport::try_clone`]. Reads are expected to time out
//! periodically so the reader can notice that the channel was closed.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub trait Transport: Send + 'static {
    /// Read whatever is available. Timeouts are reported as `TimedOut`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// A second handle to the same device.
    fn try_clone(&self) -> io::Result<Box<dyn Transport>>;
}

/// `true` for errors that only mean "nothing arrived during this poll".
pub(crate) fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
        let port = self.port.try_clone()?;
        Ok(Box::new(SerialTransport::new(port)))
    }
}

#[derive(Debug)]
struct MockState {
    written: Mutex<Vec<Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    handles: AtomicUsize,
}

/// In-memory device used in place of a serial port.
///
/// Created together with a [`MockDevice`], which plays the other end of the wire.
#[derive(Debug)]
pub struct MockTransport {
    inbound: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    read_timeout: Duration,
    state: Arc<MockState>,
}

/// The far end of a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockDevice {
    inbound: Sender<Vec<u8>>,
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> (Self, MockDevice) {
        let (tx, rx) = unbounded();
        let state = Arc::new(MockState {
            written: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            handles: AtomicUsize::new(1),
        });
        let transport = Self {
            inbound: rx,
            pending: Vec::new(),
            read_timeout: Duration::from_millis(5),
            state: state.clone(),
        };
        (transport, MockDevice { inbound: tx, state })
    }

    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.pending.is_empty() {
            return Ok(self.drain_pending(buf));
        }
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        match self.inbound.recv_timeout(self.read_timeout) {
            Ok(chunk) => {
                self.pending = chunk;
                Ok(self.drain_pending(buf))
            }
            Err(RecvTimeoutError::Timeout) => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
            Err(RecvTimeoutError::Disconnected) => {
                // device side dropped: nothing will ever arrive, but keep the poll cadence
                std::thread::sleep(self.read_timeout);
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        self.state.written.lock().push(data.to_vec());
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
        self.state.handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockTransport {
            inbound: self.inbound.clone(),
            pending: Vec::new(),
            read_timeout: self.read_timeout,
            state: self.state.clone(),
        }))
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockDevice {
    /// Bytes the device sends towards the channel.
    pub fn feed(&self, data: &[u8]) {
        let _ = self.inbound.send(data.to_vec());
    }

    /// Each completed write, in the order it reached the wire.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.written.lock().clone()
    }

    /// All written bytes concatenated.
    pub fn wire(&self) -> Vec<u8> {
        self.state.written.lock().concat()
    }

    pub fn fail_reads(&self) {
        self.state.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.state.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Number of transport handles still alive.
    pub fn open_handles(&self) -> usize {
        self.state.handles.load(Ordering::SeqCst)
    }
}
