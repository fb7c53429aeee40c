use crate::buffer::ReceiveBuffer;
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::transport::{is_idle, SerialTransport, Transport};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const READ_CHUNK: usize = 4096;

/// State shared between the caller and the workers.
#[derive(Debug)]
struct Shared {
    buffer: ReceiveBuffer,
    open: AtomicBool,
    /// First background I/O failure, kept until the caller sees it.
    failure: Mutex<Option<io::Error>>,
}

impl Shared {
    fn fail(&self, e: io::Error) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(e);
        }
        self.open.store(false, Ordering::Release);
    }

    fn check(&self) -> Result<()> {
        let mut failure = self.failure.lock();
        if let Some(e) = failure.take() {
            return Err(ChannelError::Io(e));
        }
        if !self.open.load(Ordering::Acquire) {
            return Err(ChannelError::closed());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Workers {
    tx: Sender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// A serial connection that writes in the background and buffers everything it receives.
///
/// Writes are queued and transmitted in call order by a writer thread. A reader
/// thread keeps appending incoming bytes to a [`ReceiveBuffer`], which the caller
/// polls with [`read_line_if_available`](Self::read_line_if_available) and friends.
/// None of the read calls ever wait for data.
#[derive(Debug)]
pub struct AsyncLineChannel {
    port_name: String,
    baud_rate: u32,
    shared: Arc<Shared>,
    workers: Mutex<Option<Workers>>,
}

impl AsyncLineChannel {
    pub fn open(cfg: &ChannelConfig) -> Result<Self> {
        if cfg.baud_rate == 0 {
            return Err(ChannelError::Connection(format!(
                "invalid baud rate {} for {}",
                cfg.baud_rate, cfg.port_name
            )));
        }
        debug!("opening {} at {} baud", cfg.port_name, cfg.baud_rate);

        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.effective_poll_interval())
            .open()
            .map_err(|e| ChannelError::Connection(format!("open {} failed: {e}", cfg.port_name)))?;

        Self::from_transport(&cfg.port_name, cfg.baud_rate, SerialTransport::new(port))
    }

    /// Run a channel over an already opened transport.
    pub fn from_transport<T: Transport>(port_name: &str, baud_rate: u32, transport: T) -> Result<Self> {
        let read_side = transport
            .try_clone()
            .map_err(|e| ChannelError::Connection(format!("clone {port_name} failed: {e}")))?;

        let shared = Arc::new(Shared {
            buffer: ReceiveBuffer::new(),
            open: AtomicBool::new(true),
            failure: Mutex::new(None),
        });
        let (tx, rx) = unbounded::<Vec<u8>>();

        let reader = {
            let rx_shared = shared.clone();
            thread::Builder::new()
                .name(format!("lineport-rx:{port_name}"))
                .spawn(move || read_loop(read_side, rx_shared))
                .map_err(|e| ChannelError::Connection(format!("spawn reader failed: {e}")))?
        };
        let writer = {
            let tx_shared = shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("lineport-tx:{port_name}"))
                .spawn(move || write_loop(Box::new(transport), rx, tx_shared));
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    shared.open.store(false, Ordering::Release);
                    let _ = reader.join();
                    return Err(ChannelError::Connection(format!("spawn writer failed: {e}")));
                }
            }
        };

        debug!("{port_name} open");
        Ok(Self {
            port_name: port_name.to_string(),
            baud_rate,
            shared,
            workers: Mutex::new(Some(Workers { tx, reader, writer })),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire) && self.workers.lock().is_some()
    }

    /// Queue `data` for transmission and return without waiting for the device.
    pub fn write_bytes(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.shared.check()?;
        let workers = self.workers.lock();
        let workers = workers.as_ref().ok_or_else(ChannelError::closed)?;
        workers.tx.send(data.into()).map_err(|_| ChannelError::closed())
    }

    pub fn write_str(&self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Take the next line ending in `terminator`, if it has fully arrived.
    ///
    /// Returns `None` straight away otherwise; whatever has accumulated stays
    /// buffered for the next call.
    pub fn read_line_if_available(&self, terminator: &[u8]) -> Result<Option<Vec<u8>>> {
        self.shared.check()?;
        Ok(self.shared.buffer.read_until(terminator))
    }

    /// Like [`read_line_if_available`](Self::read_line_if_available), but as text.
    /// An empty string means no complete line yet.
    pub fn read_string_until(&self, terminator: &str) -> Result<String> {
        let line = self.read_line_if_available(terminator.as_bytes())?;
        Ok(line
            .map(|l| String::from_utf8_lossy(&l).into_owned())
            .unwrap_or_default())
    }

    /// Take up to `max` buffered bytes.
    pub fn read(&self, max: usize) -> Result<Vec<u8>> {
        self.shared.check()?;
        Ok(self.shared.buffer.read(max))
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        self.shared.check()?;
        Ok(self.shared.buffer.take_all())
    }

    pub fn read_string(&self) -> Result<String> {
        let bytes = self.read_all()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Bytes received but not read yet.
    pub fn available(&self) -> Result<usize> {
        self.shared.check()?;
        Ok(self.shared.buffer.len())
    }

    /// Stop both workers and release the device.
    ///
    /// Writes queued before the call are still transmitted. A background
    /// failure that nobody has seen yet is returned here. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(workers) = self.workers.lock().take() else {
            return Ok(());
        };
        let Workers { tx, reader, writer } = workers;

        self.shared.open.store(false, Ordering::Release);
        drop(tx);
        if writer.join().is_err() {
            warn!("{} writer panicked", self.port_name);
        }
        if reader.join().is_err() {
            warn!("{} reader panicked", self.port_name);
        }
        self.shared.buffer.clear();
        debug!("{} closed", self.port_name);

        match self.shared.failure.lock().take() {
            Some(e) => Err(ChannelError::Io(e)),
            None => Ok(()),
        }
    }
}

impl Drop for AsyncLineChannel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("{} closed with pending error: {e}", self.port_name);
        }
    }
}

fn read_loop(mut port: Box<dyn Transport>, shared: Arc<Shared>) {
    let mut buf = [0u8; READ_CHUNK];
    while shared.open.load(Ordering::Acquire) {
        match port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                trace!("rx {n} bytes: {:?}", &buf[..n.min(32)]);
                shared.buffer.append(&buf[..n]);
            }
            Err(e) if is_idle(&e) => {}
            Err(e) => {
                error!("read failed, stopping: {e}");
                shared.fail(e);
                break;
            }
        }
    }
    trace!("reader exit");
}

fn write_loop(mut port: Box<dyn Transport>, rx: Receiver<Vec<u8>>, shared: Arc<Shared>) {
    for data in rx.iter() {
        if let Err(e) = port.write_all(&data) {
            error!("write failed, stopping: {e}");
            shared.fail(e);
            break;
        }
        trace!("tx {} bytes", data.len());
    }
    trace!("writer exit");
}
