use memchr::memmem;
use parking_lot::Mutex;

/// Bytes received from the device and not yet consumed by the caller.
///
/// The background reader is the only writer; callers consume from the front.
/// Every operation holds the lock for its whole append or scan-and-consume,
/// so bytes are never interleaved, lost or handed out twice.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    bytes: Mutex<Vec<u8>>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, data: &[u8]) {
        self.bytes.lock().extend_from_slice(data);
    }

    /// Remove and return everything before the first `terminator`.
    ///
    /// The terminator itself is dropped. `None` if it hasn't arrived yet,
    /// in which case the buffer is left untouched. An empty terminator never matches.
    pub fn read_until(&self, terminator: &[u8]) -> Option<Vec<u8>> {
        if terminator.is_empty() {
            return None;
        }
        let mut bytes = self.bytes.lock();
        let pos = memmem::find(&bytes[..], terminator)?;
        let mut line: Vec<u8> = bytes.drain(..pos + terminator.len()).collect();
        line.truncate(pos);
        Some(line)
    }

    /// Remove and return up to `max` bytes from the front.
    pub fn read(&self, max: usize) -> Vec<u8> {
        let mut bytes = self.bytes.lock();
        let n = max.min(bytes.len());
        bytes.drain(..n).collect()
    }

    pub fn take_all(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock())
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}
