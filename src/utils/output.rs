/// Bounded output collection for a merged stdout+stderr stream
///
/// The collector thread keeps draining past the byte cap (discarding the
/// excess) so a chatty tool never blocks on a full pipe.
use crate::config::types::OutputIntegrity;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const CHUNK_SIZE: usize = 8192;

/// Collected stream contents
#[derive(Debug, Clone)]
pub struct CollectedOutput {
    pub bytes: Vec<u8>,
    pub integrity: OutputIntegrity,
    /// Bytes read from the stream, including discarded ones
    pub total_bytes: usize,
}

impl CollectedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Default)]
struct Shared {
    buffer: Vec<u8>,
    total_bytes: usize,
}

/// A collector thread that is still draining its stream
pub struct PendingOutput {
    shared: Arc<Mutex<Shared>>,
    done: Receiver<OutputIntegrity>,
    handle: Option<JoinHandle<()>>,
}

impl PendingOutput {
    /// Wait up to `timeout` for EOF and return what was collected.
    ///
    /// If the stream is still open afterwards (a descendant kept the pipe)
    /// the partial contents are returned as `Unterminated`.
    pub fn finish(mut self, timeout: Duration) -> CollectedOutput {
        let integrity = match self.done.recv_timeout(timeout) {
            Ok(integrity) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                integrity
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Output stream still open after {:?}, detaching collector", timeout);
                OutputIntegrity::Unterminated
            }
            Err(RecvTimeoutError::Disconnected) => OutputIntegrity::ReadError,
        };

        let mut shared = match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        CollectedOutput {
            bytes: std::mem::take(&mut shared.buffer),
            integrity,
            total_bytes: shared.total_bytes,
        }
    }
}

/// Output collector with a byte cap
#[derive(Debug, Clone)]
pub struct OutputCollector {
    limit: usize,
}

impl OutputCollector {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Start draining `stream` on a background thread
    pub fn spawn<R: Read + Send + 'static>(&self, stream: R) -> PendingOutput {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (tx, rx) = bounded(1);
        let limit = self.limit;
        let thread_shared = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            let integrity = drain(stream, limit, &thread_shared);
            let _ = tx.send(integrity);
        });

        PendingOutput {
            shared,
            done: rx,
            handle: Some(handle),
        }
    }
}

fn drain<R: Read>(mut stream: R, limit: usize, shared: &Mutex<Shared>) -> OutputIntegrity {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut integrity = OutputIntegrity::Complete;

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Failed to read stage output: {}", e);
                integrity = OutputIntegrity::ReadError;
                break;
            }
        };

        let mut guard = match shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.total_bytes += n;
        let room = limit.saturating_sub(guard.buffer.len());
        if room >= n {
            guard.buffer.extend_from_slice(&chunk[..n]);
        } else {
            guard.buffer.extend_from_slice(&chunk[..room]);
            integrity = OutputIntegrity::TruncatedByLimit;
        }
    }

    integrity
}
