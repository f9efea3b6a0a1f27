//! Scripted in-memory transport.
//!
//! Reads are served from per-endpoint queues; writes are recorded and may
//! feed a responder that synthesizes replies on [`COMMAND_IN`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::{BulkTransport, COMMAND_FRAME_SIZE, COMMAND_IN};

type Responder = Box<dyn FnMut(u8, &[u8]) -> Vec<Bytes> + Send>;

/// One scripted outcome of a `read` call.
#[derive(Debug, Clone)]
pub enum MockRead {
    /// A packet available immediately.
    Frame(Bytes),
    /// A packet that arrives after a delay. If the delay exceeds the read
    /// timeout, the read times out and the packet is lost.
    Delayed(Duration, Bytes),
    /// The read times out immediately.
    Timeout,
}

#[derive(Default)]
struct MockState {
    reads: HashMap<u8, VecDeque<MockRead>>,
    writes: Vec<(u8, Bytes)>,
    responder: Option<Responder>,
}

/// A [`BulkTransport`] driven by a script instead of a device.
///
/// An endpoint with an empty queue times out immediately.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers every command write with a zeroed response
    /// frame carrying the request's identifier.
    pub fn echoing() -> Self {
        Self::new().with_responder(|_, request| vec![echo_response(request)])
    }

    /// Install a responder called with every written packet; the packets it
    /// returns are queued on the command response endpoint.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(u8, &[u8]) -> Vec<Bytes> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
        self
    }

    /// Queue an immediately available packet on `endpoint`.
    pub fn push_frame(&self, endpoint: u8, frame: impl Into<Bytes>) {
        self.push(endpoint, MockRead::Frame(frame.into()));
    }

    /// Queue a packet that arrives after `delay`.
    pub fn push_delayed(&self, endpoint: u8, delay: Duration, frame: impl Into<Bytes>) {
        self.push(endpoint, MockRead::Delayed(delay, frame.into()));
    }

    /// Queue a read timeout.
    pub fn push_timeout(&self, endpoint: u8) {
        self.push(endpoint, MockRead::Timeout);
    }

    /// Queue an arbitrary scripted read.
    pub fn push(&self, endpoint: u8, read: MockRead) {
        self.lock()
            .reads
            .entry(endpoint)
            .or_default()
            .push_back(read);
    }

    /// Every packet written so far, in order.
    pub fn writes(&self) -> Vec<(u8, Bytes)> {
        self.lock().writes.clone()
    }

    /// Number of scripted reads still queued on `endpoint`.
    pub fn pending_reads(&self, endpoint: u8) -> usize {
        self.lock().reads.get(&endpoint).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BulkTransport for MockTransport {
    fn write(&self, endpoint: u8, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.writes.push((endpoint, Bytes::copy_from_slice(data)));

        let replies = match state.responder.as_mut() {
            Some(responder) => responder(endpoint, data),
            None => Vec::new(),
        };
        let queue = state.reads.entry(COMMAND_IN).or_default();
        queue.extend(replies.into_iter().map(MockRead::Frame));
        Ok(())
    }

    fn read(&self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Bytes> {
        // Never sleep while holding the lock: other endpoints stay readable.
        let next = self
            .lock()
            .reads
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);

        match next {
            Some(MockRead::Frame(frame)) => Ok(truncate(frame, max_len)),
            Some(MockRead::Delayed(delay, frame)) if delay <= timeout => {
                std::thread::sleep(delay);
                Ok(truncate(frame, max_len))
            }
            Some(MockRead::Delayed(..)) => {
                std::thread::sleep(timeout);
                Err(TransportError::Timeout { endpoint, timeout })
            }
            Some(MockRead::Timeout) | None => Err(TransportError::Timeout { endpoint, timeout }),
        }
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockTransport")
            .field("writes", &state.writes.len())
            .field("has_responder", &state.responder.is_some())
            .finish()
    }
}

/// Build a zeroed response frame echoing the identifier of `request`.
pub fn echo_response(request: &[u8]) -> Bytes {
    let mut frame = vec![0u8; COMMAND_FRAME_SIZE];
    if request.len() >= COMMAND_FRAME_SIZE {
        frame[COMMAND_FRAME_SIZE - 2..]
            .copy_from_slice(&request[COMMAND_FRAME_SIZE - 2..COMMAND_FRAME_SIZE]);
    }
    Bytes::from(frame)
}

fn truncate(mut frame: Bytes, max_len: usize) -> Bytes {
    frame.truncate(max_len);
    frame
}
