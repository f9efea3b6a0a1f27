use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use ti2_transport::{BulkTransport, COMMAND_FRAME_SIZE, COMMAND_IN, COMMAND_OUT, MIN_TIMEOUT};
use tracing::{debug, trace, warn};

use crate::codec::{encode_call, encode_request, response_id};
use crate::command::Command;
use crate::error::{FrameError, Result};
use crate::sequence::Sequencer;

/// Default time allowed for a matching response to arrive.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// How the response timeout is applied while discarding stale frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseDeadline {
    /// One budget for the whole wait. A trickle of stale frames cannot extend
    /// the wait past `response_timeout`.
    #[default]
    Overall,
    /// Every read gets the full `response_timeout`.
    PerRead,
}

/// Configuration for the command channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Time allowed for a matching response. Default: 10 s.
    pub response_timeout: Duration,
    /// How the timeout applies across discarded frames.
    pub deadline: ResponseDeadline,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            deadline: ResponseDeadline::default(),
        }
    }
}

/// Issues requests and correlates their responses by identifier.
///
/// One request is in flight at a time: `issue` takes `&mut self` and only
/// returns once the matching response has been read or the wait timed out.
/// Responses carrying any other identifier are stale and are discarded.
pub struct CommandChannel<T> {
    transport: T,
    sequencer: Sequencer,
    config: ChannelConfig,
    buf: BytesMut,
}

impl<T: BulkTransport> CommandChannel<T> {
    /// Create a channel with default configuration and a random first identifier.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ChannelConfig::default())
    }

    /// Create a channel with explicit configuration.
    pub fn with_config(transport: T, config: ChannelConfig) -> Self {
        Self::with_sequencer(transport, Sequencer::new(), config)
    }

    /// Create a channel with an explicit sequencer.
    pub fn with_sequencer(transport: T, sequencer: Sequencer, config: ChannelConfig) -> Self {
        Self {
            transport,
            sequencer,
            config,
            buf: BytesMut::with_capacity(COMMAND_FRAME_SIZE),
        }
    }

    /// Frame `payload`, write it, and block until the matching response arrives.
    ///
    /// Returns the complete response frame.
    pub fn issue(&mut self, payload: &[u8]) -> Result<Bytes> {
        let id = self.sequencer.next_id();

        self.buf.clear();
        encode_request(payload, id, &mut self.buf)?;

        debug!(id, len = payload.len(), "writing request");
        self.transport.write(COMMAND_OUT, &self.buf)?;

        self.await_response(id)
    }

    /// Issue a call envelope with the given call type and argument.
    pub fn call(&mut self, call_type: u8, argument: &[u8]) -> Result<Bytes> {
        let payload = encode_call(call_type, argument)?;
        self.issue(&payload)
    }

    /// Issue a state-changing command.
    pub fn send(&mut self, command: Command) -> Result<Bytes> {
        let payload = command.encode()?;
        self.issue(&payload)
    }

    fn await_response(&self, id: u16) -> Result<Bytes> {
        let timeout = self.config.response_timeout;
        let deadline = Instant::now() + timeout;
        let mut discarded = 0usize;

        loop {
            let wait = match self.config.deadline {
                ResponseDeadline::Overall => deadline.saturating_duration_since(Instant::now()),
                ResponseDeadline::PerRead => timeout,
            };
            // A shorter read would round down to an unlimited libusb wait.
            if wait < MIN_TIMEOUT {
                warn!(id, discarded, "no matching response before deadline");
                return Err(FrameError::RequestTimeout(timeout));
            }

            let frame = match self.transport.read(COMMAND_IN, COMMAND_FRAME_SIZE, wait) {
                Ok(frame) => frame,
                Err(err) if err.is_timeout() => {
                    warn!(id, discarded, "timed out waiting for response");
                    return Err(FrameError::RequestTimeout(timeout));
                }
                Err(err) => return Err(err.into()),
            };

            let received = response_id(&frame)?;
            if received == id {
                return Ok(frame);
            }

            discarded += 1;
            trace!(expected = id, received, "discarding stale response");
        }
    }

    /// The identifier the next request will carry.
    pub fn next_id(&self) -> u16 {
        self.sequencer.peek()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Consume the channel and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Current channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}
