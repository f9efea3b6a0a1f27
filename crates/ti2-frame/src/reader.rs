use std::time::Duration;

use ti2_transport::{BulkTransport, EVENT_FRAME_SIZE, EVENT_IN, MIN_TIMEOUT};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::status::{decode_status, StatusEvent};

/// Default time allowed for a status event to arrive.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads status events from the event endpoint.
///
/// Each call reads exactly one frame; nothing is buffered between calls.
/// The reader never touches the command endpoints, so it needs no
/// coordination with a [`CommandChannel`](crate::CommandChannel) sharing
/// the same device.
#[derive(Debug, Clone)]
pub struct EventReader<T> {
    transport: T,
}

impl<T: BulkTransport> EventReader<T> {
    /// Create a reader over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Read and decode the next status event (blocking).
    ///
    /// Returns [`FrameError::EventTimeout`] if no frame arrives within `timeout`.
    /// A timeout under [`MIN_TIMEOUT`] expires without touching the device.
    pub fn read_event(&self, timeout: Duration) -> Result<StatusEvent> {
        if timeout < MIN_TIMEOUT {
            return Err(FrameError::EventTimeout(timeout));
        }
        let frame = match self.transport.read(EVENT_IN, EVENT_FRAME_SIZE, timeout) {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => return Err(FrameError::EventTimeout(timeout)),
            Err(err) => return Err(err.into()),
        };
        let event = decode_status(&frame)?;
        trace!(?event, "status event");
        Ok(event)
    }

    /// An endless blocking iterator of status events.
    pub fn events(&self, timeout: Duration) -> Events<'_, T> {
        Events {
            reader: self,
            timeout,
        }
    }

    /// Wait for the instrument to settle.
    ///
    /// Reads a first event with `first_timeout`, then keeps reading with
    /// `idle`; the last event received before a read times out is returned.
    /// Returns [`FrameError::EventTimeout`] only if the first read times out.
    pub fn settle(&self, first_timeout: Duration, idle: Duration) -> Result<StatusEvent> {
        let mut status = self.read_event(first_timeout)?;
        let mut updates = 0usize;

        loop {
            match self.read_event(idle) {
                Ok(event) => {
                    status = event;
                    updates += 1;
                }
                Err(FrameError::EventTimeout(_)) => {
                    trace!(updates, "status settled");
                    return Ok(status);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }
}

/// Iterator returned by [`EventReader::events`]. Never returns `None`.
pub struct Events<'a, T> {
    reader: &'a EventReader<T>,
    timeout: Duration,
}

impl<T: BulkTransport> Iterator for Events<'_, T> {
    type Item = Result<StatusEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.reader.read_event(self.timeout))
    }
}
