use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use ti2_frame::{EventReader, StatusEvent};
use ti2_transport::BulkTransport;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::microscope::check_timeout;

type PendingRead = JoinHandle<ti2_frame::Result<StatusEvent>>;

/// An endless stream of status events.
///
/// Each item is one event frame read with the configured timeout. A timeout
/// yields [`ScopeError::NoStatus`](crate::ScopeError::NoStatus) and the
/// stream continues; it never ends on its own. A timeout shorter than a
/// millisecond yields [`ScopeError::OutOfRange`](crate::ScopeError::OutOfRange)
/// without reading.
///
/// Dropping the stream, or a pending [`next_event`](Self::next_event)
/// future, does not stop a read already in progress: it runs to completion
/// on the blocking pool and the event it returns, if any, is discarded.
///
/// Events are neither buffered nor deduplicated; a consumer that falls
/// behind sees whatever the device delivers next.
pub struct EventStream<T> {
    reader: EventReader<Arc<T>>,
    timeout: Duration,
    pending: Option<PendingRead>,
}

impl<T: BulkTransport + 'static> EventStream<T> {
    pub(crate) fn new(reader: EventReader<Arc<T>>, timeout: Duration) -> Self {
        Self {
            reader,
            timeout,
            pending: None,
        }
    }

    /// Change the per-event timeout. Applies from the next read on.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-event timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the next status event.
    pub async fn next_event(&mut self) -> Result<StatusEvent> {
        poll_fn(|cx| self.poll_event(cx)).await
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Result<StatusEvent>> {
        let mut read = match self.pending.take() {
            Some(read) => read,
            None => {
                if let Err(err) = check_timeout("event_timeout", self.timeout) {
                    return Poll::Ready(Err(err));
                }
                let reader = self.reader.clone();
                let timeout = self.timeout;
                tokio::task::spawn_blocking(move || reader.read_event(timeout))
            }
        };

        match Pin::new(&mut read).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result.map_err(Into::into)),
            Poll::Ready(Err(err)) => Poll::Ready(Err(err.into())),
            Poll::Pending => {
                self.pending = Some(read);
                Poll::Pending
            }
        }
    }
}

impl<T: BulkTransport + 'static> Stream for EventStream<T> {
    type Item = Result<StatusEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx).map(Some)
    }
}
