use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// USB vendor id of the microscope.
pub const VENDOR_ID: u16 = 0x04B0;

/// USB product id of the microscope.
pub const PRODUCT_ID: u16 = 0x7836;

/// Bulk OUT endpoint carrying command requests.
pub const COMMAND_OUT: u8 = 0x01;

/// Bulk IN endpoint carrying command responses.
pub const COMMAND_IN: u8 = 0x81;

/// Bulk IN endpoint carrying unsolicited status events.
pub const EVENT_IN: u8 = 0x82;

/// Size of a command request or response frame.
pub const COMMAND_FRAME_SIZE: usize = 62;

/// Size of a status event frame.
pub const EVENT_FRAME_SIZE: usize = 64;

/// Shortest timeout a bulk transfer can carry.
///
/// libusb counts timeouts in whole milliseconds and reads `0` as "wait
/// forever", so anything shorter must never reach the device.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// A blocking, endpoint-addressed bulk transport.
///
/// Both operations take `&self`: a command write and an event read may run
/// on different threads at the same time, since they address independent
/// endpoints of the same device handle.
pub trait BulkTransport: Send + Sync {
    /// Write one packet to `endpoint` (blocking).
    fn write(&self, endpoint: u8, data: &[u8]) -> Result<()>;

    /// Read one packet of at most `max_len` bytes from `endpoint` (blocking).
    ///
    /// Returns [`TransportError::Timeout`](crate::TransportError::Timeout)
    /// when nothing arrives within `timeout`.
    fn read(&self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Bytes>;
}

impl<T: BulkTransport + ?Sized> BulkTransport for Arc<T> {
    fn write(&self, endpoint: u8, data: &[u8]) -> Result<()> {
        (**self).write(endpoint, data)
    }

    fn read(&self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Bytes> {
        (**self).read(endpoint, max_len, timeout)
    }
}

impl<T: BulkTransport + ?Sized> BulkTransport for Box<T> {
    fn write(&self, endpoint: u8, data: &[u8]) -> Result<()> {
        (**self).write(endpoint, data)
    }

    fn read(&self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Bytes> {
        (**self).read(endpoint, max_len, timeout)
    }
}
