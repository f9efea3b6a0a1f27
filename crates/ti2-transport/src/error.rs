use std::time::Duration;

/// Errors that can occur in bulk transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A read or write did not complete within its timeout.
    #[error("endpoint {endpoint:#04x} timed out after {timeout:?}")]
    Timeout { endpoint: u8, timeout: Duration },

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device accepted fewer bytes than were submitted.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The device is gone (unplugged or closed).
    #[error("device disconnected")]
    Disconnected,

    /// No device matching the vendor/product id is attached.
    #[error("no device found for {vendor_id:04x}:{product_id:04x}")]
    NoDevice { vendor_id: u16, product_id: u16 },

    /// Error reported by libusb.
    #[cfg(feature = "usb")]
    #[error("usb error: {0}")]
    Usb(rusb::Error),
}

impl TransportError {
    /// Returns true if this error is a read/write timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
