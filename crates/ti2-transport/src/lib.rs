//! Blocking bulk-transfer transport for the Ti2 microscope.
//!
//! The protocol layers above only need two operations from a device:
//! write a packet to an endpoint, and read one packet from an endpoint with
//! a timeout. This crate defines that seam ([`BulkTransport`]) together with:
//! - A `rusb` backed implementation (behind the `usb` feature)
//! - A scripted in-memory [`MockTransport`] for tests and simulations
//!
//! This is the lowest layer of ti2. Everything else builds on top of it.

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(feature = "usb")]
pub mod usb;

pub use error::{Result, TransportError};
pub use mock::{echo_response, MockRead, MockTransport};
pub use traits::{
    BulkTransport, COMMAND_FRAME_SIZE, COMMAND_IN, COMMAND_OUT, EVENT_FRAME_SIZE, EVENT_IN,
    MIN_TIMEOUT, PRODUCT_ID, VENDOR_ID,
};

#[cfg(feature = "usb")]
pub use usb::{list_devices, list_devices_with_config, UsbConfig, UsbTransport};
