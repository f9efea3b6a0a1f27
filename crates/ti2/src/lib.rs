//! Control the Nikon Ti2 motorized microscope over USB.
//!
//! The Ti2 exchanges fixed-size bulk packets: requests and their responses
//! on one endpoint pair, unsolicited status events on another. This crate
//! bundles the layers that speak that protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: bulk endpoint abstraction, USB backend (behind `usb`)
//!   and a scripted mock
//! - [`frame`]: packet codec, identifier correlation and event decoding
//! - [`scope`]: async microscope API with command serialization and the
//!   status event stream

/// Re-export transport types.
pub mod transport {
    pub use ti2_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ti2_frame::*;
}

/// Re-export microscope types.
pub mod scope {
    pub use ti2_scope::*;
}
