//! Async control API for the Ti2 motorized microscope.
//!
//! This is the "just works" layer. Open a device, move the stage, switch
//! accessories, and follow the status event stream. Commands are serialized
//! per device; the event stream runs independently of them.

pub mod config;
#[cfg(feature = "usb")]
pub mod connector;
pub mod error;
pub mod microscope;
pub mod stream;

pub use config::{MicroscopeConfig, DEFAULT_IDLE_DURATION};
#[cfg(feature = "usb")]
pub use connector::{connect_all, connect_all_with_config};
pub use error::{Result, ScopeError};
pub use microscope::{
    Microscope, BUTTON_SLOTS, CONDENSER_SLOTS, FILTER_SLOTS, OBJECTIVE_SLOTS, OPTICAL_PATH_SLOTS,
};
pub use stream::EventStream;

pub use ti2_frame::{
    ButtonPressEvent, ChannelConfig, LabelKind, LabelPair, ObjectiveInfo, ResponseDeadline,
    StageBound, StatusEvent,
};
