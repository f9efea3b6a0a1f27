//! Packet codec and command correlation for the Ti2 microscope protocol.
//!
//! This is the core value-add layer of ti2. Every command request is framed as:
//! - A 58-byte payload, zero-padded at the end
//! - A 2-byte marker (`0x30 0x31`)
//! - A 2-byte big-endian request identifier, echoed by the response
//!
//! Status events arrive unsolicited on a separate endpoint as fixed 64-byte
//! frames. Nothing here spawns threads or holds locks; callers decide how
//! requests are serialized.

pub mod channel;
pub mod codec;
pub mod command;
pub mod error;
pub mod objective;
pub mod reader;
pub mod sequence;
pub mod status;

pub use channel::{ChannelConfig, CommandChannel, ResponseDeadline, DEFAULT_RESPONSE_TIMEOUT};
pub use codec::{
    decode_bound, decode_firmware_version, decode_label, decode_version, encode_call,
    encode_request, response_id, LabelKind, LabelPair, StageBound, CALL_HEADER, MARKER,
    PAYLOAD_SIZE,
};
pub use command::Command;
pub use error::{DecodeError, FrameError, Result};
pub use objective::{decode_objective_info, ObjectiveInfo};
pub use reader::{EventReader, Events, DEFAULT_EVENT_TIMEOUT};
pub use sequence::Sequencer;
pub use status::{
    decode_diaphragm, decode_status, encode_diaphragm, ButtonPressEvent, StatusEvent,
    DIAPHRAGM_STEPS,
};
