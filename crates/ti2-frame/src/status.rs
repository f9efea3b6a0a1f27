use bytes::Buf;
use serde::{Deserialize, Serialize};
use ti2_transport::EVENT_FRAME_SIZE;

use crate::codec::ensure_len;
use crate::error::DecodeError;

/// Number of diaphragm steps between fully closed and fully open.
pub const DIAPHRAGM_STEPS: f64 = 2099.0;

/// A snapshot of the instrument state pushed on the event endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// The current condenser's index (0-6).
    pub condenser: i16,
    /// The diaphragm's opening (0-1).
    pub dia: f64,
    /// The current filter's index (0-5).
    pub filter: i16,
    /// Whether the light is enabled.
    pub light: bool,
    /// The current objective's index (0-5).
    pub objective: i16,
    /// The current optical path's index (0-3).
    pub optical_path: i16,
    /// Whether the shutter is open.
    pub shutter: bool,
    /// The x position [0.1 µm].
    pub x: i32,
    /// The y position [0.1 µm].
    pub y: i32,
    /// The z position [0.01 µm].
    pub z: i32,
    /// The zoom level: `1` for 1X, `2` for 1.5X, `0` while the zoom is
    /// being changed.
    pub zoom: i16,
}

impl StatusEvent {
    /// Stage position as `(x, y, z)`.
    pub fn point(&self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }
}

/// State of the front-panel function buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct ButtonPressEvent {
    pub fnL: bool,
    pub fnR: bool,
    pub fn1: bool,
    pub fn2: bool,
    pub fn3: bool,
    pub fn4: bool,
    pub fn5: bool,
    pub fn6: bool,
}

/// Decode a status event frame.
///
/// Frame layout (64 bytes, big-endian):
/// ```text
/// [3] objective   [4] condenser   [5] filter | shutter   [8] optical path
/// [10..14) z      [18..22) x      [26..30) y
/// [34..36) diaphragm   [36] light   [44] zoom
/// ```
/// Every other byte is ignored. Slot indices are 1-based on the wire.
pub fn decode_status(frame: &[u8]) -> Result<StatusEvent, DecodeError> {
    ensure_len(frame, EVENT_FRAME_SIZE, "status")?;
    let mut buf = &frame[..EVENT_FRAME_SIZE];

    buf.advance(3);
    let objective = buf.get_u8();
    let condenser = buf.get_u8();
    let filter_shutter = buf.get_u8();
    buf.advance(2);
    let optical_path = buf.get_u8();
    buf.advance(1);
    let z = buf.get_i32();
    buf.advance(4);
    let x = buf.get_i32();
    buf.advance(4);
    let y = buf.get_i32();
    buf.advance(4);
    let dia = buf.get_u16();
    let light = buf.get_u8() != 0;
    buf.advance(7);
    let zoom = buf.get_u8();

    Ok(StatusEvent {
        condenser: i16::from(condenser) - 1,
        dia: decode_diaphragm(dia),
        filter: i16::from(filter_shutter & 0x0F) - 1,
        light,
        objective: i16::from(objective) - 1,
        optical_path: i16::from(optical_path) - 1,
        shutter: filter_shutter >= 0x10,
        x,
        y,
        z,
        zoom: i16::from(zoom) - 0x40,
    })
}

/// Convert a diaphragm opening fraction to its raw step value.
///
/// Rounds half away from zero. The caller validates the `0.0..=1.0` range.
pub fn encode_diaphragm(fraction: f64) -> u16 {
    (fraction * DIAPHRAGM_STEPS + 1.0).round() as u16
}

/// Convert a raw diaphragm step value to an opening fraction.
pub fn decode_diaphragm(raw: u16) -> f64 {
    (f64::from(raw) - 1.0) / DIAPHRAGM_STEPS
}
