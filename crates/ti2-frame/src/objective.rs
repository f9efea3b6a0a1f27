use bytes::Buf;
use serde::{Deserialize, Serialize};
use ti2_transport::COMMAND_FRAME_SIZE;

use crate::codec::{ascii_field, ensure_len, trim_nul};
use crate::error::DecodeError;

const PACKET: &str = "objective info";

/// Static descriptor of one objective slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveInfo {
    /// The magnification [0.1 X], for example `200` for 20X.
    pub magnification: u16,
    /// The numerical aperture [0.01], for example `50` for 0.5.
    pub numerical_aperture: u16,
    /// The model identifier, for example `"MRH00201"`.
    pub model: String,
    /// The observation technique: `"Ph"`, `"DIC"`, `"NAMC"`, `"IMSI"` or `"TIRF"`.
    pub observation: String,
    /// Whether the objective supports PFS.
    pub pfs: bool,
    /// The refractive index: `"Dry"`, `"WI"`, `"MImm"`, `"Oil"` or `"Sil"`.
    pub refractive_index: String,
    /// The series identifier, for example `"Plan Fluor"`.
    pub series: String,
    /// The working distance [0.01 mm], for example `210` for 2.10 mm.
    pub working_distance: i32,
}

/// Decode an objective info response.
///
/// Layout: 10 skipped bytes, model (8), magnification (u16), numerical
/// aperture (u16), PFS code (u16, `2` = supported), series (14), working
/// distance text (4), observation (4), refractive index (4), 12 trailing
/// bytes. Text fields are NUL-padded.
pub fn decode_objective_info(frame: &[u8]) -> Result<ObjectiveInfo, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, PACKET)?;

    let mut buf = &frame[18..24];
    let magnification = buf.get_u16();
    let numerical_aperture = buf.get_u16();
    let pfs = buf.get_u16();

    let model = text(&frame[10..18], "model")?;
    let series = text(&frame[24..38], "series")?;
    let working_distance = text(&frame[38..42], "working_distance")?;
    let observation = text(&frame[42..46], "observation")?;
    let refractive_index = text(&frame[46..50], "refractive_index")?;

    Ok(ObjectiveInfo {
        magnification,
        numerical_aperture,
        model,
        observation,
        pfs: pfs == 2,
        refractive_index,
        series,
        working_distance: parse_working_distance(&working_distance)?,
    })
}

fn text(bytes: &[u8], field: &'static str) -> Result<String, DecodeError> {
    ascii_field(bytes, PACKET, field).map(trim_nul)
}

/// The device reports the working distance as decimal text in millimetres.
fn parse_working_distance(text: &str) -> Result<i32, DecodeError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidNumber {
            packet: PACKET,
            field: "working_distance",
            text: text.to_string(),
        })?;
    Ok((value * 100.0).round() as i32)
}
