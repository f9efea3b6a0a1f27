use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use ti2_transport::COMMAND_FRAME_SIZE;

use crate::error::{DecodeError, FrameError, Result};

/// Size of the zero-padded payload region of a request.
pub const PAYLOAD_SIZE: usize = 58;

/// Marker between the payload region and the identifier.
pub const MARKER: [u8; 2] = [0x30, 0x31];

/// Header shared by every call envelope.
pub const CALL_HEADER: [u8; 6] = [0x01, 0x00, 0x21, 0xFF, 0x00, 0x00];

/// Width of the right-aligned argument field of a call envelope.
pub const CALL_ARGUMENT_SIZE: usize = 4;

/// Offset of the big-endian identifier in request and response frames.
const ID_OFFSET: usize = PAYLOAD_SIZE + MARKER.len();

/// Encode a request frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────────────────┬───────────┬──────────────┐
/// │ Payload (58B)              │ Marker    │ Identifier   │
/// │ zero-padded at the end     │ 0x30 0x31 │ (2B BE)      │
/// └────────────────────────────┴───────────┴──────────────┘
/// ```
pub fn encode_request(payload: &[u8], id: u16, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: PAYLOAD_SIZE,
        });
    }
    dst.reserve(COMMAND_FRAME_SIZE);
    dst.put_slice(payload);
    dst.put_bytes(0, PAYLOAD_SIZE - payload.len());
    dst.put_slice(&MARKER);
    dst.put_u16(id);
    Ok(())
}

/// Build a call envelope: the fixed header, the call type, then the argument
/// right-aligned in a 4-byte field with leading zeros.
pub fn encode_call(call_type: u8, argument: &[u8]) -> Result<Bytes> {
    if argument.len() > CALL_ARGUMENT_SIZE {
        return Err(FrameError::ArgumentTooLong {
            size: argument.len(),
            max: CALL_ARGUMENT_SIZE,
        });
    }
    let mut buf = BytesMut::with_capacity(CALL_HEADER.len() + 1 + CALL_ARGUMENT_SIZE);
    buf.put_slice(&CALL_HEADER);
    buf.put_u8(call_type);
    buf.put_bytes(0, CALL_ARGUMENT_SIZE - argument.len());
    buf.put_slice(argument);
    Ok(buf.freeze())
}

/// Extract the identifier a response frame echoes.
pub fn response_id(frame: &[u8]) -> std::result::Result<u16, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, "response")?;
    Ok(u16::from_be_bytes([frame[ID_OFFSET], frame[ID_OFFSET + 1]]))
}

/// Accessory kinds that carry a pair of display labels per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelKind {
    Condenser,
    Filter,
    OpticalPath,
    Zoom,
}

impl LabelKind {
    /// All label kinds.
    pub const ALL: [LabelKind; 4] = [
        LabelKind::Condenser,
        LabelKind::Filter,
        LabelKind::OpticalPath,
        LabelKind::Zoom,
    ];

    /// Request header selecting this kind.
    pub fn header(self) -> [u8; 4] {
        match self {
            LabelKind::Condenser => [0x01, 0x00, 0x19, 0x04],
            LabelKind::Filter => [0x01, 0x00, 0x19, 0x08],
            LabelKind::OpticalPath => [0x01, 0x00, 0x19, 0x18],
            LabelKind::Zoom => [0x01, 0x00, 0x19, 0x2C],
        }
    }

    /// Number of slots of this kind.
    pub fn slots(self) -> u8 {
        match self {
            LabelKind::Condenser => 7,
            LabelKind::Filter => 6,
            LabelKind::OpticalPath => 4,
            LabelKind::Zoom => 2,
        }
    }

    /// The label of a pair that names a slot of this kind.
    ///
    /// Condensers and filters are named by the long label, optical paths and
    /// zoom levels by the short one.
    pub fn display_label(self, pair: LabelPair) -> String {
        match self {
            LabelKind::Condenser | LabelKind::Filter => pair.long,
            LabelKind::OpticalPath | LabelKind::Zoom => pair.short,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            LabelKind::Condenser => "condenser",
            LabelKind::Filter => "filter",
            LabelKind::OpticalPath => "optical path",
            LabelKind::Zoom => "zoom",
        }
    }
}

/// The long and short label of one accessory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPair {
    pub long: String,
    pub short: String,
}

/// Stage travel limits that can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageBound {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMax,
}

impl StageBound {
    fn selector(self) -> [u8; 2] {
        match self {
            StageBound::XMin => [0x1B, 0x08],
            StageBound::XMax => [0x1A, 0x08],
            StageBound::YMin => [0x1B, 0x0C],
            StageBound::YMax => [0x1A, 0x0C],
            StageBound::ZMax => [0x1B, 0x04],
        }
    }
}

/// Query for the firmware CPU version.
pub fn firmware_version_query() -> Bytes {
    Bytes::from_static(&[0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
}

/// Query for the general version string.
pub fn version_query() -> Bytes {
    Bytes::from_static(&[0x01, 0x00, 0xE8, 0x30])
}

/// Query for the label pair of slot `index` (zero-based).
pub fn label_query(kind: LabelKind, index: u8) -> Bytes {
    slot_query(kind.header(), index)
}

/// Query for the descriptor of objective slot `index` (zero-based).
pub fn objective_query(index: u8) -> Bytes {
    slot_query([0x01, 0x00, 0x19, 0x00], index)
}

/// Query for one stage travel limit.
pub fn bound_query(bound: StageBound) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_slice(&[0x01, 0x00]);
    buf.put_slice(&bound.selector());
    buf.freeze()
}

/// Request assigning `function` to hardware button `index`.
pub fn button_function_query(index: u8, function: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(14);
    buf.put_slice(&[0x01, 0x00, 0x03, 0x28]);
    buf.put_bytes(0, 5);
    buf.put_u8(index);
    buf.put_bytes(0, 3);
    buf.put_u8(function);
    buf.freeze()
}

fn slot_query(header: [u8; 4], index: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(10);
    buf.put_slice(&header);
    buf.put_bytes(0, 5);
    // Slots are numbered from 1 on the wire.
    buf.put_u8(index.wrapping_add(1));
    buf.freeze()
}

/// Decode the firmware CPU version from its response.
pub fn decode_firmware_version(frame: &[u8]) -> std::result::Result<String, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, "firmware version")?;
    ascii_field(&frame[6..11], "firmware version", "version").map(trim_nul)
}

/// Decode the general version string from its response.
pub fn decode_version(frame: &[u8]) -> std::result::Result<String, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, "version")?;
    ascii_field(&frame[6..14], "version", "version").map(trim_nul)
}

/// Decode a label pair response. Trailing spaces are dropped.
pub fn decode_label(frame: &[u8]) -> std::result::Result<LabelPair, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, "label")?;
    let long = ascii_field(&frame[10..40], "label", "long")?;
    let short = ascii_field(&frame[40..50], "label", "short")?;
    Ok(LabelPair {
        long: trim_spaces(long),
        short: trim_spaces(short),
    })
}

/// Decode a stage bound response: a signed big-endian integer at `[6..10)`.
pub fn decode_bound(frame: &[u8]) -> std::result::Result<i32, DecodeError> {
    ensure_len(frame, COMMAND_FRAME_SIZE, "bound")?;
    Ok(i32::from_be_bytes([frame[6], frame[7], frame[8], frame[9]]))
}

pub(crate) fn ensure_len(
    frame: &[u8],
    min: usize,
    packet: &'static str,
) -> std::result::Result<(), DecodeError> {
    if frame.len() < min {
        return Err(DecodeError::TooShort {
            packet,
            len: frame.len(),
            min,
        });
    }
    Ok(())
}

pub(crate) fn ascii_field<'a>(
    bytes: &'a [u8],
    packet: &'static str,
    field: &'static str,
) -> std::result::Result<&'a str, DecodeError> {
    if !bytes.is_ascii() {
        return Err(DecodeError::NotAscii { packet, field });
    }
    std::str::from_utf8(bytes).map_err(|_| DecodeError::NotAscii { packet, field })
}

fn trim_spaces(text: &str) -> String {
    text.trim_end_matches(' ').to_string()
}

pub(crate) fn trim_nul(text: &str) -> String {
    text.trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(offset: usize, content: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; COMMAND_FRAME_SIZE];
        frame[offset..offset + content.len()].copy_from_slice(content);
        frame
    }

    #[test]
    fn request_layout() {
        let mut buf = BytesMut::new();
        encode_request(&[0x01, 0x00, 0xE8, 0x30], 0x1234, &mut buf).unwrap();

        assert_eq!(buf.len(), COMMAND_FRAME_SIZE);
        assert_eq!(&buf[..4], &[0x01, 0x00, 0xE8, 0x30]);
        assert!(buf[4..58].iter().all(|&b| b == 0));
        assert_eq!(&buf[58..60], &[0x30, 0x31]);
        assert_eq!(&buf[60..62], &[0x12, 0x34]);
    }

    #[test]
    fn request_payload_too_large() {
        let mut buf = BytesMut::new();
        let err = encode_request(&[0u8; 59], 1, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 59, max: 58 }));
    }

    #[test]
    fn request_payload_exactly_full() {
        let mut buf = BytesMut::new();
        encode_request(&[0xAA; 58], 7, &mut buf).unwrap();
        assert_eq!(buf.len(), COMMAND_FRAME_SIZE);
        assert_eq!(&buf[58..], &[0x30, 0x31, 0x00, 0x07]);
    }

    #[test]
    fn call_envelope_right_aligns_argument() {
        let call = encode_call(0x80, &[0x03]).unwrap();
        assert_eq!(
            call.as_ref(),
            &[0x01, 0x00, 0x21, 0xFF, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x03]
        );

        let call = encode_call(0xA8, &[0xFF, 0xFF, 0xFF, 0x9C]).unwrap();
        assert_eq!(&call[6..], &[0xA8, 0xFF, 0xFF, 0xFF, 0x9C]);
    }

    #[test]
    fn call_argument_too_long() {
        let err = encode_call(0x80, &[0; 5]).unwrap_err();
        assert!(matches!(err, FrameError::ArgumentTooLong { size: 5, max: 4 }));
    }

    #[test]
    fn response_id_reads_trailing_bytes() {
        let frame = response_with(60, &[0xAB, 0xCD]);
        assert_eq!(response_id(&frame).unwrap(), 0xABCD);
    }

    #[test]
    fn response_id_rejects_short_frame() {
        let err = response_id(&[0u8; 61]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                packet: "response",
                len: 61,
                min: 62
            }
        );
    }

    #[test]
    fn label_query_numbers_slots_from_one() {
        let query = label_query(LabelKind::Zoom, 1);
        assert_eq!(
            query.as_ref(),
            &[0x01, 0x00, 0x19, 0x2C, 0, 0, 0, 0, 0, 0x02]
        );
    }

    #[test]
    fn objective_query_layout() {
        let query = objective_query(5);
        assert_eq!(
            query.as_ref(),
            &[0x01, 0x00, 0x19, 0x00, 0, 0, 0, 0, 0, 0x06]
        );
    }

    #[test]
    fn bound_query_selectors() {
        assert_eq!(bound_query(StageBound::XMin).as_ref(), &[0x01, 0x00, 0x1B, 0x08]);
        assert_eq!(bound_query(StageBound::XMax).as_ref(), &[0x01, 0x00, 0x1A, 0x08]);
        assert_eq!(bound_query(StageBound::YMin).as_ref(), &[0x01, 0x00, 0x1B, 0x0C]);
        assert_eq!(bound_query(StageBound::YMax).as_ref(), &[0x01, 0x00, 0x1A, 0x0C]);
        assert_eq!(bound_query(StageBound::ZMax).as_ref(), &[0x01, 0x00, 0x1B, 0x04]);
    }

    #[test]
    fn button_function_layout() {
        let query = button_function_query(3, 0x11);
        assert_eq!(
            query.as_ref(),
            &[0x01, 0x00, 0x03, 0x28, 0, 0, 0, 0, 0, 0x03, 0, 0, 0, 0x11]
        );
    }

    #[test]
    fn label_trims_trailing_spaces_only() {
        let mut long = [b' '; 30];
        long[..8].copy_from_slice(b"Ph1 Ring");
        let mut short = [b' '; 10];
        short[..4].copy_from_slice(b" Eye");

        let mut frame = response_with(10, &long);
        frame[40..50].copy_from_slice(&short);

        let pair = decode_label(&frame).unwrap();
        assert_eq!(pair.long, "Ph1 Ring");
        assert_eq!(pair.short, " Eye");

        frame[40..50].copy_from_slice(b"Eye\0\0     ");
        assert_eq!(decode_label(&frame).unwrap().short, "Eye\0\0");
    }

    #[test]
    fn label_rejects_non_ascii() {
        let frame = response_with(12, &[0xC3, 0xA9]);
        let err = decode_label(&frame).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NotAscii {
                packet: "label",
                field: "long"
            }
        );
    }

    #[test]
    fn display_label_picks_per_kind() {
        let pair = LabelPair {
            long: "Long".to_string(),
            short: "S".to_string(),
        };
        assert_eq!(LabelKind::Filter.display_label(pair.clone()), "Long");
        assert_eq!(LabelKind::Zoom.display_label(pair), "S");
    }

    #[test]
    fn versions_decode_fixed_ranges() {
        let frame = response_with(6, b"1.23A\0\0\0");
        assert_eq!(decode_firmware_version(&frame).unwrap(), "1.23A");
        assert_eq!(decode_version(&frame).unwrap(), "1.23A");

        let frame = response_with(6, b"V2.10.05");
        assert_eq!(decode_version(&frame).unwrap(), "V2.10.05");
        assert_eq!(decode_firmware_version(&frame).unwrap(), "V2.10");
    }

    #[test]
    fn bound_is_signed() {
        let frame = response_with(6, &(-1_150_000i32).to_be_bytes());
        assert_eq!(decode_bound(&frame).unwrap(), -1_150_000);

        let frame = response_with(6, &[0x00, 0x0F, 0x42, 0x40]);
        assert_eq!(decode_bound(&frame).unwrap(), 1_000_000);
    }

    #[test]
    fn label_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&LabelKind::OpticalPath).unwrap();
        assert_eq!(json, "\"optical-path\"");
    }
}
