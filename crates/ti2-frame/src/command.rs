use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::encode_call;
use crate::error::Result;
use crate::status::encode_diaphragm;

/// A state-changing call. Slot indices are zero-based.
///
/// Values are encoded as given; range checks belong to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Stage x position [0.1 µm].
    X(i32),
    /// Stage y position [0.1 µm].
    Y(i32),
    /// Stage z position [0.01 µm].
    Z(i32),
    Objective(u8),
    Condenser(u8),
    Filter(u8),
    OpticalPath(u8),
    Light(bool),
    Shutter(bool),
    /// Diaphragm opening fraction.
    Diaphragm(f64),
}

impl Command {
    /// The call type byte selecting this operation.
    pub fn call_type(&self) -> u8 {
        match self {
            Command::Objective(_) => 0x80,
            Command::Condenser(_) => 0x88,
            Command::Filter(_) => 0x8C,
            Command::Shutter(_) => 0x8D,
            Command::OpticalPath(_) => 0x98,
            Command::Z(_) => 0xA0,
            Command::X(_) => 0xA8,
            Command::Y(_) => 0xAC,
            Command::Light(_) => 0xB4,
            Command::Diaphragm(_) => 0xB5,
        }
    }

    /// The big-endian argument bytes, before envelope padding.
    pub fn argument(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4);
        match *self {
            Command::X(value) | Command::Y(value) | Command::Z(value) => buf.put_i32(value),
            Command::Objective(index) | Command::OpticalPath(index) => {
                buf.put_u8(index.wrapping_add(1))
            }
            Command::Condenser(index) | Command::Filter(index) => {
                buf.put_u16(u16::from(index) + 1)
            }
            Command::Shutter(on) => buf.put_u8(u8::from(on)),
            Command::Light(on) => {
                buf.put_u8(0);
                buf.put_u8(u8::from(on));
            }
            Command::Diaphragm(fraction) => buf.put_u16(encode_diaphragm(fraction)),
        }
        buf.freeze()
    }

    /// The complete call envelope for this command.
    pub fn encode(&self) -> Result<Bytes> {
        encode_call(self.call_type(), &self.argument())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tail(command: Command) -> Vec<u8> {
        command.encode().unwrap()[6..].to_vec()
    }

    #[test]
    fn stage_positions_are_signed_32_bit() {
        assert_eq!(tail(Command::X(-100)), [0xA8, 0xFF, 0xFF, 0xFF, 0x9C]);
        assert_eq!(tail(Command::Y(256)), [0xAC, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(tail(Command::Z(1)), [0xA0, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn slot_indices_are_one_based() {
        assert_eq!(tail(Command::Objective(0)), [0x80, 0, 0, 0, 0x01]);
        assert_eq!(tail(Command::OpticalPath(3)), [0x98, 0, 0, 0, 0x04]);
        assert_eq!(tail(Command::Condenser(6)), [0x88, 0, 0, 0, 0x07]);
        assert_eq!(tail(Command::Filter(5)), [0x8C, 0, 0, 0, 0x06]);
    }

    #[test]
    fn switches() {
        assert_eq!(tail(Command::Light(true)), [0xB4, 0, 0, 0, 0x01]);
        assert_eq!(tail(Command::Light(false)), [0xB4, 0, 0, 0, 0x00]);
        assert_eq!(tail(Command::Shutter(true)), [0x8D, 0, 0, 0, 0x01]);
        assert_eq!(Command::Light(true).argument().len(), 2);
        assert_eq!(Command::Shutter(true).argument().len(), 1);
    }

    #[test]
    fn diaphragm_uses_step_encoding() {
        // 0.5 * 2099 + 1 = 1050.5, rounded away from zero.
        assert_eq!(tail(Command::Diaphragm(0.5)), [0xB5, 0, 0, 0x04, 0x1B]);
        assert_eq!(tail(Command::Diaphragm(1.0)), [0xB5, 0, 0, 0x08, 0x34]);
    }

    #[test]
    fn envelope_header_is_fixed() {
        let call = Command::Objective(2).encode().unwrap();
        assert_eq!(&call[..6], &[0x01, 0x00, 0x21, 0xFF, 0x00, 0x00]);
        assert_eq!(call.len(), 11);
    }
}
