//! Operand encoders.
//!
//! Every encoder refuses values it cannot represent exactly instead of
//! truncating them: the expected output of a program is computed from the
//! values handed to these functions, so a silently altered operand would turn
//! into a false mismatch on the target.

use crate::error::{IsaError, IsaResult};
use veighty_config::{MAX_STRING_OPERAND, MAX_WORD, WORD_BITS};

/// Encodes an integer operand as 8 little-endian bytes.
pub fn encode_int(value: u64) -> IsaResult<[u8; 8]> {
    if value > MAX_WORD {
        return Err(IsaError::IntegerOutOfDomain {
            value,
            bits: WORD_BITS,
        });
    }
    Ok(value.to_le_bytes())
}

/// Encodes a string operand as a length byte followed by the bytes.
pub fn encode_string(bytes: &[u8]) -> IsaResult<Vec<u8>> {
    if bytes.len() > MAX_STRING_OPERAND {
        return Err(IsaError::StringTooLong {
            len: bytes.len(),
            max: MAX_STRING_OPERAND,
        });
    }
    let mut encoded = Vec::with_capacity(bytes.len() + 1);
    encoded.push(bytes.len() as u8);
    encoded.extend_from_slice(bytes);
    Ok(encoded)
}

/// Encodes an absolute jump target as 2 little-endian bytes.
pub fn encode_jump(target: usize) -> IsaResult<[u8; 2]> {
    let target16 = u16::try_from(target).map_err(|_| IsaError::JumpTargetOutOfRange { target })?;
    Ok(target16.to_le_bytes())
}

/// Reads an integer operand from the start of `bytes`.
pub fn decode_int(bytes: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(raw))
}

/// Reads a jump target from the start of `bytes`.
pub fn decode_jump(bytes: &[u8]) -> Option<usize> {
    let raw: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
    Some(u16::from_le_bytes(raw) as usize)
}

/// Formats an integer the way the VM prints it on `pop`.
pub fn format_hex(value: u64) -> String {
    format!("{:#x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_int() {
        assert_eq!(encode_int(0x0102).unwrap(), [0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_int(MAX_WORD).unwrap()[7], 0x7f);
        assert!(matches!(
            encode_int(MAX_WORD + 1),
            Err(IsaError::IntegerOutOfDomain { bits: 63, .. })
        ));
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(encode_string(b"ab").unwrap(), vec![2, b'a', b'b']);
        assert_eq!(encode_string(b"").unwrap(), vec![0]);
        assert_eq!(encode_string(&[b'x'; 255]).unwrap().len(), 256);
        assert!(matches!(
            encode_string(&[b'x'; 256]),
            Err(IsaError::StringTooLong { len: 256, max: 255 })
        ));
    }

    #[test]
    fn test_encode_jump() {
        assert_eq!(encode_jump(0x0a0b).unwrap(), [0x0b, 0x0a]);
        assert!(matches!(
            encode_jump(70_000),
            Err(IsaError::JumpTargetOutOfRange { target: 70_000 })
        ));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_int(&7u64.to_le_bytes()), Some(7));
        assert_eq!(decode_int(&[1, 2, 3]), None);
        assert_eq!(decode_jump(&[0x34, 0x12, 0xff]), Some(0x1234));
        assert_eq!(decode_jump(&[0x34]), None);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(12), "0xc");
        assert_eq!(format_hex(0), "0x0");
    }
}
