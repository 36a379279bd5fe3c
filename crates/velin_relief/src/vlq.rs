//! Base64 VLQ codec used by the `mappings` field of v3 source maps.

use crate::error::{SourceMapError, SourceMapResult};

const BASE64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const BASE64_VALUES: [i8; 128] = {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < BASE64_CHARS.len() {
        table[BASE64_CHARS[i] as usize] = i as i8;
        i += 1;
    }
    table
};

const CONTINUATION_BIT: u64 = 0x20;
const DIGIT_MASK: u64 = 0x1F;

/// Append the VLQ encoding of `value` to `out`.
pub fn encode(value: i64, out: &mut String) {
    // Sign goes into the least significant bit
    let mut unsigned: u64 = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = unsigned & DIGIT_MASK;
        unsigned >>= 5;
        if unsigned > 0 {
            digit |= CONTINUATION_BIT;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if unsigned == 0 {
            break;
        }
    }
}

/// Decode every value in a single mapping segment (e.g. `"AAgBC"`).
pub fn decode_segment(segment: &str) -> SourceMapResult<Vec<i64>> {
    let invalid = || SourceMapError::InvalidVlq {
        segment: segment.to_string(),
    };

    let mut values = Vec::with_capacity(5);
    let mut result: u64 = 0;
    let mut shift = 0u32;
    let mut pending = false;

    for byte in segment.bytes() {
        let digit = BASE64_VALUES
            .get(byte as usize)
            .copied()
            .filter(|d| *d >= 0)
            .ok_or_else(invalid)? as u64;

        if shift > 60 {
            return Err(invalid());
        }
        result |= (digit & DIGIT_MASK) << shift;
        shift += 5;
        pending = true;

        if digit & CONTINUATION_BIT == 0 {
            let magnitude = (result >> 1) as i64;
            values.push(if result & 1 == 1 { -magnitude } else { magnitude });
            result = 0;
            shift = 0;
            pending = false;
        }
    }

    if pending {
        return Err(invalid());
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: i64) -> String {
        let mut out = String::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encoded(0), "A");
        assert_eq!(encoded(1), "C");
        assert_eq!(encoded(-1), "D");
        assert_eq!(encoded(15), "e");
        assert_eq!(encoded(16), "gB");
        assert_eq!(encoded(-16), "hB");
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("AAgBC").unwrap(), vec![0, 0, 16, 1]);
        assert_eq!(decode_segment("D").unwrap(), vec![-1]);
        assert!(decode_segment("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_segment("A*A"),
            Err(SourceMapError::InvalidVlq { .. })
        ));
        // Dangling continuation digit
        assert!(matches!(
            decode_segment("g"),
            Err(SourceMapError::InvalidVlq { .. })
        ));
    }
}
