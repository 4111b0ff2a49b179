//! Thumb-2 modified immediate constants.
//!
//! A 12-bit `i:imm3:imm8` field names a 32-bit constant: either the byte
//! replicated in one of four lane patterns, or `1:imm7` rotated right by
//! 8..=31 positions.

/// Mask of the encoded field.
pub const MODIFIED_IMM_MASK: u32 = 0xfff;

/// Expands an encoded modified immediate to the 32-bit value it names.
pub fn decode_modified_imm(raw: u32) -> u32 {
    let raw = raw & MODIFIED_IMM_MASK;
    let mode = (raw & 0xf00) >> 8;
    let byte = raw & 0xff;
    match mode {
        0 => byte,
        1 => (byte << 16) | byte,
        2 => (byte << 24) | (byte << 8),
        3 => (byte << 24) | (byte << 16) | (byte << 8) | byte,
        _ => {
            // mode >= 4 puts the rotation in 8..=31
            let rotation = ((raw & 0xf80) >> 7) - 8;
            ((byte | 0x80) << 24) >> rotation
        }
    }
}

/// Bitwise complement of [`decode_modified_imm`], as used by `mvn`/`bic` forms.
pub fn decode_negated_modified_imm(raw: u32) -> u32 {
    !decode_modified_imm(raw)
}

/// Encodes `value` as a modified immediate, or `None` when it has no encoding.
///
/// Lane patterns win over rotations, and the smallest rotation is chosen, so
/// the result is canonical.
pub fn encode_modified_imm(value: u32) -> Option<u32> {
    if value <= 0xff {
        return Some(value);
    }
    let low = value & 0xff;
    if value == (low << 16) | low {
        return Some(0x100 | low);
    }
    let high = (value >> 8) & 0xff;
    if value == (high << 24) | (high << 8) {
        return Some(0x200 | high);
    }
    if value == low * 0x0101_0101 {
        return Some(0x300 | low);
    }
    (8..=31u32).find_map(|rotation| {
        let unrotated = value.rotate_left(rotation);
        (unrotated <= 0xff && unrotated & 0x80 != 0).then(|| (rotation << 7) | (unrotated & 0x7f))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replication_modes() {
        for byte in 0..=0xffu32 {
            assert_eq!(decode_modified_imm(byte), byte);
            assert_eq!(decode_modified_imm(0x100 | byte), (byte << 16) | byte);
            assert_eq!(decode_modified_imm(0x200 | byte), (byte << 24) | (byte << 8));
            assert_eq!(
                decode_modified_imm(0x300 | byte),
                (byte << 24) | (byte << 16) | (byte << 8) | byte
            );
        }
        assert_eq!(decode_modified_imm(0x1ab), 0x00ab_00ab);
    }

    #[test]
    fn test_rotate_mode() {
        // rotation 8 puts 1:imm7 at the top of the word
        assert_eq!(decode_modified_imm(0x400), 0x8000_0000);
        assert_eq!(decode_modified_imm(0x47f), 0xff00_0000);
        // rotation 31 leaves 0x80 shifted left by one
        assert_eq!(decode_modified_imm(0xf80), 0x100);
        assert_eq!(decode_modified_imm(0xf00), 0x200);
    }

    #[test]
    fn test_negated_is_complement() {
        for raw in [0u32, 0x0ff, 0x1ab, 0x2cd, 0x3ef, 0x400, 0x5a5, 0xfff] {
            assert_eq!(decode_negated_modified_imm(raw), !decode_modified_imm(raw));
        }
        assert_eq!(decode_negated_modified_imm(0) as i32, -1);
    }

    #[test]
    fn test_every_encodable_value_roundtrips() {
        for raw in 0..=MODIFIED_IMM_MASK {
            let value = decode_modified_imm(raw);
            let encoded = encode_modified_imm(value)
                .unwrap_or_else(|| panic!("{value:#x} (from {raw:#x}) has no encoding"));
            assert_eq!(decode_modified_imm(encoded), value, "raw field {raw:#x}");
        }
    }

    #[test]
    fn test_unencodable_values() {
        assert_eq!(encode_modified_imm(0x0000_0101), None);
        assert_eq!(encode_modified_imm(0x1234_5678), None);
        assert_eq!(encode_modified_imm(0x00ab_00ac), None);
    }
}
