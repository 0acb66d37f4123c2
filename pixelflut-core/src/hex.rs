/// Sentinel for a byte with no hex-digit meaning.
pub const NOT_HEX: u8 = 0xff;

/// `byte -> 0..=15`, read-only after initialization. Everything outside
/// `'0'..='9' | 'a'..='f' | 'A'..='F'` maps to [`NOT_HEX`].
pub static HEX_LOOKUP: [u8; 256] = build_hex_lookup();

const fn build_hex_lookup() -> [u8; 256] {
    let mut table = [NOT_HEX; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as u8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as u8;
        table[b'A' as usize + i] = 10 + i as u8;
        i += 1;
    }
    table
}

#[inline(always)]
pub fn is_hex_digit(byte: u8) -> bool {
    HEX_LOOKUP[byte as usize] != NOT_HEX
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b'0', 0)]
    #[case(b'9', 9)]
    #[case(b'a', 10)]
    #[case(b'f', 15)]
    #[case(b'A', 10)]
    #[case(b'F', 15)]
    fn maps_hex_digits(#[case] byte: u8, #[case] expected: u8) {
        assert_eq!(HEX_LOOKUP[byte as usize], expected);
    }

    #[rstest]
    #[case(b'g')]
    #[case(b'G')]
    #[case(b' ')]
    #[case(b'\n')]
    #[case(b'/')]
    #[case(b':')]
    fn non_hex_bytes_map_to_sentinel(#[case] byte: u8) {
        assert_eq!(HEX_LOOKUP[byte as usize], NOT_HEX);
        assert!(!is_hex_digit(byte));
    }
}
