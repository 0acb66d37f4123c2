use pixelflut_core::hex::{is_hex_digit, HEX_LOOKUP};

// Treats an out-of-range index as 0 instead of panicking. Scanners here run
// over raw mmap'd bytes from the fuzz target, not guaranteed line-terminated.
#[inline(always)]
fn byte_at(buf: &[u8], idx: usize) -> u8 {
    *buf.get(idx).unwrap_or(&0)
}

// Consumes [0-9]+ starting at *cursor, advancing past the last digit.
// Wrapping, no overflow check; an out-of-range coordinate just gets dropped
// by FrameBuffer::set/get downstream.
pub fn read_decimal(buf: &[u8], cursor: &mut usize) -> u32 {
    let mut result: u32 = 0;
    while let Some(&b) = buf.get(*cursor) {
        if !b.is_ascii_digit() {
            break;
        }
        result = result.wrapping_mul(10).wrapping_add((b - b'0') as u32);
        *cursor += 1;
    }
    result
}

#[inline(always)]
fn hex_nibble(buf: &[u8], idx: usize) -> u8 {
    HEX_LOOKUP[byte_at(buf, idx) as usize]
}

#[inline(always)]
fn hex_byte(buf: &[u8], idx: usize) -> u32 {
    ((hex_nibble(buf, idx) as u32) << 4) | hex_nibble(buf, idx + 1) as u32
}

// Consumes one of the three fixed-width color forms at *cursor, returns the
// packed ARGB value, advances the cursor past the form consumed. Form is
// told apart by peeking offset 2 (grayscale vs RGB/RGBA) and, if not
// grayscale, offset 6 (RGB vs RGBA).
pub fn read_hex_color(buf: &[u8], cursor: &mut usize) -> u32 {
    let start = *cursor;

    if !is_hex_digit(byte_at(buf, start + 2)) {
        // Grayscale: GG
        let g = hex_byte(buf, start);
        *cursor += 2;
        return (g << 16) | (g << 8) | g;
    }

    if !is_hex_digit(byte_at(buf, start + 6)) {
        // RGB: RRGGBB, alpha forced opaque
        let r = hex_byte(buf, start);
        let g = hex_byte(buf, start + 2);
        let b = hex_byte(buf, start + 4);
        *cursor += 6;
        return 0xff00_0000 | (r << 16) | (g << 8) | b;
    }

    // RGBA: RRGGBBAA
    let r = hex_byte(buf, start);
    let g = hex_byte(buf, start + 2);
    let b = hex_byte(buf, start + 4);
    let a = hex_byte(buf, start + 6);
    *cursor += 8;
    (a << 24) | (r << 16) | (g << 8) | b
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"0\n", 0)]
    #[case(b"42 \n", 42)]
    #[case(b"1920 1080\n", 1920)]
    fn reads_decimal_up_to_first_non_digit(#[case] input: &[u8], #[case] expected: u32) {
        let mut cursor = 0;
        assert_eq!(read_decimal(input, &mut cursor), expected);
    }

    #[test]
    fn decimal_cursor_stops_before_terminator() {
        let input = b"123 456";
        let mut cursor = 0;
        assert_eq!(read_decimal(input, &mut cursor), 123);
        assert_eq!(cursor, 3);
    }

    #[test]
    fn grayscale_does_not_force_alpha_opaque() {
        let mut cursor = 0;
        let argb = read_hex_color(b"7f\n", &mut cursor);
        assert_eq!(argb, 0x007f7f7f);
        assert_eq!(cursor, 2);
    }

    #[test]
    fn rgb_forces_alpha_opaque() {
        let mut cursor = 0;
        let argb = read_hex_color(b"abcdef\n", &mut cursor);
        assert_eq!(argb, 0xffabcdef);
        assert_eq!(cursor, 6);
    }

    #[test]
    fn rgba_preserves_given_alpha() {
        let mut cursor = 0;
        let argb = read_hex_color(b"11223344\n", &mut cursor);
        assert_eq!(argb, 0x44112233);
        assert_eq!(cursor, 8);
    }

    #[test]
    fn truncated_input_does_not_panic() {
        let mut cursor = 0;
        // Shorter than any well-formed color; must not index out of bounds.
        let _ = read_hex_color(b"a", &mut cursor);
    }
}
