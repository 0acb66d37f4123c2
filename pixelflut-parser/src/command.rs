use pixelflut_core::framebuffer::FrameBuffer;

use crate::scan::{read_decimal, read_hex_color};

// Index of the command's terminating \n; callers advance to end + 1 for the
// next command. pixels_painted is 1/0, batched by the caller into a single
// Counters::add_pixels call per read.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub end: usize,
    pub pixels_painted: u64,
}

fn find_newline(buf: &[u8], from: usize) -> usize {
    buf.get(from..)
        .and_then(|rest| rest.iter().position(|&b| b == b'\n'))
        .map(|p| from + p)
        .unwrap_or_else(|| buf.len().saturating_sub(1))
}

// Skips to (and including) the next \n without touching the framebuffer.
// Also the fallback for any malformed PX/SIZE line.
fn skip_line(buf: &[u8], start: usize) -> ParsedCommand {
    ParsedCommand {
        end: find_newline(buf, start),
        pixels_painted: 0,
    }
}

fn parse_size(buf: &[u8], start: usize, fb: &FrameBuffer, response: &mut Vec<u8>) -> ParsedCommand {
    response.extend_from_slice(format!("SIZE {} {}\n", fb.width(), fb.height()).as_bytes());
    ParsedCommand {
        end: find_newline(buf, start),
        pixels_painted: 0,
    }
}

fn parse_px(buf: &[u8], start: usize, fb: &FrameBuffer, response: &mut Vec<u8>) -> ParsedCommand {
    if buf.get(start + 1) != Some(&b'X') || buf.get(start + 2) != Some(&b' ') {
        return skip_line(buf, start);
    }

    let mut cursor = start + 3;
    let x_cursor_before = cursor;
    let x = read_decimal(buf, &mut cursor) as usize;
    if cursor == x_cursor_before {
        return skip_line(buf, start);
    }

    if buf.get(cursor) != Some(&b' ') {
        return skip_line(buf, start);
    }
    cursor += 1;

    let y_cursor_before = cursor;
    let y = read_decimal(buf, &mut cursor) as usize;
    if cursor == y_cursor_before {
        return skip_line(buf, start);
    }

    match buf.get(cursor) {
        Some(b'\n') => {
            // Get request: reply hex is always RGBA-ordered, regardless of
            // how the pixel was last written.
            let argb = fb.get(x, y);
            let rgba = argb.rotate_left(8);
            response.extend_from_slice(format!("PX {x} {y} {rgba:08x}\n").as_bytes());
            ParsedCommand {
                end: cursor,
                pixels_painted: 0,
            }
        }
        Some(b' ') => {
            cursor += 1;
            let argb = read_hex_color(buf, &mut cursor);
            if buf.get(cursor) == Some(&b'\n') {
                // Out-of-bounds coordinates are dropped by FrameBuffer::set.
                let in_bounds = x < fb.width() && y < fb.height();
                fb.set(x, y, argb);
                ParsedCommand {
                    end: cursor,
                    pixels_painted: in_bounds as u64,
                }
            } else {
                // Color form didn't end where expected; tolerate the
                // malformed line rather than writing a garbage pixel.
                skip_line(buf, start)
            }
        }
        _ => skip_line(buf, start),
    }
}

// Parses exactly one command beginning at buf[start], mutating fb and
// appending any reply to response.
pub fn parse_command(
    buf: &[u8],
    start: usize,
    fb: &FrameBuffer,
    response: &mut Vec<u8>,
) -> ParsedCommand {
    match buf.get(start) {
        Some(b'P') => parse_px(buf, start, fb, response),
        Some(b'S') => parse_size(buf, start, fb, response),
        Some(_) => skip_line(buf, start),
        None => ParsedCommand {
            end: start,
            pixels_painted: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(input: &str) -> (String, Vec<u32>) {
        let fb = FrameBuffer::new(1920, 1080);
        let mut response = Vec::new();
        let buf = input.as_bytes();
        let mut cursor = 0;
        while cursor < buf.len() {
            let parsed = parse_command(buf, cursor, &fb, &mut response);
            cursor = parsed.end + 1;
        }
        (
            String::from_utf8(response).unwrap(),
            fb.as_pixels().to_vec(),
        )
    }

    #[rstest]
    #[case("PX 10 20 01020304\nPX 10 20\n", "PX 10 20 01020304\n")]
    #[case("PX 0 0 7f\nPX 0 0\n", "PX 0 0 7f7f7f00\n")]
    #[case("PX 2 2 abcdef\nPX 2 2\n", "PX 2 2 abcdefff\n")]
    #[case("SIZE\n", "SIZE 1920 1080\n")]
    fn end_to_end_scenarios(#[case] input: &str, #[case] expected_response: &str) {
        let (response, _) = run(input);
        assert_eq!(response, expected_response);
    }

    #[test]
    fn grayscale_sets_zero_alpha() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        parse_command(b"PX 0 0 ab\n", 0, &fb, &mut response);
        assert_eq!(fb.get(0, 0), 0x00ababab);
    }

    #[test]
    fn rgba_preserves_alpha_byte() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        parse_command(b"PX 1 1 11223344\n", 0, &fb, &mut response);
        assert_eq!(fb.get(1, 1), 0x44112233);
    }

    #[test]
    fn out_of_bounds_write_does_not_count_towards_pixel_counter() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        let parsed = parse_command(b"PX 9999 9999 abcdef\n", 0, &fb, &mut response);
        assert_eq!(parsed.pixels_painted, 0);
    }

    #[test]
    fn out_of_bounds_write_has_no_effect() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        parse_command(b"PX 9999 9999 abcdef\n", 0, &fb, &mut response);
        assert!(fb.as_pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn unknown_command_is_skipped_without_side_effects() {
        let (response, pixels) = run("not a pixelflut command\nSIZE\n");
        assert_eq!(response, "SIZE 1920 1080\n");
        assert!(pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn unterminated_trailing_garbage_does_not_panic() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        // No trailing newline at all, as a truncated fuzz input would look.
        let parsed = parse_command(b"PX 1 1", 0, &fb, &mut response);
        assert_eq!(parsed.pixels_painted, 0);
    }

    #[test]
    fn empty_buffer_does_not_panic() {
        let fb = FrameBuffer::new(4, 4);
        let mut response = Vec::new();
        let parsed = parse_command(b"", 0, &fb, &mut response);
        assert_eq!(parsed.end, 0);
    }
}
