use std::cmp::min;
use std::sync::Arc;

use pixelflut_core::counters::Counters;
use pixelflut_core::framebuffer::FrameBuffer;
use pixelflut_core::CARRY_BUFFER_CAPACITY;
use pixelflut_parser::{parse_command, PARSER_LOOKAHEAD};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Socket read size. Large enough that a full read rarely straddles many
/// commands, small enough that a single slow client doesn't hog memory.
const NETWORK_BUFFER_SIZE: usize = 256 * 1024;

/// Drains one client connection for its entire lifetime: reads raw
/// bytes, reassembles `\n`-terminated commands across reads via a small
/// per-connection carry buffer, and feeds each complete line to the parser.
///
/// Runs to completion on whichever worker reactor it was dispatched to;
/// it never touches any other connection's state.
pub async fn handle_connection(
    mut stream: impl AsyncReadExt + AsyncWriteExt + Unpin,
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
) {
    // Carry buffer: the unterminated tail of the previous read. Capacity
    // bounds how much of a single line we will ever try to reassemble; a
    // command longer than this is simply never completed.
    let mut carry = [0u8; CARRY_BUFFER_CAPACITY];
    let mut carry_len = 0usize;

    let mut read_buf = vec![0u8; NETWORK_BUFFER_SIZE];
    let mut response = Vec::new();

    loop {
        let Ok(n) = stream.read(&mut read_buf).await else {
            break;
        };
        if n == 0 {
            break;
        }
        counters.add_bytes(n as u64);

        let buf = &read_buf[..n];
        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            // No complete line in this read at all: stash everything we can
            // and wait for more data.
            let take = min(n, CARRY_BUFFER_CAPACITY - carry_len);
            carry[carry_len..carry_len + take].copy_from_slice(&buf[..take]);
            carry_len += take;
            continue;
        };

        let mut cursor = 0usize;
        let mut pixel_delta = 0u64;

        if carry_len > 0 {
            // The first line in this read may complete a command that
            // started in a previous read. Find its end, splice the two
            // halves together in the carry buffer and parse the combined
            // line from there.
            let first_newline = buf.iter().position(|&b| b == b'\n').unwrap_or(last_newline);
            let take = min(first_newline + 1, CARRY_BUFFER_CAPACITY - carry_len);
            carry[carry_len..carry_len + take].copy_from_slice(&buf[..take]);
            carry_len += take;

            let parsed = parse_command(&carry[..carry_len], 0, &fb, &mut response);
            pixel_delta += parsed.pixels_painted;
            carry_len = 0;
            cursor = first_newline + 1;
        }

        while cursor <= last_newline {
            let parsed = parse_command(buf, cursor, &fb, &mut response);
            pixel_delta += parsed.pixels_painted;
            cursor = parsed.end + 1;
        }

        counters.add_pixels(pixel_delta);

        if last_newline + 1 < n {
            // Partial command trailing the last full line: stash it for the
            // next read.
            let tail = &buf[last_newline + 1..n];
            let take = min(tail.len(), CARRY_BUFFER_CAPACITY);
            carry[..take].copy_from_slice(&tail[..take]);
            carry_len = take;
        }

        if !response.is_empty() {
            if stream.write_all(&response).await.is_err() {
                break;
            }
            response.clear();
        }
    }

    debug!("connection closed");
    counters.client_disconnected();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelflut_core::test_helpers::MockTcpStream;
    use rstest::rstest;

    async fn run(chunks: &[&str]) -> (String, Arc<FrameBuffer>) {
        let fb = Arc::new(FrameBuffer::new(1920, 1080));
        let counters = Arc::new(Counters::new());
        counters.client_connected();
        let mut stream = MockTcpStream::from_chunks(chunks);
        handle_connection(&mut stream, fb.clone(), counters.clone()).await;
        assert_eq!(counters.nr_clients(), 0);
        (stream.get_output(), fb)
    }

    #[rstest]
    #[case(&["PX 10 20 01020304\nPX 10 20\n"], "PX 10 20 01020304\n")]
    #[case(&["PX 0 0 7f\nPX 0 0\n"], "PX 0 0 7f7f7f00\n")]
    #[case(&["PX 2 2 abcdef\nPX 2 2\n"], "PX 2 2 abcdefff\n")]
    #[case(&["SIZE\n"], "SIZE 1920 1080\n")]
    #[case(&["PX 9999 9999 abcdef\nSIZE\n"], "SIZE 1920 1080\n")]
    #[tokio::test]
    async fn end_to_end_scenarios(#[case] chunks: &[&str], #[case] expected: &str) {
        let (output, _fb) = run(chunks).await;
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn partial_line_split_across_reads_matches_single_read() {
        let (split_output, split_fb) = run(&["PX 5 5 ", "112233\n", "PX 5 5\n"]).await;
        let (whole_output, whole_fb) = run(&["PX 5 5 112233\nPX 5 5\n"]).await;

        assert_eq!(split_output, "PX 5 5 112233ff\n");
        assert_eq!(split_output, whole_output);
        assert_eq!(split_fb.get(5, 5), whole_fb.get(5, 5));
    }

    #[tokio::test]
    async fn split_at_every_byte_boundary_is_idempotent() {
        let whole = "PX 1 1 aabbcc\nPX 2 2 ddeeff\nPX 1 1\nPX 2 2\n";
        let (reference, _) = run(&[whole]).await;

        for split_at in 1..whole.len() {
            let chunks = [&whole[..split_at], &whole[split_at..]];
            let (output, _) = run(&chunks).await;
            assert_eq!(output, reference, "split at byte {split_at} diverged");
        }
    }

    #[tokio::test]
    async fn unknown_lines_interleaved_with_writes_do_not_affect_framebuffer() {
        let with_garbage = "garbage line\nPX 0 0 abcdef\nmore garbage\nPX 0 0\n";
        let without_garbage = "PX 0 0 abcdef\nPX 0 0\n";

        let (a, _) = run(&[with_garbage]).await;
        let (b, _) = run(&[without_garbage]).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn client_counter_returns_to_baseline_after_close() {
        let fb = Arc::new(FrameBuffer::new(4, 4));
        let counters = Arc::new(Counters::new());
        counters.client_connected();
        counters.client_connected();
        assert_eq!(counters.nr_clients(), 2);

        let mut stream = MockTcpStream::from_input("SIZE\n");
        handle_connection(&mut stream, fb, counters.clone()).await;
        assert_eq!(counters.nr_clients(), 1);
    }

    #[tokio::test]
    async fn pixel_counter_increments_once_per_successful_write() {
        let fb = Arc::new(FrameBuffer::new(4, 4));
        let counters = Arc::new(Counters::new());
        counters.client_connected();

        let mut stream =
            MockTcpStream::from_input("PX 0 0 ffffff\nPX 1 1 ffffff\nPX 9999 9999 ffffff\n");
        handle_connection(&mut stream, fb, counters.clone()).await;
        assert_eq!(counters.nr_pixels(), 2);
    }
}
