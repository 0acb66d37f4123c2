use std::collections::VecDeque;
use std::task::Poll;

use tokio::io::{AsyncRead, AsyncWrite};

// In-memory stand-in for a TcpStream. Input is split into discrete chunks;
// each poll_read hands back at most one queued chunk, so tests can pin down
// exactly where a read boundary falls.
#[derive(Debug, Default)]
pub struct MockTcpStream {
    read_chunks: VecDeque<Vec<u8>>,
    write_data: Vec<u8>,
}

impl MockTcpStream {
    pub fn from_input(input: &str) -> Self {
        Self::from_chunks(&[input])
    }

    // One read chunk per element of chunks, delivered in order.
    pub fn from_chunks(chunks: &[&str]) -> Self {
        MockTcpStream {
            read_chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            write_data: Vec::new(),
        }
    }

    pub fn get_output(&self) -> String {
        String::from_utf8(self.write_data.clone()).unwrap()
    }
}

impl AsyncRead for MockTcpStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let Some(chunk) = this.read_chunks.pop_front() else {
            // EOF: no more chunks, report a zero-length read.
            return Poll::Ready(Ok(()));
        };

        if chunk.len() <= buf.remaining() {
            buf.put_slice(&chunk);
        } else {
            // Caller's buffer is smaller than the chunk; hand back what fits
            // and requeue the remainder as the next chunk.
            let (now, later) = chunk.split_at(buf.remaining());
            buf.put_slice(now);
            this.read_chunks.push_front(later.to_vec());
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockTcpStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        self.get_mut().write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }
}
