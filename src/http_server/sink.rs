//! Channel-backed response sink
//!
//! Bridges the blocking archive assembler to an async response body. Bytes
//! are buffered into chunks and handed to the body stream over a bounded
//! channel; once the receiver is gone every write fails with `BrokenPipe`.

use std::io::{self, Write};

use axum::body::{Body, Bytes};
use futures_util::stream;
use tokio::sync::mpsc;

/// Chunk size handed to the response body
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the assembler and the client
const CHANNEL_CAPACITY: usize = 16;

type Chunk = Result<Bytes, io::Error>;

/// Blocking writer feeding a streamed response body
pub struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    buf: Vec<u8>,
    chunk_size: usize,
}

impl ChannelWriter {
    /// Create a writer and the body it feeds
    pub fn with_chunk_size(chunk_size: usize) -> (Self, Body) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        }));
        let writer = Self {
            tx,
            buf: Vec::with_capacity(chunk_size),
            chunk_size: chunk_size.max(1),
        };
        (writer, body)
    }

    /// Abort the response body with an error
    pub fn fail(self, error: io::Error) {
        // the client may already be gone
        let _ = self.tx.blocking_send(Err(error));
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(self.chunk_size),
        ));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body closed"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "response body closed",
            ));
        }
        self.buf.extend_from_slice(buf);
        if self.buf.len() >= self.chunk_size {
            self.send_buffered()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}
