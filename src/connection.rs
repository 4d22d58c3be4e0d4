use bytes::BytesMut;
use std::io;
use thiserror::Error as ThisError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;

use crate::codec::FrameCodec;
use crate::frame::{self, Frame};

#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed input. The offending bytes have been dropped and the connection can keep
    /// reading.
    #[error("{0}")]
    Protocol(#[from] frame::Error),
    #[error("frame size exceeds limit of {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}

/// Reads frames from and writes frames to a TCP stream.
pub struct Connection {
    stream: TcpStream,
    // Data is read from the socket into the read buffer. When a frame is parsed, the corresponding
    // data is removed from the buffer.
    buffer: BytesMut,
    codec: FrameCodec,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection::with_codec(stream, FrameCodec::default())
    }

    pub fn with_codec(stream: TcpStream, codec: FrameCodec) -> Connection {
        Connection {
            stream,
            // Allocate the buffer with 4kb of capacity.
            buffer: BytesMut::with_capacity(4096),
            codec,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection on a frame boundary. Closing it
    /// halfway through a frame is reported as an I/O error.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return self.codec.decode_eof(&mut self.buffer);
            }
        }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.stream.write_all(&frame.serialize()).await?;
        self.stream.flush().await
    }
}
