use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio_util::codec::Decoder;

use crate::connection::Error;
use crate::frame::{self, Frame};

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Decodes RESP frames out of a read buffer.
///
/// Bytes are only removed from the buffer once a frame is complete, or once a malformed frame
/// has been detected. In the latter case everything up to the point the decode reached is
/// dropped, so the next call resumes after the offending bytes.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> FrameCodec {
        FrameCodec { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut cursor = Cursor::new(&src[..]);
        let result = Frame::parse(&mut cursor);
        let position = cursor.position() as usize;

        match result {
            Ok(frame) => {
                // Remove the parsed frame from the buffer.
                src.advance(position);
                Ok(Some(frame))
            }
            // Check if the buffered data exceeds the limit to prevent DoS attacks.
            Err(frame::Error::Incomplete) if src.len() > self.max_frame_size => {
                Err(Error::FrameTooLarge {
                    limit: self.max_frame_size,
                })
            }
            // Not enough data to parse a frame.
            Err(frame::Error::Incomplete) => Ok(None),
            Err(err) => {
                src.advance(position);
                Err(Error::Protocol(err))
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            // The peer went away in the middle of sending a frame.
            None => {
                let err = io::Error::new(io::ErrorKind::UnexpectedEof, "connection reset by peer");
                Err(err.into())
            }
        }
    }
}
