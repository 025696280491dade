//! Accumulates received bytes and yields complete HTTP/2 frames.
//!
//! Grounded on the teacher's `codec::FramedRead`, adapted from a
//! `tokio_io::codec::length_delimited` wrapper to a small hand-rolled
//! accumulator: HTTP/2's 9-byte header + 24-bit length doesn't fit the
//! generic length-delimited codec's length-field shapes as cleanly as a
//! few lines of direct parsing.

use bytes::{Buf, Bytes, BytesMut};

use crate::frame::{self, Head};

pub(crate) struct FramedRead {
    buf: BytesMut,
    max_frame_size: usize,
}

impl FramedRead {
    pub fn new() -> FramedRead {
        FramedRead {
            buf: BytesMut::with_capacity(8 * 1024),
            max_frame_size: frame::DEFAULT_MAX_FRAME_SIZE as usize,
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pulls the next complete raw frame out of the buffer, deferring
    /// HPACK decoding (which needs the shared decoder) to the caller.
    pub fn decode_head(&mut self) -> Result<Option<(Head, Bytes)>, frame::Error> {
        if self.buf.len() < frame::HEADER_LEN {
            return Ok(None);
        }

        let (head, len) = Head::parse(&self.buf[..frame::HEADER_LEN])?;
        let len = len as usize;

        if len > self.max_frame_size {
            return Err(frame::Error::BadFrameSize);
        }

        if self.buf.len() < frame::HEADER_LEN + len {
            self.buf.reserve(frame::HEADER_LEN + len - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(frame::HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();

        Ok(Some((head, payload)))
    }
}
