//! Serializes frames into the outbound byte buffer.
//!
//! Grounded on the teacher's `proto::FramedWrite`: one HPACK encoder shared
//! across every `HEADERS` frame on the connection, and a single growable
//! write buffer the session drains to the transport.

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::Frame;

const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

pub(crate) struct FramedWrite {
    hpack: hpack::Encoder<'static>,
    buf: BytesMut,
}

impl FramedWrite {
    pub fn new() -> FramedWrite {
        FramedWrite {
            hpack: hpack::Encoder::new(),
            buf: BytesMut::with_capacity(DEFAULT_BUFFER_CAPACITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write(&mut self, frame: Frame) {
        match frame {
            Frame::Data(v) => v.encode(&mut self.buf),
            Frame::Headers(v) => v.encode(&mut self.hpack, &mut self.buf),
            Frame::Priority(v) => v.encode(&mut self.buf),
            Frame::RstStream(v) => v.encode(&mut self.buf),
            Frame::Settings(v) => v.encode(&mut self.buf),
            Frame::Ping(v) => v.encode(&mut self.buf),
            Frame::GoAway(v) => v.encode(&mut self.buf),
            Frame::WindowUpdate(v) => v.encode(&mut self.buf),
        }
    }

    /// Takes the entire pending write buffer as one chunk. The caller must
    /// fully write it before calling this again (the "one outstanding
    /// chunk" invariant lives in `session::io_driver`, not here).
    pub fn take_chunk(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            return None;
        }
        Some(std::mem::replace(&mut self.buf, BytesMut::with_capacity(DEFAULT_BUFFER_CAPACITY)).freeze())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }
}

/// The client connection preface, sent once before any frame.
pub(crate) const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
