use bytes::{Buf, BufMut};

use super::{Error, Head, Kind, StreamId};

/// A `WINDOW_UPDATE` frame, raising either the connection-level window
/// (`stream_id == 0`) or a single stream's window.
#[derive(Debug)]
pub struct WindowUpdate {
    stream_id: StreamId,
    increment: u32,
}

impl WindowUpdate {
    pub fn new(stream_id: StreamId, increment: u32) -> WindowUpdate {
        WindowUpdate {
            stream_id,
            increment,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn size_increment(&self) -> u32 {
        self.increment
    }

    pub fn load(head: Head, mut payload: bytes::Bytes) -> Result<WindowUpdate, Error> {
        if payload.len() != 4 {
            return Err(Error::BadFrameSize);
        }
        let increment = payload.get_u32() & !(1 << 31);
        if increment == 0 {
            return Err(Error::PayloadTooShort);
        }
        Ok(WindowUpdate {
            stream_id: head.stream_id(),
            increment,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::WindowUpdate, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.increment & !(1 << 31));
    }
}

impl From<WindowUpdate> for super::Frame {
    fn from(src: WindowUpdate) -> Self {
        super::Frame::WindowUpdate(src)
    }
}
