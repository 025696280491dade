use bytes::{Buf, BufMut};

use crate::error::Reason;

use super::{Error, Head, Kind, StreamId};

/// A `RST_STREAM` frame, aborting a single stream with an error code.
#[derive(Debug)]
pub struct RstStream {
    stream_id: StreamId,
    reason: Reason,
}

impl RstStream {
    pub fn new(stream_id: StreamId, reason: Reason) -> RstStream {
        RstStream { stream_id, reason }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn load(head: Head, mut payload: bytes::Bytes) -> Result<RstStream, Error> {
        if payload.len() != 4 {
            return Err(Error::BadFrameSize);
        }
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }
        let reason = Reason::from_u32(payload.get_u32());
        Ok(RstStream {
            stream_id: head.stream_id(),
            reason,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::RstStream, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.reason.into_u32());
    }
}

impl From<RstStream> for super::Frame {
    fn from(src: RstStream) -> Self {
        super::Frame::RstStream(src)
    }
}
