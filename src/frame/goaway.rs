use bytes::{Buf, BufMut, Bytes};

use crate::error::Reason;

use super::{Error, Head, Kind, StreamId};

/// A `GOAWAY` frame: the peer is beginning (or completing) a graceful or
/// fatal shutdown of the session, naming the last stream id it will
/// process.
#[derive(Debug)]
pub struct GoAway {
    last_stream_id: StreamId,
    reason: Reason,
    debug_data: Bytes,
}

impl GoAway {
    pub fn new(last_stream_id: StreamId, reason: Reason) -> GoAway {
        GoAway {
            last_stream_id,
            reason,
            debug_data: Bytes::new(),
        }
    }

    pub fn last_stream_id(&self) -> StreamId {
        self.last_stream_id
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn debug_data(&self) -> &Bytes {
        &self.debug_data
    }

    pub fn load(_head: Head, mut payload: Bytes) -> Result<GoAway, Error> {
        if payload.len() < 8 {
            return Err(Error::BadFrameSize);
        }
        let last_stream_id = StreamId::new(payload.get_u32() & !(1 << 31));
        let reason = Reason::from_u32(payload.get_u32());
        let debug_data = payload;

        Ok(GoAway {
            last_stream_id,
            reason,
            debug_data,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::GoAway, 0, StreamId::ZERO);
        head.encode(8 + self.debug_data.len(), dst);
        dst.put_u32(u32::from(self.last_stream_id) & !(1 << 31));
        dst.put_u32(self.reason.into_u32());
        dst.put_slice(&self.debug_data);
    }
}

impl From<GoAway> for super::Frame {
    fn from(src: GoAway) -> Self {
        super::Frame::GoAway(src)
    }
}
