use bytes::{Buf, BufMut};

use super::{Error, Head, Kind, StreamId};

/// A `PRIORITY` frame: advises the peer of a new stream dependency and
/// weight. This engine always sends `depends_on = 0` (root) per the
/// design's priority mapping, but can parse an arbitrary dependency for
/// completeness.
#[derive(Debug)]
pub struct Priority {
    stream_id: StreamId,
    depends_on: StreamId,
    weight: u8,
    exclusive: bool,
}

impl Priority {
    pub fn new(stream_id: StreamId, depends_on: StreamId, weight: u8, exclusive: bool) -> Priority {
        Priority {
            stream_id,
            depends_on,
            weight,
            exclusive,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn dependency(&self) -> StreamId {
        self.depends_on
    }

    /// Wire weight is `[0, 255]`; the logical weight is this plus one.
    pub fn weight(&self) -> u8 {
        self.weight
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn load(head: Head, mut payload: bytes::Bytes) -> Result<Priority, Error> {
        if payload.len() != 5 {
            return Err(Error::BadFrameSize);
        }
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        let raw = payload.get_u32();
        let exclusive = raw & (1 << 31) != 0;
        let depends_on = StreamId::new(raw & !(1 << 31));
        let weight = payload.get_u8();

        Ok(Priority {
            stream_id: head.stream_id(),
            depends_on,
            weight,
            exclusive,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::Priority, 0, self.stream_id);
        head.encode(5, dst);
        let mut raw = u32::from(self.depends_on) & !(1 << 31);
        if self.exclusive {
            raw |= 1 << 31;
        }
        dst.put_u32(raw);
        dst.put_u8(self.weight);
    }
}

impl From<Priority> for super::Frame {
    fn from(src: Priority) -> Self {
        super::Frame::Priority(src)
    }
}
