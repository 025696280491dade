use bytes::BufMut;

use super::util::{read_u24, write_u24};
use super::{Error, HEADER_LEN};

/// An HTTP/2 stream identifier. `0` is reserved for connection-level frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(u32);

impl StreamId {
    pub const ZERO: StreamId = StreamId(0);

    pub fn new(id: u32) -> StreamId {
        StreamId(id & !(1 << 31))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The next client-initiated (odd) stream id after this one.
    pub fn next_client_id(&self) -> Option<StreamId> {
        self.0.checked_add(2).map(StreamId)
    }
}

impl From<u32> for StreamId {
    fn from(v: u32) -> Self {
        StreamId::new(v)
    }
}

impl From<StreamId> for u32 {
    fn from(v: StreamId) -> Self {
        v.0
    }
}

/// The very first client-initiated stream id.
pub const FIRST_CLIENT_STREAM_ID: StreamId = StreamId(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Data = 0,
    Headers = 1,
    Priority = 2,
    RstStream = 3,
    Settings = 4,
    PushPromise = 5,
    Ping = 6,
    GoAway = 7,
    WindowUpdate = 8,
    Continuation = 9,
}

impl Kind {
    pub fn from_u8(v: u8) -> Option<Kind> {
        use Kind::*;
        Some(match v {
            0 => Data,
            1 => Headers,
            2 => Priority,
            3 => RstStream,
            4 => Settings,
            5 => PushPromise,
            6 => Ping,
            7 => GoAway,
            8 => WindowUpdate,
            9 => Continuation,
            _ => return None,
        })
    }
}

/// The fixed 9-byte frame header shared by every HTTP/2 frame.
#[derive(Debug, Clone, Copy)]
pub struct Head {
    kind: Kind,
    flag: u8,
    stream_id: StreamId,
}

impl Head {
    pub fn new(kind: Kind, flag: u8, stream_id: StreamId) -> Head {
        Head {
            kind,
            flag,
            stream_id,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Parses a 9-byte frame header. `len` is the payload length field,
    /// returned separately since `Head` itself doesn't carry it once the
    /// payload has been sliced out by the caller.
    pub fn parse(buf: &[u8]) -> Result<(Head, u32), Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Short);
        }

        let len = read_u24(&buf[0..3]);
        let kind = Kind::from_u8(buf[3]).ok_or(Error::BadKind)?;
        let flag = buf[4];
        let stream_id = StreamId::new(u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]));

        Ok((
            Head {
                kind,
                flag,
                stream_id,
            },
            len,
        ))
    }

    /// Writes the 9-byte frame header with the given payload length.
    pub fn encode<B: BufMut>(&self, len: usize, dst: &mut B) {
        write_u24(dst, len as u32);
        dst.put_u8(self.kind as u8);
        dst.put_u8(self.flag);
        dst.put_u32(u32::from(self.stream_id));
    }
}
