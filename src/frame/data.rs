use bytes::{Buf, BufMut, Bytes};

use super::{Error, Head, Kind, StreamId};

const END_STREAM: u8 = 0x1;
const PADDED: u8 = 0x8;

/// A `DATA` frame: a chunk of a request or response body.
#[derive(Debug)]
pub struct Data {
    stream_id: StreamId,
    payload: Bytes,
    end_stream: bool,
}

impl Data {
    pub fn new(stream_id: StreamId, payload: Bytes, end_stream: bool) -> Data {
        Data {
            stream_id,
            payload,
            end_stream,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_stream(&self) -> bool {
        self.end_stream
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn load(head: Head, mut payload: Bytes) -> Result<Data, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        if head.flag() & PADDED != 0 {
            if payload.is_empty() {
                return Err(Error::TooMuchPadding);
            }
            let pad_len = payload[0] as usize;
            payload.advance(1);
            if pad_len > payload.len() {
                return Err(Error::TooMuchPadding);
            }
            payload.truncate(payload.len() - pad_len);
        }

        Ok(Data {
            stream_id: head.stream_id(),
            payload,
            end_stream: head.flag() & END_STREAM != 0,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let flag = if self.end_stream { END_STREAM } else { 0 };
        let head = Head::new(Kind::Data, flag, self.stream_id);
        head.encode(self.payload.len(), dst);
        dst.put_slice(&self.payload);
    }
}

impl From<Data> for super::Frame {
    fn from(src: Data) -> Self {
        super::Frame::Data(src)
    }
}
