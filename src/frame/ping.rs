use bytes::{Buf, BufMut, Bytes};

use super::{Error, Head, Kind, StreamId};

const ACK_FLAG: u8 = 0x1;

/// A `PING` frame, used for RTT measurement and liveness checks. Not driven
/// by the session engine directly (out of scope per the upward API), but
/// the codec must still parse and ack it to stay protocol-compliant.
#[derive(Debug)]
pub struct Ping {
    ack: bool,
    payload: [u8; 8],
}

impl Ping {
    pub fn ping(payload: [u8; 8]) -> Ping {
        Ping { ack: false, payload }
    }

    pub fn pong(payload: [u8; 8]) -> Ping {
        Ping { ack: true, payload }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn payload(&self) -> [u8; 8] {
        self.payload
    }

    pub fn load(head: Head, payload: Bytes) -> Result<Ping, Error> {
        if !head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        if payload.len() != 8 {
            return Err(Error::BadFrameSize);
        }

        let mut buf = [0u8; 8];
        payload.clone().copy_to_slice(&mut buf);

        Ok(Ping {
            ack: head.flag() & ACK_FLAG != 0,
            payload: buf,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let flag = if self.ack { ACK_FLAG } else { 0 };
        let head = Head::new(Kind::Ping, flag, StreamId::ZERO);
        head.encode(8, dst);
        dst.put_slice(&self.payload);
    }
}

impl From<Ping> for super::Frame {
    fn from(src: Ping) -> Self {
        super::Frame::Ping(src)
    }
}
