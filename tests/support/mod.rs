//! A minimal scripted HTTP/2 peer for end-to-end tests, grounded on the
//! teacher's `tests/support` harness (`examples/carllerche-h2/tests/
//! support/util.rs`), reworked for the async API this crate exposes: the
//! teacher drove a futures 0.1 mock; this one drives a `tokio::io::duplex`
//! pair directly, reading and writing raw HTTP/2 frames by hand rather
//! than depending on this crate's own (private) codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub struct MockPeer {
    io: DuplexStream,
    encoder: hpack::Encoder<'static>,
    decoder: hpack::Decoder<'static>,
}

#[derive(Debug)]
pub struct RawFrame {
    pub kind: u8,
    pub flags: u8,
    pub stream_id: u32,
    pub payload: Bytes,
}

impl MockPeer {
    /// Wraps the server half of a `duplex` pair, consuming the client
    /// preface and its startup `SETTINGS` frame (replying with a bare
    /// `SETTINGS` ack, the minimum a client requires to consider the
    /// handshake complete).
    pub async fn accept(mut io: DuplexStream) -> MockPeer {
        let mut preface = [0u8; 24];
        io.read_exact(&mut preface).await.expect("read client preface");
        assert_eq!(&preface[..], PREFACE, "client sent a malformed connection preface");

        let mut peer = MockPeer {
            io,
            encoder: hpack::Encoder::new(),
            decoder: hpack::Decoder::new(),
        };

        // The client's startup SETTINGS frame, then its connection-level
        // WINDOW_UPDATE raising the session window to 32 MiB.
        let settings = peer.read_frame().await;
        assert_eq!(settings.kind, 4, "expected client SETTINGS frame");
        let window_update = peer.read_frame().await;
        assert_eq!(window_update.kind, 8, "expected client connection WINDOW_UPDATE");

        peer.write_frame(4, 0x1, 0, &[]).await; // SETTINGS ack

        peer
    }

    pub async fn read_frame(&mut self) -> RawFrame {
        let mut head = [0u8; 9];
        self.io.read_exact(&mut head).await.expect("read frame header");
        let len = (u32::from(head[0]) << 16 | u32::from(head[1]) << 8 | u32::from(head[2])) as usize;
        let kind = head[3];
        let flags = head[4];
        let stream_id = u32::from_be_bytes([head[5], head[6], head[7], head[8]]) & !(1 << 31);

        let mut payload = vec![0u8; len];
        if len > 0 {
            self.io.read_exact(&mut payload).await.expect("read frame payload");
        }

        RawFrame { kind, flags, stream_id, payload: Bytes::from(payload) }
    }

    /// Reads frames until it finds one that isn't a PING/WINDOW_UPDATE (the
    /// client may interleave those at any time), returning the first
    /// "interesting" frame.
    pub async fn read_significant_frame(&mut self) -> RawFrame {
        loop {
            let frame = self.read_frame().await;
            if frame.kind != 6 && frame.kind != 8 {
                return frame;
            }
        }
    }

    pub async fn write_frame(&mut self, kind: u8, flags: u8, stream_id: u32, payload: &[u8]) {
        let mut buf = BytesMut::with_capacity(9 + payload.len());
        buf.put_u8((payload.len() >> 16) as u8);
        buf.put_u8((payload.len() >> 8) as u8);
        buf.put_u8(payload.len() as u8);
        buf.put_u8(kind);
        buf.put_u8(flags);
        buf.put_u32(stream_id);
        buf.put_slice(payload);
        self.io.write_all(&buf).await.expect("write frame");
    }

    /// Decodes a client HEADERS frame's payload (assumes no padding/
    /// priority flags, which this crate's HEADERS encoder never sets) into
    /// `(pseudo-headers, regular headers)` name/value pairs.
    pub fn decode_headers(&mut self, payload: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.decoder.decode(payload).expect("decode client HPACK block")
    }

    /// Encodes and sends a response HEADERS frame with `:status` plus the
    /// given extra header fields.
    pub async fn send_response_headers(&mut self, stream_id: u32, status: u16, end_stream: bool, extra: &[(&str, &str)]) {
        let status_str = status.to_string();
        let mut pairs: Vec<(&[u8], &[u8])> = vec![(b":status", status_str.as_bytes())];
        for (k, v) in extra {
            pairs.push((k.as_bytes(), v.as_bytes()));
        }
        let encoded = self.encoder.encode(pairs.into_iter());
        let flags = if end_stream { 0x4 | 0x1 } else { 0x4 };
        self.write_frame(1, flags, stream_id, &encoded).await;
    }

    pub async fn send_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool) {
        let flags = if end_stream { 0x1 } else { 0x0 };
        self.write_frame(0, flags, stream_id, data).await;
    }

    pub async fn send_rst_stream(&mut self, stream_id: u32, error_code: u32) {
        let mut payload = BytesMut::new();
        payload.put_u32(error_code);
        self.write_frame(3, 0, stream_id, &payload).await;
    }

    pub async fn send_goaway(&mut self, last_stream_id: u32, error_code: u32) {
        let mut payload = BytesMut::new();
        payload.put_u32(last_stream_id);
        payload.put_u32(error_code);
        self.write_frame(7, 0, 0, &payload).await;
    }

    pub async fn send_window_update(&mut self, stream_id: u32, increment: u32) {
        let mut payload = BytesMut::new();
        payload.put_u32(increment);
        self.write_frame(8, 0, stream_id, &payload).await;
    }

    pub fn into_io(self) -> DuplexStream {
        self.io
    }
}

pub fn read_u32(buf: &[u8]) -> u32 {
    let mut b = buf;
    b.get_u32()
}

/// Spins up an in-memory connection: returns the client-facing handles plus
/// a `MockPeer` already past the handshake.
pub async fn setup() -> (h2_engine::SendRequest, tokio::task::JoinHandle<()>, MockPeer) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer_handle = tokio::spawn(MockPeer::accept(server_io));

    let (send_request, connection) = h2_engine::handshake(client_io)
        .await
        .expect("handshake should never fail writing to a fresh duplex pair");
    let conn_task = tokio::spawn(connection.run());

    let peer = peer_handle.await.expect("mock peer accept task panicked");

    (send_request, conn_task, peer)
}
