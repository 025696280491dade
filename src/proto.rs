//! The `ProtocolEngine` interface between the session engine and whatever
//! drives HPACK/framing/flow control (`codec::Codec` in this crate).
//!
//! The session depends on exactly these semantics (spec.md §4.2) and does
//! not assume any particular implementation beyond them; `codec::Codec` is
//! the only implementation in this crate, but the trait boundary exists so
//! tests can substitute a scripted mock engine for the end-to-end
//! scenarios in `tests/`.

use bytes::Bytes;

use crate::error::{ProtoError, Reason};
use crate::frame::{self, StreamId};

/// A decoded protocol event, delivered synchronously to the session's
/// callback while `feed_input` is parsing received bytes -- mirroring the
/// design's "some protocol engines invoke user callbacks synchronously
/// from `feed_input`" note (DESIGN.md / spec.md §9).
#[derive(Debug)]
pub(crate) enum ProtoEvent {
    BeginHeaders(StreamId),
    Headers(StreamId, frame::Headers),
    BeginData(StreamId),
    Data(StreamId, Bytes, bool),
    WindowUpdate(StreamId, u32),
    RstStream(StreamId, Reason),
    GoAway(frame::GoAway),
    SettingsReceived(frame::Settings),
    Ping(frame::Ping),
}

/// A request to submit a new, client-initiated stream.
pub(crate) struct NewStream {
    pub pseudo: frame::Pseudo,
    pub fields: http::HeaderMap,
    /// Logical weight, `1..=256` (see `crate::priority`).
    pub weight: u16,
    pub has_body: bool,
}

pub(crate) trait ProtocolEngine {
    /// Assigns a stream id and submits HEADERS (and DATA, if `has_body` and
    /// the caller isn't withholding it for `Expect: 100-continue`).
    fn submit_request(&mut self, req: NewStream) -> Result<StreamId, ProtoError>;

    /// Submits as much of `data` as the peer's advertised stream/session
    /// window (and the negotiated max frame size) currently allow, writing
    /// one or more DATA frames; `end_stream` is only actually set on the
    /// wire once every byte of `data` has gone out. Returns whatever
    /// portion of `data` could not be sent yet (empty once everything has
    /// gone out) -- the caller must hold onto it and retry after observing
    /// a `WindowUpdate` event rather than asking the body source for more.
    fn submit_data(&mut self, id: StreamId, data: Bytes, end_stream: bool) -> Result<Bytes, ProtoError>;

    fn submit_priority(&mut self, id: StreamId, depends_on: StreamId, weight: u8, exclusive: bool);

    fn submit_rst_stream(&mut self, id: StreamId, reason: Reason);

    fn submit_settings(&mut self, settings: frame::Settings);

    fn submit_window_update(&mut self, id: StreamId, increment: u32);

    fn submit_goaway(&mut self, last_stream_id: StreamId, reason: Reason);

    /// Feeds newly-received transport bytes to the engine. Each fully
    /// decoded frame synchronously invokes `on_event` before this call
    /// returns. Returns whether the engine still wants more input right
    /// now (it may have buffered a partial frame).
    fn feed_input(&mut self, bytes: &[u8], on_event: &mut dyn FnMut(ProtoEvent)) -> Result<(), ProtoError>;

    /// Returns the next chunk of bytes to write to the transport, if any
    /// is pending. The caller must fully write (or fail) this chunk before
    /// requesting another.
    fn request_next_output_chunk(&mut self) -> Option<Bytes>;

    fn wants_write(&self) -> bool;

    fn stream_remote_window(&self, id: StreamId) -> i64;

    fn session_remote_window(&self) -> i64;
}
