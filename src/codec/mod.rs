//! `Codec`: the concrete `ProtocolEngine` implementation, combining HPACK,
//! framing and basic flow-control bookkeeping. Grounded on the teacher's
//! `Codec`/`proto::Connection` pairing (`examples/carllerche-h2/src/proto/
//! mod.rs`), generalized to the `ProtocolEngine` trait in `crate::proto`.

mod framed_read;
mod framed_write;

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{ProtoError, Reason};
use crate::frame::{self, Frame, Kind, StreamId};
use crate::proto::{NewStream, ProtoEvent, ProtocolEngine};

use self::framed_read::FramedRead;
use self::framed_write::FramedWrite;

/// Per-connection window bookkeeping the codec needs to answer
/// `stream_remote_window`/`session_remote_window` and to clamp outbound
/// DATA frames to what the peer has granted.
struct Windows {
    session_remote: i64,
    stream_remote: HashMap<StreamId, i64>,
}

pub(crate) struct Codec {
    read: FramedRead,
    write: FramedWrite,
    hpack_decoder: hpack::Decoder<'static>,
    next_stream_id: Option<StreamId>,
    windows: Windows,
    /// The peer's `SETTINGS_INITIAL_WINDOW_SIZE`, used to seed every new
    /// stream's remote window. Starts at the RFC 7540 §6.5.2 default of
    /// 65535 and is only ever updated by the peer's own SETTINGS frame --
    /// never by the value we advertise about ourselves.
    peer_initial_window: i64,
    max_frame_size: usize,
    goaway_sent: bool,
}

impl Codec {
    pub fn new() -> Codec {
        Codec {
            read: FramedRead::new(),
            write: FramedWrite::new(),
            hpack_decoder: hpack::Decoder::new(),
            next_stream_id: Some(frame::FIRST_CLIENT_STREAM_ID),
            windows: Windows {
                session_remote: frame::HTTP2_DEFAULT_WINDOW_SIZE as i64,
                stream_remote: HashMap::new(),
            },
            peer_initial_window: frame::HTTP2_DEFAULT_WINDOW_SIZE as i64,
            max_frame_size: frame::DEFAULT_MAX_FRAME_SIZE as usize,
            goaway_sent: false,
        }
    }

    /// Writes the client connection preface and the startup SETTINGS
    /// frame, per the design's external interface: exactly three settings
    /// (`INITIAL_WINDOW_SIZE = 32 MiB`, `HEADER_TABLE_SIZE = 65536`,
    /// `ENABLE_PUSH = 0`), followed by a stream-0 WINDOW_UPDATE raising the
    /// connection window to match. Both describe the window we grant the
    /// peer for data it sends *us*; they say nothing about the peer's own
    /// receive window, which is what `self.windows` tracks.
    pub fn send_preface(&mut self) {
        self.write.write_raw(framed_write::PREFACE);
        self.submit_settings(frame::startup_settings());
        self.write.write(Frame::WindowUpdate(frame::WindowUpdate::new(
            StreamId::ZERO,
            frame::DEFAULT_INITIAL_WINDOW_SIZE,
        )));
    }

    fn alloc_stream_id(&mut self) -> Result<StreamId, ProtoError> {
        let id = self.next_stream_id.ok_or(ProtoError::StreamIdExhausted)?;
        self.next_stream_id = id.next_client_id();
        self.windows.stream_remote.insert(id, self.peer_initial_window);
        Ok(id)
    }
}

impl ProtocolEngine for Codec {
    fn submit_request(&mut self, req: NewStream) -> Result<StreamId, ProtoError> {
        let id = self.alloc_stream_id()?;

        let headers = frame::Headers::new(id, req.pseudo, req.fields, !req.has_body);
        self.write.write(Frame::Headers(headers));

        // Initial priority is carried as a follow-up PRIORITY frame rather
        // than the HEADERS frame's own priority flag; wire-equivalent, and
        // it keeps `frame::Headers::encode` free of priority-field
        // handling it would otherwise need just for this one caller.
        if req.weight != crate::priority::DEFAULT_WEIGHT {
            let wire_weight = crate::priority::logical_to_wire(req.weight);
            self.submit_priority(id, StreamId::ZERO, wire_weight, false);
        }

        Ok(id)
    }

    fn submit_data(&mut self, id: StreamId, data: Bytes, end_stream: bool) -> Result<Bytes, ProtoError> {
        if data.is_empty() {
            if end_stream {
                self.write.write(Frame::Data(frame::Data::new(id, data, true)));
            }
            return Ok(Bytes::new());
        }

        let avail = self.stream_remote_window(id).min(self.session_remote_window()).max(0) as usize;
        let avail = avail.min(self.max_frame_size);

        if avail == 0 {
            // Window-starved: send nothing, let the caller hold the whole
            // chunk until a WINDOW_UPDATE reopens the window.
            return Ok(data);
        }

        if data.len() <= avail {
            if let Some(w) = self.windows.stream_remote.get_mut(&id) {
                *w -= data.len() as i64;
            }
            self.windows.session_remote -= data.len() as i64;
            self.write.write(Frame::Data(frame::Data::new(id, data, end_stream)));
            Ok(Bytes::new())
        } else {
            let mut data = data;
            let chunk = data.split_to(avail);
            if let Some(w) = self.windows.stream_remote.get_mut(&id) {
                *w -= chunk.len() as i64;
            }
            self.windows.session_remote -= chunk.len() as i64;
            // Only the final frame carrying the last byte of `data` may set
            // END_STREAM; the rest of `data` is still to come.
            self.write.write(Frame::Data(frame::Data::new(id, chunk, false)));
            Ok(data)
        }
    }

    fn submit_priority(&mut self, id: StreamId, depends_on: StreamId, weight: u8, exclusive: bool) {
        self.write.write(Frame::Priority(frame::PriorityFrame::new(
            id, depends_on, weight, exclusive,
        )));
    }

    fn submit_rst_stream(&mut self, id: StreamId, reason: Reason) {
        self.windows.stream_remote.remove(&id);
        self.write.write(Frame::RstStream(frame::RstStream::new(id, reason)));
    }

    fn submit_settings(&mut self, settings: frame::Settings) {
        self.write.write(Frame::Settings(settings));
    }

    fn submit_window_update(&mut self, id: StreamId, increment: u32) {
        self.write.write(Frame::WindowUpdate(frame::WindowUpdate::new(id, increment)));
    }

    fn submit_goaway(&mut self, last_stream_id: StreamId, reason: Reason) {
        self.goaway_sent = true;
        self.write.write(Frame::GoAway(frame::GoAway::new(last_stream_id, reason)));
    }

    fn feed_input(&mut self, bytes: &[u8], on_event: &mut dyn FnMut(ProtoEvent)) -> Result<(), ProtoError> {
        self.read.feed(bytes);

        loop {
            let (head, payload) = match self
                .read
                .decode_head()
                .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?
            {
                Some(v) => v,
                None => break,
            };

            match head.kind() {
                Kind::Headers => {
                    on_event(ProtoEvent::BeginHeaders(head.stream_id()));
                    let headers = frame::Headers::load(head, payload, &mut self.hpack_decoder)
                        .map_err(|_| ProtoError::Proto(Reason::CompressionError))?;
                    on_event(ProtoEvent::Headers(head.stream_id(), headers));
                }
                Kind::Data => {
                    on_event(ProtoEvent::BeginData(head.stream_id()));
                    let data = frame::Data::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    let end_stream = data.is_end_stream();
                    on_event(ProtoEvent::Data(head.stream_id(), data.into_payload(), end_stream));
                }
                Kind::WindowUpdate => {
                    let wu = frame::WindowUpdate::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    if wu.stream_id().is_zero() {
                        self.windows.session_remote += wu.size_increment() as i64;
                    } else if let Some(w) = self.windows.stream_remote.get_mut(&wu.stream_id()) {
                        *w += wu.size_increment() as i64;
                    }
                    on_event(ProtoEvent::WindowUpdate(wu.stream_id(), wu.size_increment()));
                }
                Kind::RstStream => {
                    let rst = frame::RstStream::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    self.windows.stream_remote.remove(&rst.stream_id());
                    on_event(ProtoEvent::RstStream(rst.stream_id(), rst.reason()));
                }
                Kind::GoAway => {
                    let goaway = frame::GoAway::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    on_event(ProtoEvent::GoAway(goaway));
                }
                Kind::Settings => {
                    let settings = frame::Settings::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    if !settings.is_ack() {
                        if let Some(sz) = settings.max_frame_size() {
                            // The peer's SETTINGS_MAX_FRAME_SIZE bounds what
                            // *we* may send it, not what it may send us --
                            // our own accept limit (`self.read`) never
                            // changes since we never advertise a non-default
                            // value in our own SETTINGS.
                            self.max_frame_size = sz as usize;
                        }
                        if let Some(new_initial) = settings.initial_window_size() {
                            // RFC 7540 §6.9.2: a changed
                            // SETTINGS_INITIAL_WINDOW_SIZE adjusts every
                            // currently open stream's remote window by the
                            // delta; it never touches the connection-level
                            // window, and only applies to streams opened
                            // after this point for the delta to mean
                            // anything for streams not yet created.
                            let delta = new_initial as i64 - self.peer_initial_window;
                            for w in self.windows.stream_remote.values_mut() {
                                *w += delta;
                            }
                            self.peer_initial_window = new_initial as i64;
                        }
                        self.write.write(Frame::Settings(frame::Settings::ack()));
                    }
                    on_event(ProtoEvent::SettingsReceived(settings));
                }
                Kind::Ping => {
                    let ping = frame::Ping::load(head, payload)
                        .map_err(|_| ProtoError::Proto(Reason::ProtocolError))?;
                    if !ping.is_ack() {
                        self.write.write(Frame::Ping(frame::Ping::pong(ping.payload())));
                    }
                    on_event(ProtoEvent::Ping(ping));
                }
                Kind::Priority => {
                    // Server-advertised priority is accepted but not acted
                    // on (out of scope: client-only engine never
                    // reprioritizes its own requests based on peer input).
                    let _ = frame::PriorityFrame::load(head, payload);
                }
                Kind::PushPromise | Kind::Continuation => {
                    // Push is disabled via ENABLE_PUSH=0; a compliant peer
                    // never sends PUSH_PROMISE. Treat either as a protocol
                    // error rather than silently accepting it.
                    return Err(ProtoError::Proto(Reason::ProtocolError));
                }
            }
        }

        Ok(())
    }

    fn request_next_output_chunk(&mut self) -> Option<Bytes> {
        self.write.take_chunk()
    }

    fn wants_write(&self) -> bool {
        !self.write.is_empty()
    }

    fn stream_remote_window(&self, id: StreamId) -> i64 {
        self.windows.stream_remote.get(&id).copied().unwrap_or(0)
    }

    fn session_remote_window(&self) -> i64 {
        self.windows.session_remote
    }
}

