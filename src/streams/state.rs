//! The per-stream state machine (design doc §4.3) and the `Stream` record
//! the registry stores for each in-flight exchange.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::body::ResponseBodySink;
use crate::error::Error;
use crate::frame::StreamId;
use crate::session::ResponseHead;

/// Strictly-monotone per-exchange state.
///
/// ```text
/// None -> WriteHeaders -> WriteData? -> WriteDone -> ReadHeaders -> ReadDataStart? -> ReadingBody -> ReadDone
/// ```
///
/// A transition backwards is a defect (see `Stream::set_state`, which
/// asserts monotonicity in debug builds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamState {
    None,
    WriteHeaders,
    WriteData,
    WriteDone,
    ReadHeaders,
    ReadDataStart,
    ReadingBody,
    ReadDone,
}

impl StreamState {
    fn rank(self) -> u8 {
        self as u8
    }
}

/// Per-message byte/time counters (design doc §6 "Metrics").
#[derive(Debug, Default, Clone)]
pub struct StreamMetrics {
    pub request_header_bytes: u64,
    pub request_body_bytes: u64,
    pub response_header_bytes: u64,
    pub response_body_bytes: u64,
    pub response_start: Option<Instant>,
    pub response_end: Option<Instant>,
}

/// One in-flight HTTP/2 exchange.
pub(crate) struct Stream {
    pub id: Option<StreamId>,
    pub state: StreamState,

    /// Shared with the `ResponseFuture`/`ResponseBody` handles already
    /// returned to the caller, the same way `response` is -- so a caller
    /// can read a live snapshot without round-tripping through the session.
    pub metrics: Arc<Mutex<StreamMetrics>>,

    pub expect_continue: bool,

    pub error: Option<Error>,

    pub flow_control: super::flow_control::FlowControl,

    /// Shared with the `ResponseBody` handle returned to the caller once
    /// headers arrive; the session pushes chunks into it as DATA frames
    /// decode.
    pub response: Arc<Mutex<ResponseBodySink>>,

    /// Resolved exactly once, with the first non-informational response
    /// headers (or an error if the stream fails before any arrive).
    pub head_tx: Option<tokio::sync::oneshot::Sender<Result<ResponseHead, Error>>>,
}

impl Stream {
    pub fn new() -> Stream {
        Stream {
            id: None,
            state: StreamState::None,
            metrics: Arc::new(Mutex::new(StreamMetrics::default())),
            expect_continue: false,
            error: None,
            flow_control: super::flow_control::FlowControl::new(crate::frame::DEFAULT_INITIAL_WINDOW_SIZE),
            response: Arc::new(Mutex::new(ResponseBodySink::new())),
            head_tx: None,
        }
    }

    /// Resolves the pending response-headers future, if the caller hasn't
    /// already received it.
    pub fn resolve_head(&mut self, result: Result<ResponseHead, Error>) {
        if let Some(tx) = self.head_tx.take() {
            let _ = tx.send(result);
        }
    }

    /// Moves the state machine forward. Panics in debug builds if `next`
    /// would move it backwards or skip over `ReadDone` -- the design
    /// explicitly calls a backwards transition a defect, not a recoverable
    /// error.
    pub fn set_state(&mut self, next: StreamState) {
        debug_assert!(
            next.rank() >= self.state.rank(),
            "illegal stream state transition: {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    pub fn set_first_error(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::ReadDone || self.error.is_some()
    }
}
