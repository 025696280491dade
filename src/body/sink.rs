//! Response body sink: the consumer-facing side of a response body,
//! queueing decoded DATA payloads until the caller reads them.
//!
//! Grounded on the teacher's `RecvStream`/`FlowControl` pairing
//! (`examples/carllerche-h2/src/share.rs`), restated as a `futures_core::
//! Stream` of `Bytes` chunks (design doc §4.5) rather than the teacher's
//! `poll_data` method directly, since the rest of this crate's async
//! surface is expressed in terms of `Stream`/`AsyncRead`.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use futures_core::Stream;

use crate::error::Error;

/// Queues response-body chunks as they arrive from the protocol engine,
/// and hands them to the consumer in order via `Stream::poll_next`.
///
/// Per the design's rule for a sink that's empty but not yet complete: the
/// session drives one blocking `feed_input` step on the session driver
/// before the consumer is woken, rather than the sink itself blocking --
/// this type only tracks the queue and the waker, the session owns when
/// to actually read from the transport.
pub(crate) struct ResponseBodySink {
    chunks: VecDeque<Bytes>,
    complete: bool,
    error: Option<Error>,
    waker: Option<Waker>,
    /// Design doc §4.1's `pause`/`unpause`: while set, `poll_next` never
    /// resolves even if data or EOF is already queued. Wire I/O is
    /// unaffected -- `add`/`complete`/`fail` keep populating the queue,
    /// they just don't wake the consumer until unpaused.
    paused: bool,
}

impl ResponseBodySink {
    pub fn new() -> ResponseBodySink {
        ResponseBodySink {
            chunks: VecDeque::new(),
            complete: false,
            error: None,
            waker: None,
            paused: false,
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            self.wake();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Non-consuming readiness check for design doc §4.1's
    /// `run_until_readable`: ready once a chunk is queued, the body is
    /// complete, or it has failed; `Pending` (after registering `cx`'s
    /// waker) otherwise. Ignores `paused` -- pausing only withholds
    /// *delivered* chunks from `poll_next`, it does not stop the caller
    /// from learning that the stream reached `ReadingBody`/`ReadDone`.
    pub fn poll_readable(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        if !self.chunks.is_empty() || self.complete {
            return Poll::Ready(Ok(()));
        }
        self.waker = Some(cx.waker().clone());
        Poll::Pending
    }

    /// Called by the session when a DATA frame for this stream decodes.
    pub fn add(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.chunks.push_back(chunk);
        }
        self.wake();
    }

    /// Called once the stream's response is fully received (END_STREAM) or
    /// has failed.
    pub fn complete(&mut self) {
        self.complete = true;
        self.wake();
    }

    pub fn fail(&mut self, err: Error) {
        self.error.get_or_insert(err);
        self.complete = true;
        self.wake();
    }

    pub fn is_complete(&self) -> bool {
        self.complete && self.chunks.is_empty()
    }

    fn wake(&mut self) {
        if let Some(w) = self.waker.take() {
            w.wake();
        }
    }
}

impl Stream for ResponseBodySink {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.paused {
            self.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        if let Some(chunk) = self.chunks.pop_front() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if let Some(err) = self.error.take() {
            return Poll::Ready(Some(Err(err)));
        }
        if self.complete {
            return Poll::Ready(None);
        }
        self.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}
