//! The session engine: owns the transport, drives the protocol engine, and
//! keeps the stream registry consistent with what has gone over the wire.
//!
//! Grounded on the teacher's `proto::Connection` drive loop
//! (`examples/carllerche-h2/src/proto/mod.rs` /
//! `examples/carllerche-h2/src/proto/connection.rs`), modernized from a
//! `futures` 0.1 `Future::poll` state machine to `async`/`await` (see
//! SPEC_FULL.md §2's REDESIGN note) while keeping the same separation of
//! concerns: codec drives bytes, `Streams` tracks per-exchange state, and
//! the connection-level loop is the only place that touches the
//! transport.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::body::pump::RequestBodyPump;
use crate::body::{PollableBody, ResponseBodySink};
use crate::codec::Codec;
use crate::error::{Error, Reason, SessionError};
use crate::frame::{self, StreamId};
use crate::proto::{NewStream, ProtoEvent, ProtocolEngine};
use crate::streams::{Stream, StreamMetrics, StreamState, Streams};

const READ_CHUNK: usize = 8 * 1024;

/// The first non-informational response, delivered to the caller once
/// headers decode; the body follows separately through a `ResponseBody`
/// stream backed by the stream's shared `ResponseBodySink`.
pub(crate) struct ResponseHead {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
}

/// A new request handed from a `SendRequest` handle to the session task.
pub(crate) struct RequestCommand {
    pub pseudo: frame::Pseudo,
    pub fields: http::HeaderMap,
    pub weight: u16,
    pub expect_continue: bool,
    pub body: Option<Box<dyn PollableBody>>,
    pub responder: oneshot::Sender<Result<StreamId, Error>>,
    pub head_tx: oneshot::Sender<Result<ResponseHead, Error>>,
    /// Shared with the `ResponseBody` handle already returned to the
    /// caller's future, so both sides see the same queue of chunks.
    pub response: Arc<std::sync::Mutex<ResponseBodySink>>,
    /// Shared with the caller's `ResponseFuture`/`ResponseBody`, same as
    /// `response` above; the session populates it as the exchange
    /// progresses, the caller reads a snapshot whenever it likes.
    pub metrics: Arc<Mutex<StreamMetrics>>,
}

/// Commands a live stream handle can send back to the session once it has
/// its id.
pub(crate) enum StreamCommand {
    ReleaseCapacity { id: StreamId, len: u32 },
    Cancel { id: StreamId },
    /// Finalize normally: RST_STREAM(NO_ERROR) on a stream the caller is
    /// done with before it reached `ReadDone` on its own (design doc
    /// §4.1's `finish`); a no-op if the stream already closed itself.
    Finish { id: StreamId },
    /// Discard the remaining response body: RST_STREAM(STREAM_CLOSED),
    /// further DATA is ignored (design doc §4.1's `skip`).
    Skip { id: StreamId },
    Pause { id: StreamId },
    Unpause { id: StreamId },
    /// Drop-triggered cleanup for a handle the caller abandoned without
    /// calling `finish`/`skip`/`cancel` explicitly (design doc §3: a
    /// stream is only ever destroyed once the owning handle says it's
    /// done with it). Resets with `CANCEL` only if the stream hadn't
    /// already reached `ReadDone` on its own; otherwise just drops the
    /// registry entry. A no-op if some other command already removed the
    /// stream first.
    Release { id: StreamId },
}

pub(crate) enum Command {
    Request(RequestCommand),
    Stream(StreamCommand),
    /// Begin graceful shutdown: submit GOAWAY, let in-flight streams
    /// finish, refuse new requests (design doc §4.1's `close_async`).
    CloseSession(oneshot::Sender<()>),
}

/// Drives one HTTP/2 connection: reads and writes the transport, feeds the
/// protocol engine, and keeps `Streams` in sync with decoded events.
pub(crate) struct SessionInner<T> {
    io: T,
    engine: Codec,
    streams: Streams,

    /// Guards against a protocol-engine callback re-entering the session
    /// while one is already being dispatched (design doc §5): the codec
    /// can invoke `on_event` synchronously from `feed_input`, and nothing
    /// in that callback is allowed to call back into `feed_input` itself.
    in_callback_depth: Cell<u32>,

    goaway: Option<SessionError>,
    shutting_down: bool,

    /// Mirrors `!shutting_down && goaway.is_none()` for lock-free reads
    /// from `SendRequest::is_open`/`is_reusable` (design doc §4.1), since
    /// those are called far more often than the session state changes.
    open: Arc<AtomicBool>,

    /// Resolved once GOAWAY has been flushed to the transport after a
    /// `close_async` call.
    close_waiters: Vec<oneshot::Sender<()>>,
    /// Set by `close_async` (or an incoming GOAWAY reply) while a local
    /// GOAWAY is queued but not yet confirmed written; cleared, firing
    /// `close_waiters`, the next time `flush` drains the write buffer.
    pending_goaway: bool,
    /// Whether this session has already submitted its own GOAWAY (at most
    /// one is ever sent).
    goaway_sent: bool,

    cancellation: CancellationToken,
    commands: mpsc::UnboundedReceiver<Command>,

    /// Pending request body pumps, keyed by the stream they feed.
    pumps: HashMap<StreamId, RequestBodyPump>,

    /// DATA bytes a pump already produced but `Codec::submit_data` couldn't
    /// fit under the peer's advertised window yet (design doc's flow
    /// control: the core must never emit more than the peer's window
    /// allows). Retried once a `WindowUpdate` is observed; the
    /// corresponding pump is not polled again until its entry here clears.
    pending: HashMap<StreamId, (Bytes, bool)>,

    /// Bytes `feed` couldn't hand to the protocol engine because a callback
    /// was already driving it (design doc §5 / §8: nothing may reenter the
    /// engine while `in_callback_depth > 0`). Drained by `flush` on its next
    /// call, once the outer `feed_input` borrow has ended.
    deferred_input: Vec<u8>,
}

impl<T> SessionInner<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        io: T,
        commands: mpsc::UnboundedReceiver<Command>,
        cancellation: CancellationToken,
        open: Arc<AtomicBool>,
    ) -> Self {
        let mut engine = Codec::new();
        engine.send_preface();

        SessionInner {
            io,
            engine,
            streams: Streams::new(),
            in_callback_depth: Cell::new(0),
            goaway: None,
            shutting_down: false,
            open,
            close_waiters: Vec::new(),
            pending_goaway: false,
            goaway_sent: false,
            cancellation,
            commands,
            pumps: HashMap::new(),
            pending: HashMap::new(),
            deferred_input: Vec::new(),
        }
    }

    /// Runs until the peer closes the transport, a fatal protocol error
    /// occurs, or the caller cancels the connection.
    pub async fn drive(mut self) {
        let mut read_buf = vec![0u8; READ_CHUNK];

        loop {
            if let Err(err) = self.flush().await {
                self.fail_all(Error::transport(err));
                return;
            }

            if self.shutting_down && self.streams.is_empty() {
                debug!("session shutdown complete, no streams remain");
                return;
            }

            tokio::select! {
                biased;

                _ = self.cancellation.cancelled() => {
                    self.fail_all(Error::Cancelled);
                    return;
                }

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            // All handles dropped; finish in-flight streams
                            // then stop accepting new work.
                            self.shutting_down = true;
                            self.open.store(false, Ordering::Relaxed);
                        }
                    }
                }

                n = self.io.read(&mut read_buf) => {
                    match n {
                        Ok(0) => {
                            debug!("transport closed by peer");
                            self.fail_all(Error::GoawayFatal(Reason::NoError));
                            return;
                        }
                        Ok(n) => self.feed(&read_buf[..n]),
                        Err(e) => {
                            self.fail_all(Error::transport(e));
                            return;
                        }
                    }
                }

                Some(pumped) = Self::poll_pumps(&mut self.pumps, &self.pending, &self.streams) => {
                    self.handle_pumped(pumped);
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Request(req) => self.handle_request(req),
            Command::Stream(StreamCommand::ReleaseCapacity { id, len }) => {
                if let Some(stream) = self.streams.get_mut(id) {
                    if let Some(increment) = stream.flow_control.release_capacity(len) {
                        self.engine.submit_window_update(id, increment);
                    }
                }
            }
            Command::Stream(StreamCommand::Cancel { id }) => {
                self.engine.submit_rst_stream(id, Reason::Cancel);
                if let Some(mut stream) = self.streams.remove(id) {
                    stream.set_first_error(Error::Cancelled);
                    stream.resolve_head(Err(Error::Cancelled));
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.fail(Error::Cancelled);
                    }
                }
                self.pumps.remove(&id);
                self.pending.remove(&id);
            }
            Command::Stream(StreamCommand::Finish { id }) => {
                // Already gone (peer closed it, GOAWAY failed it, ...):
                // nothing to finalize.
                if let Some(stream) = self.streams.remove(id) {
                    if !stream.is_closed() {
                        self.engine.submit_rst_stream(id, Reason::NoError);
                    }
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.complete();
                    }
                }
                self.pumps.remove(&id);
                self.pending.remove(&id);
            }
            Command::Stream(StreamCommand::Skip { id }) => {
                self.engine.submit_rst_stream(id, Reason::StreamClosed);
                if let Some(mut stream) = self.streams.remove(id) {
                    stream.set_state(StreamState::ReadDone);
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.complete();
                    }
                }
                self.pumps.remove(&id);
                self.pending.remove(&id);
            }
            Command::Stream(StreamCommand::Release { id }) => {
                if let Some(stream) = self.streams.remove(id) {
                    if !stream.is_closed() {
                        self.engine.submit_rst_stream(id, Reason::Cancel);
                    }
                }
                self.pumps.remove(&id);
                self.pending.remove(&id);
            }
            Command::Stream(StreamCommand::Pause { id }) => {
                if let Some(stream) = self.streams.get_mut(id) {
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.set_paused(true);
                    }
                }
            }
            Command::Stream(StreamCommand::Unpause { id }) => {
                if let Some(stream) = self.streams.get_mut(id) {
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.set_paused(false);
                    }
                }
            }
            Command::CloseSession(waiter) => {
                self.shutting_down = true;
                self.open.store(false, Ordering::Relaxed);
                if !self.goaway_sent {
                    let last = self
                        .streams
                        .ids()
                        .max_by_key(|id| u32::from(*id))
                        .unwrap_or(StreamId::ZERO);
                    self.engine.submit_goaway(last, Reason::NoError);
                    self.goaway_sent = true;
                }
                self.pending_goaway = true;
                self.close_waiters.push(waiter);
            }
        }
    }

    fn handle_request(&mut self, req: RequestCommand) {
        if self.shutting_down || self.goaway.is_some() {
            let _ = req.responder.send(Err(Error::SessionShutdown));
            let _ = req.head_tx.send(Err(Error::SessionShutdown));
            return;
        }

        let has_body = req.body.is_some();
        let header_bytes = frame::header_list_size(&req.pseudo, &req.fields);

        let new_stream = NewStream {
            pseudo: req.pseudo,
            fields: req.fields,
            weight: req.weight,
            // Withholding for 100-continue still means a body is coming
            // later: END_STREAM must stay unset on HEADERS either way.
            has_body,
        };

        match self.engine.submit_request(new_stream) {
            Ok(id) => {
                let mut stream = Stream::new();
                stream.set_state(StreamState::WriteHeaders);
                stream.expect_continue = req.expect_continue;
                stream.head_tx = Some(req.head_tx);
                stream.response = req.response;
                stream.metrics = req.metrics;
                stream.metrics.lock().expect("metrics poisoned").request_header_bytes = header_bytes;
                self.streams.begin(id);
                if let Some(slot) = self.streams.get_mut(id) {
                    *slot = stream;
                    slot.id = Some(id);
                }

                if let Some(body) = req.body {
                    // Withheld pumps (`withholding`) still go into `pumps`
                    // so the registry has a place to drop them from if the
                    // stream is torn down early; `poll_pumps` itself skips
                    // any id whose stream still has `expect_continue` set,
                    // which is exactly "no 1xx/non-1xx response yet"
                    // (design doc §4.6 100-continue handling). Note this is
                    // independent of `Stream::paused`, which only gates
                    // response-body delivery.
                    self.pumps.insert(id, RequestBodyPump::new(body));
                }

                let _ = req.responder.send(Ok(id));
            }
            Err(err) => {
                let err: Error = err.into();
                let _ = req.head_tx.send(Err(err.clone()));
                let _ = req.responder.send(Err(err));
            }
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        if self.in_callback_depth.get() > 0 {
            // A protocol-engine callback is already on the stack (design
            // doc §5 / §8): reentering `feed_input` here would try to take
            // a second `&mut` of state the outer call still holds. Queue
            // the bytes; `flush` drains them once that call has returned.
            self.deferred_input.extend_from_slice(bytes);
            return;
        }

        let engine = &mut self.engine;
        let streams = &mut self.streams;
        let pumps = &mut self.pumps;
        let pending = &mut self.pending;
        let depth = &self.in_callback_depth;
        let goaway = &mut self.goaway;
        let shutting_down = &mut self.shutting_down;

        depth.set(depth.get() + 1);
        let result = engine.feed_input(bytes, &mut |event| {
            dispatch_event(event, streams, pumps, pending, goaway, shutting_down);
        });
        depth.set(depth.get() - 1);

        if self.shutting_down {
            self.open.store(false, Ordering::Relaxed);

            // Design doc §4.1: session termination (whether locally
            // requested or triggered by a received GOAWAY) submits its
            // own GOAWAY if one hasn't gone out yet. `engine` can't be
            // borrowed mutably from inside the `feed_input` callback
            // above (it already holds `&mut self`), so this runs as a
            // follow-up once that borrow has ended.
            if !self.goaway_sent {
                let last = self
                    .streams
                    .ids()
                    .max_by_key(|id| u32::from(*id))
                    .unwrap_or(StreamId::ZERO);
                self.engine.submit_goaway(last, Reason::NoError);
                self.goaway_sent = true;
            }
        }

        if let Err(err) = result {
            self.fail_all(err.into());
            return;
        }

        // A WINDOW_UPDATE (stream- or session-level) may have just reopened
        // room for data this session previously had to hold back; cheap to
        // always sweep since `pending` is empty in the common case.
        self.retry_pending();
    }

    /// Resubmits any DATA previously withheld by `Codec::submit_data`'s
    /// window clamp, now that a `WindowUpdate` may have reopened room for
    /// it. A stream stays out of `poll_pumps` rotation for as long as it has
    /// an entry here.
    fn retry_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let ids: Vec<StreamId> = self.pending.keys().copied().collect();
        for id in ids {
            let Some((data, end_stream)) = self.pending.remove(&id) else { continue };
            match self.engine.submit_data(id, data, end_stream) {
                Ok(rest) if rest.is_empty() => {
                    if end_stream {
                        if let Some(stream) = self.streams.get_mut(id) {
                            stream.set_state(StreamState::WriteDone);
                        }
                        // The pump already reported this as its last chunk
                        // and marked itself done; without this, the next
                        // `poll_pumps` round would poll it again, get `None`
                        // back, and emit a second, trailing END_STREAM frame.
                        self.pumps.remove(&id);
                    }
                }
                Ok(rest) => {
                    self.pending.insert(id, (rest, end_stream));
                }
                Err(_) => {
                    self.pumps.remove(&id);
                }
            }
        }
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        if self.in_callback_depth.get() > 0 {
            // Never drive the transport while a protocol-engine callback
            // is still running (design doc §5 / §8 invariant).
            return Ok(());
        }

        if !self.deferred_input.is_empty() {
            let buf = std::mem::take(&mut self.deferred_input);
            self.feed(&buf);
        }

        while self.engine.wants_write() {
            let chunk = self
                .engine
                .request_next_output_chunk()
                .expect("wants_write reported pending output");
            self.io.write_all(&chunk).await?;
        }
        self.io.flush().await?;

        if self.pending_goaway {
            self.pending_goaway = false;
            for waiter in self.close_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
        Ok(())
    }

    fn fail_all(&mut self, err: Error) {
        self.open.store(false, Ordering::Relaxed);
        for (_, stream) in self.streams.iter_mut() {
            stream.set_first_error(err.clone());
            stream.resolve_head(Err(err.clone()));
            if let Ok(mut sink) = stream.response.lock() {
                sink.fail(err.clone());
            }
        }
    }

    /// Polls every pending request body pump for its next chunk; returns
    /// the first one ready so the caller can write it without starving the
    /// rest (round-robin-ish via `HashMap` iteration order, acceptable for
    /// a client with a handful of concurrent streams).
    async fn poll_pumps(
        pumps: &mut HashMap<StreamId, RequestBodyPump>,
        pending: &HashMap<StreamId, (Bytes, bool)>,
        streams: &Streams,
    ) -> Option<(StreamId, std::io::Result<Option<(Bytes, bool)>>)> {
        if pumps.is_empty() {
            return std::future::pending().await;
        }
        std::future::poll_fn(|cx| {
            for (&id, pump) in pumps.iter_mut() {
                // Held back by the peer's window; asking the source for
                // more would only grow this stream's backlog unboundedly.
                if pending.contains_key(&id) {
                    continue;
                }
                // Held back for 100-continue: no 1xx/non-1xx response has
                // arrived yet to say whether the body should go out at all.
                if streams.get(id).map(|s| s.expect_continue).unwrap_or(false) {
                    continue;
                }
                match pump.poll_next(cx) {
                    std::task::Poll::Ready(Some(Ok(chunk_and_last))) => {
                        return std::task::Poll::Ready(Some((id, Ok(Some(chunk_and_last)))));
                    }
                    std::task::Poll::Ready(Some(Err(e))) => {
                        return std::task::Poll::Ready(Some((id, Err(e))));
                    }
                    std::task::Poll::Ready(None) => {
                        return std::task::Poll::Ready(Some((id, Ok(None))));
                    }
                    std::task::Poll::Pending => continue,
                }
            }
            std::task::Poll::Pending
        })
        .await
    }

    fn handle_pumped(&mut self, pumped: (StreamId, std::io::Result<Option<(Bytes, bool)>>)) {
        let (id, result) = pumped;
        match result {
            Ok(Some((chunk, is_last))) => {
                let len = chunk.len() as u64;
                match self.engine.submit_data(id, chunk, is_last) {
                    Ok(rest) if rest.is_empty() => {
                        trace!(stream = ?id, bytes = len, end_stream = is_last, "dispatched request body chunk");
                        if let Some(stream) = self.streams.get_mut(id) {
                            stream.metrics.lock().expect("metrics poisoned").request_body_bytes += len;
                            if is_last {
                                stream.set_state(StreamState::WriteDone);
                            }
                        }
                        if is_last {
                            self.pumps.remove(&id);
                        }
                    }
                    Ok(rest) => {
                        // Peer's window couldn't take all of it; hold the
                        // rest and stop pulling more from this source until
                        // a WINDOW_UPDATE clears it (`retry_pending`). Only
                        // the bytes actually written count as dispatched.
                        let dispatched = len - rest.len() as u64;
                        trace!(stream = ?id, bytes = dispatched, end_stream = false, "dispatched request body chunk (partial)");
                        if let Some(stream) = self.streams.get_mut(id) {
                            stream.metrics.lock().expect("metrics poisoned").request_body_bytes += dispatched;
                        }
                        self.pending.insert(id, (rest, is_last));
                    }
                    Err(_) => {
                        self.pumps.remove(&id);
                    }
                }
            }
            Ok(None) => {
                // The source was already empty on its very first poll (no
                // body bytes at all): still owes the peer an END_STREAM.
                let _ = self.engine.submit_data(id, Bytes::new(), true);
                self.pumps.remove(&id);
                if let Some(stream) = self.streams.get_mut(id) {
                    stream.set_state(StreamState::WriteDone);
                }
            }
            Err(e) => {
                warn!(stream = ?id, error = %e, "request body source failed");
                self.engine.submit_rst_stream(id, Reason::InternalError);
                self.pumps.remove(&id);
                if let Some(mut stream) = self.streams.remove(id) {
                    stream.set_first_error(Error::transport(e));
                    stream.resolve_head(Err(Error::ProtocolInternal("request body read failed".into())));
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.fail(Error::ProtocolInternal("request body read failed".into()));
                    }
                }
            }
        }
    }
}

/// Applies one decoded protocol event to the stream registry. A free
/// function (rather than a method) so it can be called from inside the
/// `feed_input` callback without re-borrowing all of `SessionInner`.
fn dispatch_event(
    event: ProtoEvent,
    streams: &mut Streams,
    pumps: &mut HashMap<StreamId, RequestBodyPump>,
    pending: &mut HashMap<StreamId, (Bytes, bool)>,
    goaway: &mut Option<SessionError>,
    shutting_down: &mut bool,
) {
    match event {
        ProtoEvent::BeginHeaders(_) | ProtoEvent::BeginData(_) => {
            // No-op markers for a streaming sniffer to hook into (design
            // doc §4.5's "sniff before delivering" extension point); this
            // engine has no sniffer registered by default.
        }
        ProtoEvent::Headers(id, headers) => {
            let Some(stream) = streams.get_mut(id) else { return };
            let end_stream = headers.is_end_stream();
            let (pseudo, fields) = headers.into_parts();

            if pseudo.is_informational() {
                trace!(stream = ?id, "received informational response");
                if stream.expect_continue {
                    // 100 Continue: release the withheld body (poll_pumps
                    // stops skipping this id now that `expect_continue` is
                    // cleared).
                    stream.expect_continue = false;
                }
                return;
            }

            let header_bytes = frame::header_list_size(&pseudo, &fields);

            stream.set_state(StreamState::ReadHeaders);
            {
                let mut metrics = stream.metrics.lock().expect("metrics poisoned");
                metrics.response_header_bytes += header_bytes;
                // Design doc §4.3: recorded on the WriteDone -> ReadHeaders
                // transition, i.e. the first time a non-informational
                // response is seen for this stream.
                metrics.response_start.get_or_insert_with(Instant::now);
            }
            if stream.expect_continue {
                // A final response arrived without a 100 Continue first;
                // the body is never sent (RFC 7540 §8.2.3 allows this).
                pumps.remove(&id);
                pending.remove(&id);
                stream.expect_continue = false;
            }

            stream.resolve_head(Ok(ResponseHead {
                status: pseudo.status.unwrap_or(http::StatusCode::OK),
                headers: fields,
            }));

            {
                let mut sink = stream.response.lock().expect("response sink poisoned");
                if end_stream {
                    sink.complete();
                }
            }
            if end_stream {
                // HEADERS carrying END_STREAM (e.g. 204, or a response with
                // no body) still passes through `ReadingBody` on its way to
                // `ReadDone` -- the design's state list names `ReadingBody`
                // unconditionally, only `ReadDataStart` is optional.
                stream.set_state(StreamState::ReadingBody);
                stream.set_state(StreamState::ReadDone);
                stream.metrics.lock().expect("metrics poisoned").response_end.get_or_insert_with(Instant::now);
            }
        }
        ProtoEvent::Data(id, data, end_stream) => {
            let Some(stream) = streams.get_mut(id) else { return };
            stream.set_state(StreamState::ReadingBody);
            stream.flow_control.recv_data(data.len() as u32);
            stream.metrics.lock().expect("metrics poisoned").response_body_bytes += data.len() as u64;
            let mut sink = stream.response.lock().expect("response sink poisoned");
            sink.add(data);
            if end_stream {
                sink.complete();
                drop(sink);
                stream.set_state(StreamState::ReadDone);
                stream.metrics.lock().expect("metrics poisoned").response_end.get_or_insert_with(Instant::now);
            }
        }
        ProtoEvent::WindowUpdate(_, _) => {
            // Session/stream remote windows are tracked in `Codec`;
            // nothing for the registry to do beyond waking pumps, which
            // happens naturally on their next poll.
        }
        ProtoEvent::RstStream(id, reason) => {
            pumps.remove(&id);
            pending.remove(&id);
            // The peer has unilaterally ended this stream; nothing more
            // will ever arrive for it, so it comes out of the registry
            // immediately rather than waiting for the owning handle to
            // drop (design doc §3's "closing registry" is for streams
            // *we* finish while waiting on our own RST_STREAM to flush --
            // a peer-sent RST_STREAM needs no such wait).
            if let Some(mut stream) = streams.remove(id) {
                let err = if reason == Reason::RefusedStream {
                    Error::StreamRefused
                } else {
                    Error::StreamReset(reason)
                };
                stream.set_first_error(err.clone());
                stream.resolve_head(Err(err.clone()));
                if let Ok(mut sink) = stream.response.lock() {
                    sink.fail(err);
                }
            }
        }
        ProtoEvent::GoAway(frame) => {
            let last = frame.last_stream_id();
            let reason = frame.reason();
            *shutting_down = true;
            *goaway = Some(SessionError {
                reason,
                last_stream_id: Some(last),
                message: "peer sent GOAWAY".into(),
            });

            for id in streams.ids().collect::<Vec<_>>() {
                let past_last = u32::from(id) > u32::from(last);
                let graceful = reason == Reason::NoError;

                if !past_last && graceful {
                    // Accepted by the peer before it sent GOAWAY, and the
                    // shutdown is graceful: let it run to completion
                    // untouched (design doc §4.6's "leave it alone" case).
                    continue;
                }

                // Resolves the open question from design doc §4.6: a
                // stream whose id is past `last_stream_id` under a
                // graceful (NO_ERROR) GOAWAY was never actually seen by
                // the peer and is always safe to replay on a new
                // connection, regardless of whether it had started
                // writing its body. Every other case (a non-NO_ERROR
                // reason, whether or not the stream was accepted) is
                // fatal to that stream.
                let restartable = past_last && graceful;
                // Fatal to the stream; nothing more will arrive for it
                // either, so it leaves the registry now rather than on
                // the handle's eventual drop (same reasoning as a
                // peer-sent RST_STREAM above).
                if let Some(mut stream) = streams.remove(id) {
                    let err = if restartable {
                        Error::StreamIdExhausted
                    } else {
                        Error::GoawayFatal(reason)
                    };
                    stream.set_first_error(err.clone());
                    stream.resolve_head(Err(err.clone()));
                    if let Ok(mut sink) = stream.response.lock() {
                        sink.fail(err);
                    }
                }
                pumps.remove(&id);
                pending.remove(&id);
            }
        }
        ProtoEvent::SettingsReceived(_) => {}
        ProtoEvent::Ping(_) => {}
    }
}
