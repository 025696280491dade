//! Public client API: `handshake`, `SendRequest`, `Connection`, and the
//! response/body handles returned to the caller.
//!
//! Grounded on the teacher's `client` module
//! (`examples/carllerche-h2/src/client.rs`), which splits the same three
//! roles: a cheaply-`Clone`-able request sender, a connection-driving task
//! the caller spawns, and per-request response/body futures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::body::{AsyncReadBody, BlockingBody, PollableBody, ResponseBodySink};
use crate::error::Error;
use crate::frame::{self, Pseudo};
use crate::priority::{self, Priority};
use crate::session::{Command, RequestCommand, ResponseHead, SessionInner, StreamCommand};
use crate::streams::StreamMetrics;

/// Connection-level tuning, mirrored from the design document's external
/// interface (§6): the three startup settings and the response-window
/// release threshold are effectively fixed (RFC-mandated defaults this
/// engine always advertises), so the only caller-visible knob is whether
/// to withhold request bodies behind `Expect: 100-continue`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Honor `Expect: 100-continue` by withholding the request body until
    /// a `100` response (or a final response with no `100`) arrives.
    pub honor_expect_continue: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config { honor_expect_continue: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn honor_expect_continue(mut self, yes: bool) -> Builder {
        self.config.honor_expect_continue = yes;
        self
    }

    pub async fn handshake<T>(&self, io: T) -> Result<(SendRequest, Connection<T>), Error>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        handshake_with(io, self.config.clone())
    }
}

/// Performs the client connection preface and startup `SETTINGS` exchange,
/// returning a request sender and the connection-driving task.
///
/// The returned `Connection` must be polled (typically via
/// `tokio::spawn(connection.run())`) for any request to make progress --
/// this crate does not spawn a task on the caller's behalf, the same
/// division of responsibility as the teacher's `client::handshake`.
pub async fn handshake<T>(io: T) -> Result<(SendRequest, Connection<T>), Error>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    handshake_with(io, Config::default())
}

fn handshake_with<T>(io: T, config: Config) -> Result<(SendRequest, Connection<T>), Error>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let cancellation = CancellationToken::new();
    let open = Arc::new(AtomicBool::new(true));
    let inner = SessionInner::new(io, rx, cancellation.clone(), open.clone());

    Ok((
        SendRequest { commands: tx, config, open },
        Connection { inner, cancellation },
    ))
}

/// The connection-driving task. Runs until the transport closes, a fatal
/// protocol error occurs, or it is dropped/cancelled.
pub struct Connection<T> {
    inner: SessionInner<T>,
    cancellation: CancellationToken,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Drives the connection to completion. Spawn this on your async
    /// runtime; it resolves once the session ends.
    pub async fn run(self) {
        self.inner.drive().await
    }

    /// A handle that, when cancelled, tears down the connection and fails
    /// every in-flight stream with [`Error::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// A cheaply-clonable handle for submitting requests on a connection.
#[derive(Clone)]
pub struct SendRequest {
    commands: mpsc::UnboundedSender<Command>,
    config: Config,
    open: Arc<AtomicBool>,
}

impl SendRequest {
    /// True iff the session has no terminal error, is not shutting down,
    /// and still accepts new requests (design doc §4.1).
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Equivalent to [`is_open`](Self::is_open) -- the design names these
    /// as two views of the same condition (a connection is reusable for a
    /// new request exactly when it is still open).
    pub fn is_reusable(&self) -> bool {
        self.is_open()
    }

    /// Initiates graceful shutdown: submits GOAWAY and refuses any further
    /// `send_request` calls. Resolves once GOAWAY has been flushed to the
    /// transport; in-flight streams keep running until the connection
    /// task (`Connection::run`) observes them all complete. Returns
    /// `false` if the session was already shutting down (design doc
    /// §4.1's `close_async`).
    pub async fn close_async(&self) -> bool {
        if !self.open.swap(false, Ordering::Relaxed) {
            return false;
        }
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::CloseSession(tx)).is_err() {
            return false;
        }
        let _ = rx.await;
        true
    }
}

/// A response body: an async stream of `Bytes` chunks, with capacity
/// release wired back to the session so the peer's flow-control window
/// keeps advancing as the caller consumes data.
pub struct ResponseBody {
    id: frame::StreamId,
    sink: Arc<Mutex<ResponseBodySink>>,
    metrics: Arc<Mutex<StreamMetrics>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ResponseBody {
    /// Releases `len` bytes of consumed capacity back to the peer, the
    /// caller-driven half of response-body flow control (design doc
    /// §4.5): this engine never auto-releases, so a caller that buffers
    /// the whole body before processing it controls exactly when
    /// WINDOW_UPDATEs go out.
    pub fn release_capacity(&self, len: u32) {
        let _ = self.commands.send(Command::Stream(StreamCommand::ReleaseCapacity { id: self.id, len }));
    }

    /// Freezes delivery of further body chunks to this handle's `Stream`
    /// impl. Wire I/O is unaffected: DATA frames keep arriving and
    /// queuing, the consumer simply stops being woken until `unpause`
    /// (design doc §4.1).
    pub fn pause(&self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Pause { id: self.id }));
        if let Ok(mut sink) = self.sink.lock() {
            sink.set_paused(true);
        }
    }

    /// Resumes delivery after [`pause`](Self::pause), re-evaluating
    /// against whatever arrived in the meantime.
    pub fn unpause(&self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Unpause { id: self.id }));
        if let Ok(mut sink) = self.sink.lock() {
            sink.set_paused(false);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.sink.lock().map(|s| s.is_paused()).unwrap_or(false)
    }

    /// True once the body has reached EOF or failed and every chunk already
    /// queued has been handed to the caller -- i.e. nothing more will ever
    /// come out of `poll_next`.
    pub fn is_finished(&self) -> bool {
        self.sink.lock().map(|s| s.is_complete()).unwrap_or(true)
    }

    /// A snapshot of this exchange's byte/time counters (design doc §6).
    pub fn metrics(&self) -> StreamMetrics {
        self.metrics.lock().expect("metrics poisoned").clone()
    }

    /// Drives I/O until the stream has at least one chunk queued or has
    /// reached EOF/error, without consuming anything (design doc §4.1's
    /// `run_until_readable`). The session itself does the actual transport
    /// reads; this just waits for the result to land in the shared sink.
    pub async fn run_until_readable(&self) -> Result<(), Error> {
        std::future::poll_fn(|cx| {
            let mut sink = self.sink.lock().expect("response sink poisoned");
            sink.poll_readable(cx)
        })
        .await
    }

    /// Discards the remaining response body: emits RST_STREAM with
    /// `STREAM_CLOSED` and stops delivering any further DATA the peer
    /// sends for this stream (design doc §4.1's `skip`; this crate's
    /// transport I/O is always non-blocking, so the design's `blocking`
    /// parameter on `skip` has no distinct async variant here).
    pub fn skip(self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Skip { id: self.id }));
    }

    /// Finalizes the stream as normally completed, as if the caller had
    /// drained it to EOF -- the explicit counterpart to letting `Self`
    /// simply be dropped (design doc §4.1's `finish`). A no-op if the
    /// stream already reached `ReadDone` on its own.
    pub fn finish(self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Finish { id: self.id }));
    }
}

impl Drop for ResponseBody {
    /// Releases the stream if the caller drops this handle without
    /// calling `finish`/`skip` explicitly -- design doc §3's stream
    /// lifecycle ("destroyed" only once the owning handle says it's
    /// done). Resets with `CANCEL` only if the body wasn't already fully
    /// read; harmlessly redundant if `finish`/`skip` already ran.
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Release { id: self.id }));
    }
}

impl futures_core::Stream for ResponseBody {
    type Item = Result<Bytes, Error>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let mut sink = self.sink.lock().expect("response sink poisoned");
        futures_core::Stream::poll_next(std::pin::Pin::new(&mut *sink), cx)
    }
}

/// A handle to an in-flight request: cancel it, or await its response.
pub struct ResponseFuture {
    id: frame::StreamId,
    head_rx: oneshot::Receiver<Result<ResponseHead, Error>>,
    sink: Arc<Mutex<ResponseBodySink>>,
    metrics: Arc<Mutex<StreamMetrics>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ResponseFuture {
    /// Resets the stream and fails the pending response/body with
    /// [`Error::Cancelled`].
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Stream(StreamCommand::Cancel { id: self.id }));
    }

    /// A snapshot of this exchange's byte/time counters so far (design doc
    /// §6); request-side counters are already meaningful before the
    /// response arrives.
    pub fn metrics(&self) -> StreamMetrics {
        self.metrics.lock().expect("metrics poisoned").clone()
    }

    pub async fn await_response(self) -> Result<(Response<()>, ResponseBody), Error> {
        let head = self
            .head_rx
            .await
            .map_err(|_| Error::ProtocolInternal("session dropped before responding".into()))??;

        let mut builder = Response::builder().status(head.status);
        if let Some(headers) = builder.headers_mut() {
            *headers = head.headers;
        }
        let response = builder
            .body(())
            .map_err(|e| Error::ProtocolInternal(e.to_string()))?;

        Ok((
            response,
            ResponseBody {
                id: self.id,
                sink: self.sink,
                metrics: self.metrics,
                commands: self.commands,
            },
        ))
    }
}

impl SendRequest {
    /// Submits a request with no body.
    pub async fn send_request<B>(
        &self,
        request: Request<B>,
        priority: Priority,
    ) -> Result<ResponseFuture, Error>
    where
        B: Into<BodySource>,
    {
        let (parts, body) = request.into_parts();

        let scheme = parts.uri.scheme_str().unwrap_or("https").to_string();

        let authority = parts
            .uri
            .authority()
            .map(|a| strip_default_port(a.as_str(), &scheme))
            .or_else(|| {
                parts
                    .headers
                    .get(http::header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(|s| strip_default_port(s, &scheme))
            });

        let path = if parts.method == http::Method::OPTIONS && parts.uri.path() == "*" {
            "*".to_string()
        } else {
            parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string())
        };

        let pseudo = Pseudo::request(parts.method.clone(), scheme, authority, path);

        let expect_continue = self.config.honor_expect_continue
            && parts
                .headers
                .get(http::header::EXPECT)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.eq_ignore_ascii_case("100-continue"))
                .unwrap_or(false);

        let body_source: BodySource = body.into();
        let pollable_body: Option<Box<dyn PollableBody>> = body_source.into_pollable();

        let (responder_tx, responder_rx) = oneshot::channel();
        let (head_tx, head_rx) = oneshot::channel();
        let sink = Arc::new(Mutex::new(ResponseBodySink::new()));
        let metrics = Arc::new(Mutex::new(StreamMetrics::default()));

        let cmd = RequestCommand {
            pseudo,
            fields: strip_connection_headers(parts.headers),
            weight: priority::to_weight(priority),
            expect_continue,
            body: pollable_body,
            responder: responder_tx,
            head_tx,
            response: sink.clone(),
            metrics: metrics.clone(),
        };

        self.commands
            .send(Command::Request(cmd))
            .map_err(|_| Error::SessionShutdown)?;

        let id = responder_rx
            .await
            .map_err(|_| Error::ProtocolInternal("session dropped before accepting request".into()))??;

        Ok(ResponseFuture {
            id,
            head_rx,
            sink,
            metrics,
            commands: self.commands.clone(),
        })
    }
}

/// Strips headers that make no sense over a multiplexed HTTP/2 stream
/// (`Connection`, `Transfer-Encoding`, `Keep-Alive`, `Upgrade`...),
/// mirroring the teacher's `client::Peer::convert_send_message` header
/// filtering (`examples/carllerche-h2/src/client.rs`).
fn strip_connection_headers(mut headers: HeaderMap) -> HeaderMap {
    const HOP_BY_HOP: &[&str] = &[
        "connection",
        "keep-alive",
        "proxy-connection",
        "transfer-encoding",
        "upgrade",
    ];
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers
}

/// Drops a trailing `:<port>` from `authority` when it equals the scheme's
/// default, so `:authority` matches what a browser would send.
fn strip_default_port(authority: &str, scheme: &str) -> String {
    let default_port = match scheme {
        "http" => 80,
        "https" => 443,
        _ => return authority.to_string(),
    };
    match authority.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>() == Ok(default_port) => host.to_string(),
        _ => authority.to_string(),
    }
}

/// What a caller can hand in as a request body: nothing, an owned byte
/// buffer, or a source this crate drives for the caller (either pollable
/// directly or only synchronously readable).
pub enum BodySource {
    Empty,
    Bytes(Bytes),
    Pollable(Box<dyn PollableBody>),
}

impl BodySource {
    /// Streams the body from anything implementing `AsyncRead` (a file, a
    /// pipe, another socket), read in `AsyncReadBody`'s fixed-size chunks
    /// with no intermediate buffering of the whole body.
    pub fn from_async_read<R>(reader: R) -> BodySource
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        BodySource::Pollable(Box::new(AsyncReadBody::new(reader)))
    }

    /// Streams the body from a synchronous reader driven on the blocking
    /// thread pool (design doc §4.4): `read_chunk` is called repeatedly
    /// from a `spawn_blocking` task and must return `Ok(None)` at EOF.
    pub fn from_blocking_read<F>(read_chunk: F) -> BodySource
    where
        F: FnMut() -> std::io::Result<Option<Bytes>> + Send + 'static,
    {
        BodySource::Pollable(Box::new(BlockingBody::spawn(read_chunk)))
    }

    fn into_pollable(self) -> Option<Box<dyn PollableBody>> {
        match self {
            BodySource::Empty => None,
            BodySource::Bytes(b) => Some(Box::new(OnceBody(Some(b)))),
            BodySource::Pollable(p) => Some(p),
        }
    }
}

impl From<()> for BodySource {
    fn from(_: ()) -> BodySource {
        BodySource::Empty
    }
}

impl From<Bytes> for BodySource {
    fn from(b: Bytes) -> BodySource {
        if b.is_empty() {
            BodySource::Empty
        } else {
            BodySource::Bytes(b)
        }
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(b: Vec<u8>) -> BodySource {
        Bytes::from(b).into()
    }
}

struct OnceBody(Option<Bytes>);

impl PollableBody for OnceBody {
    fn poll_chunk(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<std::io::Result<Bytes>>> {
        std::task::Poll::Ready(self.0.take().map(Ok))
    }
}
