//! Request body pump: moves bytes from a caller-supplied body source onto
//! the wire as DATA frames.
//!
//! Grounded on the teacher's `SendStream`/`proto::streams::prioritize`
//! pairing (`examples/carllerche-h2/src/share.rs`,
//! `examples/carllerche-h2/src/proto/streams/prioritize.rs`) for the
//! "pull one chunk at a time, respecting the remote window" shape; the
//! two source kinds (pollable vs. non-pollable) are this crate's own
//! addition (design doc §4.4). The blocking-source bridge follows the
//! `tokio::sync::mpsc` + `spawn_blocking` pattern from tokio's own docs
//! for adapting a synchronous `Read` into an async stream of chunks.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

/// A request body source that can be polled directly without blocking a
/// worker thread (e.g. an in-memory buffer, or anything wrapping
/// `AsyncRead`).
pub trait PollableBody: Send {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<Bytes>>>;
}

/// Adapts any `AsyncRead` into a `PollableBody`, reading into a fixed-size
/// scratch buffer and handing out owned `Bytes` chunks.
pub struct AsyncReadBody<R> {
    inner: R,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin + Send> AsyncReadBody<R> {
    pub fn new(inner: R) -> AsyncReadBody<R> {
        AsyncReadBody { inner, chunk_size: 8 * 1024 }
    }
}

impl<R: AsyncRead + Unpin + Send> PollableBody for AsyncReadBody<R> {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<Bytes>>> {
        let mut scratch = vec![0u8; self.chunk_size];
        let mut buf = tokio::io::ReadBuf::new(&mut scratch);
        match Pin::new(&mut self.inner).poll_read(cx, &mut buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len();
                if n == 0 {
                    Poll::Ready(None)
                } else {
                    scratch.truncate(n);
                    Poll::Ready(Some(Ok(Bytes::from(scratch))))
                }
            }
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A request body source that can only be read synchronously (a blocking
/// `std::io::Read`, a third-party iterator with no async story). Driven on
/// `tokio::task::spawn_blocking`, with chunks handed back over a bounded
/// channel so the blocking thread can't run arbitrarily far ahead of a
/// slow-draining remote window.
pub struct BlockingBody {
    rx: mpsc::Receiver<std::io::Result<Bytes>>,
}

impl BlockingBody {
    /// Spawns the blocking reader loop; `read_chunk` is called from a
    /// blocking-pool thread each time the pump has room for more data, and
    /// must return `Ok(None)` at EOF.
    pub fn spawn<F>(mut read_chunk: F) -> BlockingBody
    where
        F: FnMut() -> std::io::Result<Option<Bytes>> + Send + 'static,
    {
        // Bounded to 1: at most one chunk buffered ahead of the pump,
        // which is the back-pressure the blocking thread needs.
        let (tx, rx) = mpsc::channel(1);

        tokio::task::spawn_blocking(move || loop {
            match read_chunk() {
                Ok(None) => break,
                Ok(Some(chunk)) => {
                    if tx.blocking_send(Ok(chunk)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        });

        BlockingBody { rx }
    }
}

impl PollableBody for BlockingBody {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<Bytes>>> {
        self.rx.poll_recv(cx)
    }
}

/// The request body pump itself: owns a source and knows how to ask it for
/// the next chunk. The session drives `poll_next`, clamping what it
/// actually writes as a DATA frame to the remote stream/session window.
///
/// Keeps one chunk of lookahead so it can tell the session which chunk is
/// the last one: the session needs that to set END_STREAM on the DATA
/// frame that actually carries the final byte, rather than writing the
/// whole body and then a separate empty `DATA(END_STREAM)` frame after it.
pub(crate) struct RequestBodyPump {
    source: Option<Box<dyn PollableBody>>,
    buffered: Option<Bytes>,
    pending_error: Option<std::io::Error>,
    done: bool,
}

impl RequestBodyPump {
    pub fn new(source: Box<dyn PollableBody>) -> RequestBodyPump {
        RequestBodyPump {
            source: Some(source),
            buffered: None,
            pending_error: None,
            done: false,
        }
    }

    /// Polls for the next `(chunk, is_last)` pair. `is_last` is true only
    /// for the chunk that immediately precedes EOF (or a read error, which
    /// surfaces on the following call once this chunk has been delivered).
    pub fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<(Bytes, bool)>>> {
        if self.done {
            return Poll::Ready(None);
        }

        if let Some(e) = self.pending_error.take() {
            self.done = true;
            return Poll::Ready(Some(Err(e)));
        }

        if self.buffered.is_none() {
            match self.poll_source(cx) {
                Poll::Ready(Some(Ok(chunk))) => self.buffered = Some(chunk),
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        match self.poll_source(cx) {
            Poll::Ready(Some(Ok(next_chunk))) => {
                let chunk = self.buffered.replace(next_chunk).expect("buffered chunk just filled above");
                Poll::Ready(Some(Ok((chunk, false))))
            }
            Poll::Ready(Some(Err(e))) => {
                let chunk = self.buffered.take().expect("buffered chunk just filled above");
                self.pending_error = Some(e);
                Poll::Ready(Some(Ok((chunk, false))))
            }
            Poll::Ready(None) => {
                let chunk = self.buffered.take().expect("buffered chunk just filled above");
                self.done = true;
                Poll::Ready(Some(Ok((chunk, true))))
            }
            Poll::Pending => {
                // No telling yet whether more is coming; hand out what's
                // already buffered so a slow producer doesn't stall a chunk
                // that's ready to go, and look ahead again next poll.
                let chunk = self.buffered.take().expect("buffered chunk just filled above");
                Poll::Ready(Some(Ok((chunk, false))))
            }
        }
    }

    fn poll_source(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<Bytes>>> {
        match &mut self.source {
            Some(s) => s.poll_chunk(cx),
            None => Poll::Ready(None),
        }
    }
}
