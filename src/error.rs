//! Crate-wide error types.
//!
//! `Error` is the only error type that crosses the public API boundary; it
//! collects every error kind named in the engine's error-handling design
//! (transport failures, protocol resets, GOAWAY, stream-id exhaustion, user
//! cancellation). Internal, lower-level error types (`ProtoError`,
//! `frame::Error`) are converted into it with `?` as they cross into
//! `session`/`client`.

use std::fmt;
use std::io;

use crate::frame::StreamId;

/// HTTP/2 error codes, as defined by RFC 7540 §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Reason {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl Reason {
    pub fn from_u32(v: u32) -> Reason {
        use Reason::*;
        match v {
            0x0 => NoError,
            0x1 => ProtocolError,
            0x2 => InternalError,
            0x3 => FlowControlError,
            0x4 => SettingsTimeout,
            0x5 => StreamClosed,
            0x6 => FrameSizeError,
            0x7 => RefusedStream,
            0x8 => Cancel,
            0x9 => CompressionError,
            0xa => ConnectError,
            0xb => EnhanceYourCalm,
            0xc => InadequateSecurity,
            0xd => Http11Required,
            _ => InternalError,
        }
    }

    pub fn into_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors surfaced through the public API.
///
/// This is the Rust realization of the error-kind table in the design
/// document: `WouldBlock` never reaches here (it is handled internally by
/// the I/O driver), and the remaining eight kinds each have a variant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The async operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// A read or write on the underlying transport failed. Fails every live
    /// stream with a copy and terminates the session.
    #[error("transport I/O error: {0}")]
    TransportIo(#[source] std::sync::Arc<io::Error>),

    /// The protocol engine (framing/HPACK) reported an internal error.
    #[error("protocol error: {0}")]
    ProtocolInternal(String),

    /// The peer refused the stream with `REFUSED_STREAM` before any body
    /// was read. The request is safe to retry on a fresh connection.
    #[error("stream refused by peer, safe to restart")]
    StreamRefused,

    /// The peer reset the stream with a code other than `REFUSED_STREAM`.
    #[error("stream reset by peer: {0}")]
    StreamReset(Reason),

    /// The peer sent GOAWAY with a non-zero error code, or this stream's id
    /// is past the GOAWAY's `last_stream_id`.
    #[error("session terminated by peer: {0}")]
    GoawayFatal(Reason),

    /// The local stream id space is exhausted; the request is safe to retry
    /// on a fresh connection.
    #[error("stream id space exhausted, safe to restart")]
    StreamIdExhausted,

    /// The session has already begun graceful shutdown and cannot accept a
    /// new stream.
    #[error("session is shutting down")]
    SessionShutdown,

    /// The peer or local engine produced a frame this engine does not
    /// understand or does not accept in the current state.
    #[error("malformed or unexpected frame: {0}")]
    Frame(#[from] crate::frame::Error),
}

impl Error {
    pub fn is_restartable(&self) -> bool {
        matches!(self, Error::StreamRefused | Error::StreamIdExhausted)
    }

    pub fn transport(err: io::Error) -> Error {
        Error::TransportIo(std::sync::Arc::new(err))
    }
}

/// An error raised while the stream registry, flow control, or codec
/// process a single frame; always converted into `Error` before reaching a
/// caller.
#[derive(Debug, Clone)]
pub(crate) enum ProtoError {
    Proto(Reason),
    /// The local client-initiated stream id space (odd ids up to 2^31-1)
    /// is exhausted. Design doc §4.1: `send` reports this as restartable
    /// (`Error::StreamIdExhausted`), not a generic protocol error, so the
    /// caller knows to retry on a fresh connection rather than fail the
    /// request outright.
    StreamIdExhausted,
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoError::Proto(r) => write!(f, "protocol error: {r}"),
            ProtoError::StreamIdExhausted => write!(f, "stream id space exhausted, safe to restart"),
        }
    }
}

impl std::error::Error for ProtoError {}

impl From<ProtoError> for Error {
    fn from(src: ProtoError) -> Error {
        match src {
            ProtoError::Proto(r) => Error::ProtocolInternal(format!("{r}")),
            ProtoError::StreamIdExhausted => Error::StreamIdExhausted,
        }
    }
}

/// A session-level error, carried on `SessionInner` and copied into a
/// stream's first error the first time its status is checked.
#[derive(Debug, Clone)]
pub struct SessionError {
    pub reason: Reason,
    pub last_stream_id: Option<StreamId>,
    pub message: String,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session error ({}): {}", self.reason, self.message)
    }
}

impl From<SessionError> for Error {
    fn from(src: SessionError) -> Error {
        Error::GoawayFatal(src.reason)
    }
}
