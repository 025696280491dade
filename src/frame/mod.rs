//! HTTP/2 frame types: parsing and encoding.
//!
//! Grounded on the teacher's `frame` module (`examples/carllerche-h2/src/
//! frame/{mod,headers,ping}.rs`): one file per frame kind, a `Head` shared
//! by all of them, and a top-level `Frame` enum the codec reads into and
//! writes out of.

mod data;
mod goaway;
mod head;
mod headers;
mod ping;
mod priority;
mod rst_stream;
mod settings;
mod util;
mod window_update;

pub use self::data::Data;
pub use self::goaway::GoAway;
pub use self::head::{Head, Kind, StreamId, FIRST_CLIENT_STREAM_ID};
pub use self::headers::{header_list_size, Headers, Pseudo};
pub use self::ping::Ping;
pub use self::priority::Priority as PriorityFrame;
pub use self::rst_stream::RstStream;
pub use self::settings::{
    startup_settings, SettingId, Settings, DEFAULT_HEADER_TABLE_SIZE, DEFAULT_INITIAL_WINDOW_SIZE,
    DEFAULT_MAX_FRAME_SIZE,
};
pub use self::window_update::WindowUpdate;

/// Length, in bytes, of the fixed HTTP/2 frame header.
pub const HEADER_LEN: usize = 9;

/// A decoded HTTP/2 frame.
#[derive(Debug)]
pub enum Frame {
    Data(Data),
    Headers(Headers),
    Priority(PriorityFrame),
    RstStream(RstStream),
    Settings(Settings),
    Ping(Ping),
    GoAway(GoAway),
    WindowUpdate(WindowUpdate),
}

/// Errors that can occur while parsing or validating a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("frame header shorter than 9 bytes")]
    Short,

    #[error("unsupported flag bits set")]
    BadFlag,

    #[error("unrecognized frame kind")]
    BadKind,

    #[error("frame has an invalid size for its kind")]
    BadFrameSize,

    #[error("padding length exceeds frame payload length")]
    TooMuchPadding,

    #[error("payload shorter than required for this frame kind")]
    PayloadTooShort,

    #[error("SETTINGS payload length is not a multiple of 6")]
    PartialSettingLength,

    #[error("frame carries an invalid stream id for its kind")]
    InvalidStreamId,

    #[error("HPACK decoding failed")]
    Hpack,

    #[error("CONTINUATION frames are not supported; headers must fit in one HEADERS frame")]
    ContinuationUnsupported,
}
