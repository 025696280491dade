//! Request and response body handling (design doc §4.4, §4.5).

pub(crate) mod pump;
pub(crate) mod sink;

pub use pump::{AsyncReadBody, BlockingBody, PollableBody};
pub use sink::ResponseBodySink;
