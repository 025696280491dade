//! A client-side HTTP/2 multiplexing engine: the layer between a
//! high-level request/response API and a raw bidirectional byte stream.
//!
//! `client::handshake` performs the connection preface and startup
//! `SETTINGS` exchange over any `AsyncRead + AsyncWrite` transport (a TCP
//! stream, a TLS stream, anything), returning a [`client::SendRequest`]
//! handle and a [`client::Connection`] the caller drives to completion
//! (typically with `tokio::spawn`).
//!
//! ```no_run
//! # async fn run(io: tokio::net::TcpStream) -> Result<(), h2_engine::Error> {
//! let (send_request, connection) = h2_engine::client::handshake(io).await?;
//! tokio::spawn(connection.run());
//!
//! let request = http::Request::builder()
//!     .uri("https://example.invalid/")
//!     .body(())
//!     .unwrap();
//! let response = send_request
//!     .send_request(request, h2_engine::Priority::Normal)
//!     .await?
//!     .await_response()
//!     .await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

mod body;
mod codec;
mod error;
mod frame;
mod priority;
mod proto;
mod session;
mod streams;

pub mod client;

pub use error::{Error, Reason};
pub use priority::Priority;
pub use streams::StreamMetrics;

pub use client::{handshake, BodySource, Builder, Config, Connection, ResponseBody, ResponseFuture, SendRequest};
