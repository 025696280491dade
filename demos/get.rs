//! Issues a single GET request over a plaintext HTTP/2 connection and
//! prints the response status and body to stdout.
//!
//! ```text
//! cargo run --example get -- example.invalid 443
//! ```

use std::env;

use futures_util::StreamExt;
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "example.invalid".to_string());
    let port: u16 = args.next().and_then(|p| p.parse().ok()).unwrap_or(80);

    let tcp = TcpStream::connect((host.as_str(), port)).await?;
    let (send_request, connection) = h2_engine::handshake(tcp).await?;

    tokio::spawn(connection.run());

    let request = http::Request::builder()
        .uri(format!("http://{host}/"))
        .header(http::header::HOST, host.as_str())
        .body(())?;

    let response_future = send_request
        .send_request(request, h2_engine::Priority::Normal)
        .await?;

    let (response, mut body) = response_future.await_response().await?;
    println!("status: {}", response.status());

    let mut total = 0usize;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        total += chunk.len();
        body.release_capacity(chunk.len() as u32);
    }
    println!("body: {total} bytes");

    Ok(())
}
