//! Verifies `ResponseBody::release_capacity` reaches the wire as a
//! `WINDOW_UPDATE` frame once the consumer frees buffered response body
//! bytes (design doc §4.4's stream-level flow control).

mod support;

use futures_util::StreamExt;

#[tokio::test]
async fn releasing_capacity_sends_window_update() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/download")
        .body(())
        .unwrap();

    let response_future = send_request
        .send_request(request, h2_engine::Priority::Normal)
        .await
        .expect("submit_request should succeed");

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    peer.send_response_headers(stream_id, 200, false, &[]).await;
    peer.send_data(stream_id, b"chunk of response body", false).await;

    let (response, mut body) = response_future
        .await_response()
        .await
        .expect("headers already arrived");
    assert_eq!(response.status(), 200);

    let chunk = body.next().await.expect("chunk buffered").expect("chunk ok");
    assert_eq!(&chunk[..], b"chunk of response body");

    body.release_capacity(chunk.len() as u32);

    let update = peer.read_significant_frame().await;
    assert_eq!(update.kind, 8, "expected WINDOW_UPDATE after releasing capacity");
    assert_eq!(update.stream_id, stream_id);
    assert_eq!(support::read_u32(&update.payload), chunk.len() as u32);

    peer.send_data(stream_id, b"", true).await;
    let _ = body.next().await;
}
