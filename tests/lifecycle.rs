//! Exercises the per-message lifecycle operations beyond the basic
//! send/receive path: `skip`, `pause`/`unpause`, and graceful
//! `close_async` (design doc §4.1).

mod support;

use futures_util::StreamExt;

#[tokio::test]
async fn skip_resets_stream_and_discards_remaining_body() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/big")
        .body(())
        .unwrap();

    let response_future = send_request
        .send_request(request, h2_engine::Priority::Normal)
        .await
        .expect("submit_request should succeed");

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    peer.send_response_headers(stream_id, 200, false, &[]).await;
    peer.send_data(stream_id, b"first", false).await;

    let (response, body) = response_future
        .await_response()
        .await
        .expect("headers already arrived");
    assert_eq!(response.status(), 200);

    body.skip();

    let reset = peer.read_significant_frame().await;
    assert_eq!(reset.kind, 3, "expected RST_STREAM after skip");
    assert_eq!(reset.stream_id, stream_id);
    assert_eq!(support::read_u32(&reset.payload), 0x5, "expected STREAM_CLOSED error code");

    drop(send_request);
}

#[tokio::test]
async fn pause_withholds_delivery_until_unpause() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/paused")
        .body(())
        .unwrap();

    let response_future = send_request
        .send_request(request, h2_engine::Priority::Normal)
        .await
        .expect("submit_request should succeed");

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    peer.send_response_headers(stream_id, 200, false, &[]).await;

    let (_response, mut body) = response_future
        .await_response()
        .await
        .expect("headers already arrived");

    body.pause();
    assert!(body.is_paused());

    peer.send_data(stream_id, b"hello", true).await;

    // Give the session task a chance to decode the DATA frame into the
    // (paused) sink before we assert nothing is delivered yet.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let next = tokio::time::timeout(std::time::Duration::from_millis(20), body.next()).await;
    assert!(next.is_err(), "paused body must not deliver a queued chunk");

    body.unpause();
    assert!(!body.is_paused());

    let chunk = body.next().await.expect("chunk available after unpause").expect("chunk ok");
    assert_eq!(&chunk[..], b"hello");
    assert!(body.next().await.is_none(), "expected EOF after the only chunk");
}

#[tokio::test]
async fn close_async_sends_goaway_and_completes() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let closed = tokio::spawn({
        let send_request = send_request.clone();
        async move { send_request.close_async().await }
    });

    let goaway = peer.read_significant_frame().await;
    assert_eq!(goaway.kind, 7, "expected GOAWAY frame");

    assert!(closed.await.expect("close task panicked"), "close_async should report success");
    assert!(!send_request.is_open(), "session must report closed after close_async");

    let second = send_request.close_async().await;
    assert!(!second, "a second close_async should report already-shutting-down");
}
