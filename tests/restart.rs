//! Verifies a peer-refused stream surfaces as a restartable error (design
//! doc §7's error-handling table: `REFUSED_STREAM` is always safe to retry
//! on a fresh connection, since the peer guarantees it did no processing).

mod support;

#[tokio::test]
async fn refused_stream_is_restartable() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/retry-me")
        .body(())
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    peer.send_rst_stream(stream_id, 0x7 /* REFUSED_STREAM */).await;

    let response_future = response_future.await.expect("task panicked");
    let err = response_future
        .expect("submit_request itself should still succeed")
        .await_response()
        .await
        .expect_err("a refused stream must fail the response");

    assert!(err.is_restartable(), "REFUSED_STREAM must be restartable: {err:?}");
    assert!(matches!(err, h2_engine::Error::StreamRefused));
}

#[tokio::test]
async fn other_reset_reasons_are_not_restartable() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/wont-retry")
        .body(())
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    peer.send_rst_stream(stream_id, 0x1 /* PROTOCOL_ERROR */).await;

    let response_future = response_future.await.expect("task panicked");
    let err = response_future
        .expect("submit_request itself should still succeed")
        .await_response()
        .await
        .expect_err("a reset stream must fail the response");

    assert!(!err.is_restartable());
}
