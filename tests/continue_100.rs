//! Verifies a request carrying `Expect: 100-continue` withholds its body
//! until a `100 Continue` informational response arrives.

mod support;

use bytes::Bytes;

#[tokio::test]
async fn withholds_body_until_100_continue() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let body = Bytes::from_static(b"request payload");
    let request = http::Request::builder()
        .uri("https://example.invalid/upload")
        .header(http::header::EXPECT, "100-continue")
        .body(body)
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    assert_eq!(headers.kind, 1);
    assert_eq!(headers.flags & 0x1, 0, "END_STREAM must not be set while the body is withheld");
    let stream_id = headers.stream_id;

    // No DATA frame should show up before the 100 Continue; send it now.
    peer.send_response_headers(stream_id, 100, false, &[]).await;

    let data = peer.read_significant_frame().await;
    assert_eq!(data.kind, 0, "body should be released once 100 Continue arrives");
    assert_eq!(&data.payload[..], b"request payload");
    assert_eq!(
        data.flags & 0x1,
        0x1,
        "the only DATA frame must carry END_STREAM itself, not a trailing empty frame"
    );

    peer.send_response_headers(stream_id, 200, true, &[]).await;

    let response_future = response_future.await.expect("task panicked");
    let (response, _body) = response_future
        .expect("submit_request should succeed")
        .await_response()
        .await
        .expect("response should arrive");
    assert_eq!(response.status(), 200);
}
