//! Verifies the two streaming `BodySource` constructors (design doc §4.4)
//! actually move bytes onto the wire, not just the in-memory `Bytes` path
//! every other test exercises.

mod support;

use bytes::Bytes;
use h2_engine::BodySource;

#[tokio::test]
async fn async_read_body_is_streamed_to_completion() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let reader = std::io::Cursor::new(b"streamed from an AsyncRead".to_vec());
    let request = http::Request::builder()
        .uri("https://example.invalid/upload")
        .body(BodySource::from_async_read(reader))
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    assert_eq!(headers.kind, 1);
    assert_eq!(headers.flags & 0x1, 0, "headers must not carry END_STREAM when a body follows");
    let stream_id = headers.stream_id;

    let data = peer.read_significant_frame().await;
    assert_eq!(data.kind, 0);
    assert_eq!(&data.payload[..], b"streamed from an AsyncRead");
    assert_eq!(data.flags & 0x1, 0x1, "the only DATA frame must carry END_STREAM itself");
    assert_eq!(data.stream_id, stream_id);

    peer.send_response_headers(stream_id, 200, true, &[]).await;

    let response_future = response_future.await.expect("task panicked");
    let (response, _body) = response_future
        .expect("submit_request should succeed")
        .await_response()
        .await
        .expect("response should arrive");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn blocking_body_is_streamed_to_completion() {
    let (send_request, _conn, mut peer) = support::setup().await;

    let mut chunks = vec![
        Bytes::from_static(b"first chunk "),
        Bytes::from_static(b"second chunk"),
    ]
    .into_iter();

    let request = http::Request::builder()
        .uri("https://example.invalid/upload")
        .body(BodySource::from_blocking_read(move || Ok(chunks.next())))
        .unwrap();

    let response_future = tokio::spawn(async move {
        send_request
            .send_request(request, h2_engine::Priority::Normal)
            .await
    });

    let headers = peer.read_significant_frame().await;
    assert_eq!(headers.kind, 1);
    let stream_id = headers.stream_id;

    let mut body = Vec::new();
    let mut saw_end_stream = false;
    while !saw_end_stream {
        let data = peer.read_significant_frame().await;
        assert_eq!(data.kind, 0);
        body.extend_from_slice(&data.payload);
        saw_end_stream = data.flags & 0x1 != 0;
    }
    assert_eq!(&body[..], b"first chunk second chunk");

    peer.send_response_headers(stream_id, 200, true, &[]).await;

    let response_future = response_future.await.expect("task panicked");
    let (response, _body) = response_future
        .expect("submit_request should succeed")
        .await_response()
        .await
        .expect("response should arrive");
    assert_eq!(response.status(), 200);
}
