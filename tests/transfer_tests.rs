use serde_json::json;
use std::time::{Duration, Instant};
use tcp_json_transfer::payload::{plot_window, profile};
use tcp_json_transfer::{
    endpoint, receive_once, send_payload, Payload, PayloadKind, PlotWindow, Receiver,
    ReceiverState, Sender, TransferError, DEFAULT_HOST, DEFAULT_PORT,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Bind a receiver on an OS-chosen loopback port.
async fn bind_receiver() -> (Receiver, String) {
    let receiver = Receiver::bind("127.0.0.1:0").await.expect("bind receiver");
    let addr = receiver.local_addr().to_string();
    (receiver, addr)
}

#[tokio::test]
async fn test_plot_window_end_to_end() {
    let (mut receiver, addr) = bind_receiver().await;

    let sender = tokio::spawn(async move { send_payload(&addr, &plot_window()).await });
    let received = tokio::time::timeout(Duration::from_secs(5), receiver.accept_one())
        .await
        .expect("receiver timed out")
        .expect("receive failed");
    let written = sender.await.unwrap().unwrap();

    assert_eq!(received.bytes.len(), written);
    assert_eq!(received.payload, plot_window());
    assert_eq!(receiver.state(), ReceiverState::Done);

    let payload = &received.payload;
    let keys: Vec<&str> = payload.keys().collect();
    assert_eq!(
        keys,
        vec![
            "title", "x_label", "y_label", "width", "height", "y_count", "max_point", "x_step",
            "x_range", "y_min", "y_max", "x_grid_step", "y_grid_step", "y_color",
        ]
    );
    assert_eq!(payload.get("title"), Some(&json!("larrylisky")));
    assert_eq!(payload.get("width"), Some(&json!(800)));
    assert_eq!(payload.get("height"), Some(&json!(400)));
    assert_eq!(payload.get("y_count"), Some(&json!(3)));
    assert_eq!(
        payload.get("y_color"),
        Some(&json!([
            {"r": 255, "b": 0, "g": 0, "a": 255},
            {"r": 0, "b": 255, "g": 0, "a": 255},
            {"r": 0, "b": 0, "g": 255, "a": 255}
        ]))
    );

    let window = received.plot_window().expect("valid plot window");
    assert_eq!(window, PlotWindow::from_payload(&plot_window()).unwrap());
}

#[tokio::test]
async fn test_profile_end_to_end() {
    let (mut receiver, addr) = bind_receiver().await;

    let sender = tokio::spawn(async move {
        let sender = Sender::connect(&addr).await?;
        sender.send(&PayloadKind::Profile.build()).await
    });
    let received = receiver.accept_one().await.unwrap();
    sender.await.unwrap().unwrap();

    let payload = &received.payload;
    assert_eq!(payload.get("active"), Some(&json!(true)));
    assert!(payload.get("active").unwrap().is_boolean());
    let tags = payload.get("tags").unwrap().as_array().unwrap();
    assert_eq!(tags.len(), 3);
    assert_eq!(tags, &vec![json!("python"), json!("json"), json!("network")]);
    assert_eq!(payload.get("score"), Some(&json!(100)));
    assert_eq!(payload, &profile());
    assert_eq!(received.text(), profile().to_string());
}

#[tokio::test]
async fn test_default_endpoint_end_to_end() {
    let target = endpoint(DEFAULT_HOST, DEFAULT_PORT);
    let bind_to = target.clone();
    let receiving = tokio::spawn(async move { receive_once(&bind_to).await });

    // Let the receiver bind before the single connect attempt.
    tokio::time::sleep(Duration::from_millis(100)).await;
    if receiving.is_finished() {
        let outcome = receiving.await.expect("receiver task panicked");
        panic!(
            "{target} must be free for this test (is a receiver already running?): {:?}",
            outcome.err()
        );
    }
    send_payload(&target, &profile())
        .await
        .unwrap_or_else(|e| panic!("sending to the receiver on {target} failed: {e}"));

    let received = tokio::time::timeout(Duration::from_secs(5), receiving)
        .await
        .expect("receiver timed out")
        .expect("receiver task panicked")
        .unwrap_or_else(|e| panic!("receiver on {target} failed: {e}"));
    assert_eq!(received.payload, profile());
    assert_eq!(received.peer.ip().to_string(), DEFAULT_HOST);
}

#[tokio::test]
async fn test_empty_stream_fails_decode() {
    let (mut receiver, addr) = bind_receiver().await;

    let client = tokio::spawn(async move {
        let stream = TcpStream::connect(addr).await.unwrap();
        drop(stream);
    });

    let result = tokio::time::timeout(Duration::from_secs(5), receiver.accept_one())
        .await
        .expect("empty stream must not hang");
    client.await.unwrap();

    match result {
        Err(TransferError::Json(e)) => assert!(e.is_eof()),
        other => panic!("expected EOF decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_receiver_reads_until_peer_closes() {
    let (receiver, addr) = bind_receiver().await;
    let mut receiver = receiver.with_chunk_size(5);
    let bytes = plot_window().encode().unwrap();
    let expected = bytes.clone();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for piece in bytes.chunks(37) {
            stream.write_all(piece).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stream.shutdown().await.unwrap();
    });

    let received = receiver.accept_one().await.unwrap();
    client.await.unwrap();
    assert_eq!(received.bytes, expected);
    assert_eq!(received.payload, plot_window());
}

#[tokio::test]
async fn test_half_close_is_end_of_message() {
    let (mut receiver, addr) = bind_receiver().await;

    // Keeps the read half open after shutting down the write half.
    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(br#"{"k": [1, 2]}"#).await.unwrap();
        stream.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(stream);
    });

    let received = receiver.accept_one().await.unwrap();
    client.await.unwrap();
    assert_eq!(received.payload.get("k"), Some(&json!([1, 2])));
}

#[tokio::test]
async fn test_malformed_payload_fails() {
    let (mut receiver, addr) = bind_receiver().await;

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"not json at all").await.unwrap();
    });

    let result = receiver.accept_one().await;
    client.await.unwrap();
    assert!(matches!(result, Err(TransferError::Json(_))));
}

#[tokio::test]
async fn test_sender_fails_fast_without_listener() {
    let addr = {
        let (receiver, addr) = bind_receiver().await;
        drop(receiver);
        addr
    };

    let started = Instant::now();
    let result = send_payload(&addr, &profile()).await;
    assert!(matches!(result, Err(TransferError::Connect { .. })));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "connect should not retry, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_large_payload_spans_many_reads() {
    let (mut receiver, addr) = bind_receiver().await;

    let mut payload = Payload::new();
    for i in 0..2000 {
        payload.insert(format!("key_{i:04}"), json!({"index": i, "even": i % 2 == 0}));
    }
    let expected = payload.clone();

    let sender = tokio::spawn(async move { send_payload(&addr, &payload).await });
    let received = receiver.accept_one().await.unwrap();
    let written = sender.await.unwrap().unwrap();

    assert!(written > 10 * tcp_json_transfer::READ_CHUNK_SIZE);
    assert_eq!(received.payload, expected);
}
