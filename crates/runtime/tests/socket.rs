use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

use shard::{ByteStream, ConnectTarget, StreamError, WebSocketTransport};

/// Accept one connection, agree to whatever sub-protocol was requested, and
/// echo binary frames until told how many to serve.
async fn spawn_echo_server(echoes: usize) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |request: &Request, mut response: Response| {
            if let Some(protocol) = request.headers().get("sec-websocket-protocol") {
                response
                    .headers_mut()
                    .insert("sec-websocket-protocol", protocol.clone());
            }
            Ok(response)
        };
        let mut socket = accept_hdr_async(stream, callback).await.unwrap();

        let mut served = 0;
        while served < echoes {
            match socket.next().await {
                Some(Ok(message)) if message.is_binary() => {
                    socket.send(message).await.unwrap();
                    served += 1;
                }
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(_)) => {}
                _ => break,
            }
        }
        socket.close(None).await.ok();
        // Drain until the peer goes away so the close handshake completes.
        while let Some(Ok(_)) = socket.next().await {}
    });

    port
}

#[tokio::test]
async fn round_trip_preserves_byte_order() {
    let port = spawn_echo_server(2).await;
    // The transport adds the plain-scheme offset back onto the base port.
    let target = ConnectTarget::new("127.0.0.1", port - 1, false);

    let transport = WebSocketTransport::connect(&target).await.unwrap();
    let mut stream = ByteStream::new(transport);

    stream.write(&[1, 2, 3]).unwrap();
    stream.write(&[4, 5]).unwrap();

    let mut buf = [0u8; 5];
    stream.read_bytes(&mut buf).await.unwrap();
    assert_eq!(buf, [1, 2, 3, 4, 5]);

    stream.close();
}

#[tokio::test]
async fn server_close_fails_reads_after_drain() {
    let port = spawn_echo_server(1).await;
    let target = ConnectTarget::new("127.0.0.1", port - 1, false);

    let transport = WebSocketTransport::connect(&target).await.unwrap();
    let mut stream = ByteStream::new(transport);

    stream.write(&[42, 43]).unwrap();

    // The echoed frame is readable even though the server hangs up right
    // after sending it.
    assert_eq!(stream.read().await.unwrap(), 42);
    assert_eq!(stream.read().await.unwrap(), 43);

    let err = stream.read().await.unwrap_err();
    assert!(matches!(err, StreamError::TransportClosed));
}

#[tokio::test]
async fn connect_to_dead_port_fails() {
    let target = ConnectTarget::new("127.0.0.1", 9, false);
    let result = WebSocketTransport::connect(&target).await;
    assert!(matches!(result, Err(StreamError::Connect(_))));
}
