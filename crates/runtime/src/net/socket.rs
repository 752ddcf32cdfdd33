use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::Message;

use super::transport::{ConnectTarget, MessageTransport, StreamError};

const SUBPROTOCOL: &str = "binary";

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

/// Message transport over a websocket, negotiated with the `binary`
/// sub-protocol.
///
/// The socket is split into two forwarding tasks so that inbound frames are
/// buffered without ever blocking a reader: the transport itself only talks
/// to a pair of unbounded channels.
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    open: Arc<AtomicBool>,
}

impl WebSocketTransport {
    pub async fn connect(target: &ConnectTarget) -> Result<Self, StreamError> {
        let url = target.url();
        let mut request = url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let (socket, _response) = connect_async(request).await?;
        log::info!("connection open: {url}");

        let (mut sink, mut source) = socket.split();
        let open = Arc::new(AtomicBool::new(true));
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let writer_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    Outbound::Frame(data) => {
                        if let Err(err) = sink.send(Message::Binary(data.into())).await {
                            log::warn!("connection write error: {err}");
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            writer_open.store(false, Ordering::Release);
        });

        let reader_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Binary(data)) => {
                        if in_tx.send(data.to_vec()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        log::info!("connection closed by peer");
                        break;
                    }
                    // Text, ping and pong frames only keep the connection
                    // alive.
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("connection read error: {err}");
                        break;
                    }
                }
            }
            reader_open.store(false, Ordering::Release);
        });

        Ok(Self {
            outbound: out_tx,
            inbound: in_rx,
            open,
        })
    }
}

impl MessageTransport for WebSocketTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        if !self.is_open() {
            return Err(StreamError::TransportClosed);
        }
        self.outbound
            .send(Outbound::Frame(payload.to_vec()))
            .map_err(|_| StreamError::TransportClosed)
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.try_recv().ok()
    }

    fn close(&mut self) {
        if self.is_open() {
            self.open.store(false, Ordering::Release);
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}
