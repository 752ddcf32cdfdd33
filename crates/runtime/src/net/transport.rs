use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("transport is closed")]
    TransportClosed,
    #[error("websocket connect failed: {0}")]
    Connect(#[from] tungstenite::Error),
}

/// Seam over a duplex, message-oriented transport that delivers framed
/// binary messages in order, exactly once. One `send` is one wire message.
pub trait MessageTransport {
    fn is_open(&self) -> bool;

    fn send(&mut self, payload: &[u8]) -> Result<(), StreamError>;

    /// Next inbound message if one has arrived; never blocks. Messages that
    /// were already on the wire stay receivable after the transport closes.
    fn try_recv(&mut self) -> Option<Vec<u8>>;

    fn close(&mut self);
}

/// Where to connect: the scheme picks both the websocket prefix and a port
/// offset from the advertised base port.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl ConnectTarget {
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }

    /// Derive a target from a page origin such as `https://play.example.com`.
    pub fn from_origin(origin: &str, port: u16) -> Self {
        let secure = origin.starts_with("https");
        let host = origin
            .find("//")
            .map(|at| &origin[at + 2..])
            .unwrap_or(origin);
        Self::new(host, port, secure)
    }

    pub fn url(&self) -> String {
        let (scheme, offset) = if self.secure { ("wss", 2) } else { ("ws", 1) };
        format!(
            "{scheme}://{}:{}",
            self.host,
            self.port.saturating_add(offset)
        )
    }
}
