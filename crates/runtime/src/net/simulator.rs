use std::collections::VecDeque;

use super::transport::{MessageTransport, StreamError};

/// In-memory transport for tests and offline runs: inbound frames are
/// scripted with [`deliver`](Self::deliver), outbound frames are recorded.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    closed: bool,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame as if it had just arrived from the wire.
    pub fn deliver(&mut self, frame: impl Into<Vec<u8>>) {
        self.inbound.push_back(frame.into());
    }

    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }
}

impl MessageTransport for SimulatedTransport {
    fn is_open(&self) -> bool {
        !self.closed
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::TransportClosed);
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }

    // Frames delivered before the close stay receivable, mirroring data that
    // was already on the wire.
    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.pop_front()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
