use std::collections::VecDeque;
use std::time::Duration;

use tokio::time;

use super::transport::{MessageTransport, StreamError};

const READ_RETRY: Duration = Duration::from_millis(1);

/// Ordered byte view over a message transport.
///
/// Inbound messages are buffered whole as chunks; readers consume them byte
/// by byte in arrival order. A starved read suspends and retries until data
/// arrives or the transport is closed with nothing left buffered.
pub struct ByteStream<T> {
    transport: T,
    queue: VecDeque<Vec<u8>>,
    current: Option<Vec<u8>>,
    offset: usize,
    remaining: usize,
}

impl<T: MessageTransport> ByteStream<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            queue: VecDeque::new(),
            current: None,
            offset: 0,
            remaining: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unread bytes across the chunk queue and the chunk being read. Callers
    /// use this to decide whether a whole message can be decoded without
    /// suspending.
    pub fn available(&mut self) -> usize {
        self.pump();
        self.remaining
    }

    /// Send the payload as exactly one outbound message.
    pub fn write(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        if !self.transport.is_open() {
            return Err(StreamError::TransportClosed);
        }
        self.transport.send(payload)
    }

    /// Next unread byte. Buffered bytes are always drained before a closed
    /// transport turns into an error.
    pub async fn read(&mut self) -> Result<u8, StreamError> {
        loop {
            self.pump();
            if let Some(value) = self.take_byte() {
                return Ok(value);
            }
            if !self.transport.is_open() {
                return Err(StreamError::TransportClosed);
            }
            time::sleep(READ_RETRY).await;
        }
    }

    /// Fill `dst` with the next `dst.len()` bytes in order. An empty `dst`
    /// completes immediately without suspending, so zero-payload messages
    /// never block a caller.
    pub async fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), StreamError> {
        if dst.is_empty() {
            return Ok(());
        }
        for slot in dst {
            *slot = self.read().await?;
        }
        Ok(())
    }

    /// Close the transport, keeping already-buffered bytes readable.
    pub fn close(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
        }
    }

    /// Close the transport and drop everything buffered.
    pub fn clear(&mut self) {
        self.close();
        self.queue.clear();
        self.current = None;
        self.offset = 0;
        self.remaining = 0;
    }

    fn pump(&mut self) {
        while let Some(chunk) = self.transport.try_recv() {
            if chunk.is_empty() {
                continue;
            }
            self.remaining += chunk.len();
            self.queue.push_back(chunk);
        }
    }

    fn take_byte(&mut self) -> Option<u8> {
        loop {
            let chunk = match self.current.take() {
                Some(chunk) => chunk,
                None => {
                    let next = self.queue.pop_front()?;
                    self.offset = 0;
                    next
                }
            };
            if self.offset >= chunk.len() {
                continue;
            }
            let value = chunk[self.offset];
            self.offset += 1;
            self.remaining -= 1;
            if self.offset < chunk.len() {
                self.current = Some(chunk);
            }
            return Some(value);
        }
    }
}
