mod simulator;
mod socket;
mod stream;
mod transport;

pub use simulator::SimulatedTransport;
pub use socket::WebSocketTransport;
pub use stream::ByteStream;
pub use transport::{ConnectTarget, MessageTransport, StreamError};
