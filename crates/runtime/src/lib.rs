pub mod game_loop;
pub mod input;
pub mod net;
pub mod timing;

pub use game_loop::{GameApp, GameLoop, KeyDiscardPolicy, LoopConfig, LoopState};
pub use input::{Key, KeyQueue, MouseClick, MouseState, NO_KEY};
pub use net::{
    ByteStream, ConnectTarget, MessageTransport, SimulatedTransport, StreamError,
    WebSocketTransport,
};
pub use timing::AdaptiveTimestep;
