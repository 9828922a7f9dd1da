// Public API
pub use connection_manager::{ConnectionId, ConnectionManager, InMemoryConnectionManager, OutboundSender};
pub use handler::{
    general_websocket_handler, room_websocket_handler, GlobalMessageHandler, RoomMessageHandler,
};
pub use messages::{ClientMessage, Inbound, ServerMessage};
pub use socket::{Connection, ConnectionContext, MessageHandler, SocketError};

// Internal modules
mod connection_manager;
mod handler;
mod messages;
mod socket;
