//! Ephemeral presence: per-room participant state with best-effort fan-out
//! over WebSocket connections. No persistence, no ordering across senders;
//! a late joiner reconciles from the `presence.sync` snapshot it receives
//! when its connection opens.

mod protocol;
mod registry;
mod socket;

pub use protocol::{ClientMessage, JoinUser, ServerMessage};
pub use registry::RoomRegistry;
pub use socket::ws_handler;
