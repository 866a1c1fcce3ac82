//! Huddle Signal Server
//!
//! Lightweight signaling relay for peer-to-peer audio/video rooms.
//! Clients connect via WebSocket, join a named room to discover peers,
//! and exchange connection-negotiation messages (offers, answers, ICE
//! candidates) through the relay.
//!
//! # Protocol
//!
//! 1. Client connects and sends `join` with a username and room id
//! 2. Server broadcasts `userJoined` to the room and returns the
//!    current roster to the joiner as `roomUsers`
//! 3. Peers relay `offer`/`answer`/`iceCandidate` payloads to each
//!    other by participant id; the server never inspects them
//! 4. Peers establish a direct media connection
//! 5. On disconnect the server broadcasts `userLeft` and garbage
//!    collects empty rooms
//!
//! All state is transient and in-memory; there is no persistence.

pub mod messages;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod server;

pub use messages::{ClientMessage, RoomUser, ServerMessage};
pub use registry::{Participant, Registry};
pub use rooms::{RoomDirectory, RoomSummary};
pub use router::{Delivery, Event, SignalRouter};
pub use server::SignalServer;

/// Default WebSocket/HTTP port
pub const DEFAULT_PORT: u16 = 3000;
