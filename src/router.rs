//! Signaling router
//!
//! The behavioral core: join protocol, negotiation relay, and
//! disconnect cleanup over the shared registry/directory state.
//!
//! The registry and directory carry a bidirectional consistency
//! invariant (every participant's room contains the participant, and
//! every room member has a registry entry pointing back at the room),
//! so both live behind one mutex and every protocol runs as a single
//! critical section. Handlers return the full list of outbound
//! deliveries computed under the lock; the transport layer performs
//! the actual sends after the lock is released.

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::messages::{ClientMessage, RoomUser, ServerMessage};
use crate::registry::Registry;
use crate::rooms::{RoomDirectory, RoomSummary};

/// Inbound events, one per protocol interaction plus the implicit
/// disconnect reported by the transport layer
#[derive(Clone, Debug)]
pub enum Event {
    Join { username: String, room_id: String },
    Offer { target: String, offer: Value },
    Answer { target: String, answer: Value },
    IceCandidate { target: String, candidate: Value },
    Disconnect,
}

impl From<ClientMessage> for Event {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Join { username, room_id } => Event::Join { username, room_id },
            ClientMessage::Offer { target, offer } => Event::Offer { target, offer },
            ClientMessage::Answer { target, answer } => Event::Answer { target, answer },
            ClientMessage::IceCandidate { target, candidate } => {
                Event::IceCandidate { target, candidate }
            }
        }
    }
}

/// An outbound message addressed to one participant
#[derive(Clone, Debug)]
pub struct Delivery {
    pub to: String,
    pub message: ServerMessage,
}

struct RouterState {
    registry: Registry,
    rooms: RoomDirectory,
}

/// Router over the shared presence state
pub struct SignalRouter {
    state: Mutex<RouterState>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                registry: Registry::new(),
                rooms: RoomDirectory::new(),
            }),
        }
    }

    /// Process one inbound event from `peer_id` and return the
    /// outbound deliveries it produced
    pub fn dispatch(&self, peer_id: &str, event: Event) -> Vec<Delivery> {
        let mut state = self.state.lock();
        match event {
            Event::Join { username, room_id } => {
                Self::handle_join(&mut state, peer_id, &username, &room_id)
            }
            Event::Offer { target, offer } => Self::relay(
                &state,
                peer_id,
                &target,
                ServerMessage::Offer {
                    offer,
                    from: peer_id.to_string(),
                },
            ),
            Event::Answer { target, answer } => Self::relay(
                &state,
                peer_id,
                &target,
                ServerMessage::Answer {
                    answer,
                    from: peer_id.to_string(),
                },
            ),
            Event::IceCandidate { target, candidate } => Self::relay(
                &state,
                peer_id,
                &target,
                ServerMessage::IceCandidate {
                    candidate,
                    from: peer_id.to_string(),
                },
            ),
            Event::Disconnect => Self::handle_disconnect(&mut state, peer_id),
        }
    }

    /// Room listing snapshot (for the reporting endpoint)
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.state.lock().rooms.list()
    }

    /// Active room count (for monitoring)
    pub fn room_count(&self) -> usize {
        self.state.lock().rooms.len()
    }

    /// Joined participant count (for monitoring)
    pub fn participant_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    fn handle_join(
        state: &mut RouterState,
        peer_id: &str,
        username: &str,
        room_id: &str,
    ) -> Vec<Delivery> {
        // A second join from an already-joined participant acts as an
        // implicit leave-then-join, keeping the registry and directory
        // consistent instead of leaving the old room's member behind.
        let mut deliveries = if state.registry.contains(peer_id) {
            Self::handle_disconnect(state, peer_id)
        } else {
            Vec::new()
        };

        state.rooms.ensure(room_id);
        state.rooms.add(room_id, peer_id);
        state.registry.set(peer_id, username, room_id);

        let mut roster = Vec::new();
        if let Some(members) = state.rooms.members(room_id) {
            for id in members.iter().filter(|id| id.as_str() != peer_id) {
                deliveries.push(Delivery {
                    to: id.clone(),
                    message: ServerMessage::UserJoined {
                        user_id: peer_id.to_string(),
                        username: username.to_string(),
                    },
                });

                // A member listed in the room but missing from the
                // registry is a transient inconsistency; leave it out
                // of the roster rather than fail the join.
                if let Some(peer) = state.registry.get(id) {
                    roster.push(RoomUser {
                        user_id: id.clone(),
                        username: peer.username.clone(),
                    });
                }
            }
        }

        deliveries.push(Delivery {
            to: peer_id.to_string(),
            message: ServerMessage::RoomUsers { users: roster },
        });

        info!("{} joined room {}", username, room_id);
        deliveries
    }

    fn relay(
        state: &RouterState,
        from: &str,
        target: &str,
        message: ServerMessage,
    ) -> Vec<Delivery> {
        if target.is_empty() {
            debug!("dropping relay with empty target from {}", from);
            return Vec::new();
        }

        // Negotiation messages are best effort: an unknown target is
        // dropped without any signal to the sender.
        if !state.registry.contains(target) {
            debug!("dropping relay from {} to unknown target {}", from, target);
            return Vec::new();
        }

        vec![Delivery {
            to: target.to_string(),
            message,
        }]
    }

    fn handle_disconnect(state: &mut RouterState, peer_id: &str) -> Vec<Delivery> {
        // Unknown id: already cleaned up or never joined
        let Some(participant) = state.registry.remove(peer_id) else {
            return Vec::new();
        };

        state.rooms.remove(&participant.room_id, peer_id);

        let mut deliveries = Vec::new();
        if let Some(members) = state.rooms.members(&participant.room_id) {
            for id in members {
                deliveries.push(Delivery {
                    to: id.clone(),
                    message: ServerMessage::UserLeft {
                        user_id: peer_id.to_string(),
                    },
                });
            }
        }

        info!(
            "{} left room {}",
            participant.username, participant.room_id
        );
        deliveries
    }
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new()
    }
}
