//! Room directory
//!
//! Maps room ids to the set of participant ids currently joined. Rooms
//! are created lazily on first join and deleted eagerly when the last
//! member leaves, so a listing never shows an empty room.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// Directory of active rooms by id
#[derive(Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, HashSet<String>>,
}

/// Listing entry for external reporting
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub user_count: usize,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the member set for a room, creating an empty one if absent
    pub fn ensure(&mut self, room_id: &str) -> &HashSet<String> {
        self.rooms.entry(room_id.to_string()).or_default()
    }

    /// Add a participant to a room, creating the room if needed
    pub fn add(&mut self, room_id: &str, participant_id: &str) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(participant_id.to_string());
    }

    /// Remove a participant from a room, deleting the room entry if it
    /// empties. No-op on an unknown room or member.
    pub fn remove(&mut self, room_id: &str, participant_id: &str) {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(participant_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
    }

    /// Member ids for a room, if it exists
    pub fn members(&self, room_id: &str) -> Option<&HashSet<String>> {
        self.rooms.get(room_id)
    }

    /// Snapshot of all rooms with member counts, unspecified order
    pub fn list(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|(id, members)| RoomSummary {
                id: id.clone(),
                user_count: members.len(),
            })
            .collect()
    }

    /// Number of active rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
