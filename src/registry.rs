//! Connection registry
//!
//! Bookkeeping for currently connected participants and their room
//! membership. Absence is a normal checked result, not an error.

use std::collections::HashMap;

/// One connected participant
#[derive(Clone, Debug)]
pub struct Participant {
    /// Transport-assigned id, stable for the connection lifetime
    pub id: String,

    /// Display name supplied at join time, not validated for uniqueness
    pub username: String,

    /// The room this participant currently belongs to
    pub room_id: String,
}

/// Registry of connected participants by id
#[derive(Default)]
pub struct Registry {
    participants: HashMap<String, Participant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a participant's username and room membership
    pub fn set(&mut self, id: &str, username: &str, room_id: &str) {
        self.participants.insert(
            id.to_string(),
            Participant {
                id: id.to_string(),
                username: username.to_string(),
                room_id: room_id.to_string(),
            },
        );
    }

    /// Look up a participant
    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Remove a participant; no-op on an unknown id
    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        self.participants.remove(id)
    }

    /// Whether the id belongs to a connected participant
    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    /// All connected participants
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Number of connected participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut registry = Registry::new();
        assert!(registry.get("a").is_none());

        registry.set("a", "alice", "lobby");
        let p = registry.get("a").unwrap();
        assert_eq!(p.username, "alice");
        assert_eq!(p.room_id, "lobby");
        assert_eq!(registry.len(), 1);

        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = Registry::new();
        assert!(registry.remove("ghost").is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let mut registry = Registry::new();
        registry.set("a", "alice", "lobby");
        registry.set("a", "alicia", "den");

        let p = registry.get("a").unwrap();
        assert_eq!(p.username, "alicia");
        assert_eq!(p.room_id, "den");
        assert_eq!(registry.len(), 1);
    }
}
