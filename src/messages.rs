//! Signaling protocol messages
//!
//! JSON text frames, tagged by a camelCase `type` field. Negotiation
//! payloads (`offer`, `answer`, `candidate`) are opaque JSON values:
//! the relay forwards them verbatim and never inspects their contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages received from a connected client
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join a room, creating it if it does not exist
    #[serde(rename_all = "camelCase")]
    Join { username: String, room_id: String },

    /// Relay a session offer to another participant
    Offer { target: String, offer: Value },

    /// Relay a session answer to another participant
    Answer { target: String, answer: Value },

    /// Relay a network-path candidate to another participant
    IceCandidate { target: String, candidate: Value },
}

/// Messages sent to connected clients
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A new participant joined the recipient's room
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: String, username: String },

    /// Roster of existing room members, sent to a joiner only
    RoomUsers { users: Vec<RoomUser> },

    /// Relayed session offer
    Offer { offer: Value, from: String },

    /// Relayed session answer
    Answer { answer: Value, from: String },

    /// Relayed network-path candidate
    IceCandidate { candidate: Value, from: String },

    /// A participant left the recipient's room
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String },
}

/// One roster entry in a `roomUsers` message
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub user_id: String,
    pub username: String,
}

impl ClientMessage {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ServerMessage {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_deserialization() {
        let msg = ClientMessage::from_json(
            r#"{"type":"join","username":"alice","roomId":"lobby"}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::Join { username, room_id } => {
                assert_eq!(username, "alice");
                assert_eq!(room_id, "lobby");
            }
            _ => panic!("wrong message type"),
        }
    }

    #[test]
    fn test_ice_candidate_tag_is_camel_case() {
        let msg = ClientMessage::from_json(
            r#"{"type":"iceCandidate","target":"abc","candidate":{"sdpMid":"0"}}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::IceCandidate { .. }));

        let out = ServerMessage::IceCandidate {
            candidate: json!({"sdpMid": "0"}),
            from: "def".into(),
        };
        assert!(out.to_json().unwrap().contains(r#""type":"iceCandidate""#));
    }

    #[test]
    fn test_relayed_offer_payload_is_opaque() {
        // Arbitrary nested structure must survive untouched
        let payload = json!({"sdp": "v=0\r\no=- 42 2 IN IP4 127.0.0.1", "nested": [1, {"k": null}]});
        let out = ServerMessage::Offer {
            offer: payload.clone(),
            from: "peer1".into(),
        };

        let json = out.to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["offer"], payload);
        assert_eq!(parsed["from"], "peer1");
    }

    #[test]
    fn test_roster_serialization() {
        let out = ServerMessage::RoomUsers {
            users: vec![RoomUser {
                user_id: "abc".into(),
                username: "alice".into(),
            }],
        };

        let json = out.to_json().unwrap();
        assert!(json.contains(r#""type":"roomUsers""#));
        assert!(json.contains(r#""userId":"abc""#));
        assert!(json.contains(r#""username":"alice""#));
    }

    #[test]
    fn test_malformed_message_is_an_error() {
        assert!(ClientMessage::from_json(r#"{"type":"join","username":"alice"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"shout","text":"hi"}"#).is_err());
    }
}
