use serde::{Deserialize, Serialize};

use storyboard_core::models::{CursorPosition, UserPresence};

/// Identity a participant declares when joining a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinUser {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

/// Frames accepted from a client. Anything that fails to parse is logged
/// and dropped without touching the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "presence.join")]
    Join { user: JoinUser },
    #[serde(rename = "cursor.move")]
    CursorMove { cursor: CursorPosition },
    /// Opaque relay payload, echoed to the whole room including the sender.
    #[serde(rename = "event")]
    Event { event: serde_json::Value },
}

/// Frames sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "presence.sync")]
    Sync { users: Vec<UserPresence> },
    #[serde(rename = "presence.join")]
    Join { user: UserPresence },
    #[serde(rename = "cursor.move")]
    CursorMove {
        #[serde(rename = "userId")]
        user_id: String,
        cursor: CursorPosition,
    },
    #[serde(rename = "event")]
    Event { event: serde_json::Value },
    #[serde(rename = "presence.leave")]
    Leave {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_frame() {
        let json = r#"{"type":"presence.join","user":{"userId":"u1","name":"Ada","avatar":"🦀"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Join { user } => {
                assert_eq!(user.user_id, "u1");
                assert_eq!(user.name, "Ada");
            }
            _ => panic!("Expected Join"),
        }
    }

    #[test]
    fn parses_cursor_frame() {
        let json = r#"{"type":"cursor.move","cursor":{"x":10.5,"y":20.0}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::CursorMove { cursor } => {
                assert_eq!(cursor.x, 10.5);
                assert_eq!(cursor.y, 20.0);
            }
            _ => panic!("Expected CursorMove"),
        }
    }

    #[test]
    fn rejects_unknown_frame_type() {
        let json = r#"{"type":"presence.poke","userId":"u1"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn leave_frame_uses_camel_case_user_id() {
        let msg = ServerMessage::Leave {
            user_id: "u1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"presence.leave""#));
        assert!(json.contains(r#""userId":"u1""#));
    }

    #[test]
    fn event_frame_round_trips_payload() {
        let msg = ServerMessage::Event {
            event: serde_json::json!({ "kind": "story.updated", "storyId": "s1" }),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ServerMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMessage::Event { event } => assert_eq!(event["storyId"], "s1"),
            _ => panic!("Expected Event"),
        }
    }
}
