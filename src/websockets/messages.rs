use serde::{Deserialize, Serialize};

use crate::message::MessageView;

/// Events a client may send over its connection.
///
/// Wire format: `{"type": "<eventName>", "payload": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom(RoomPayload),
    LeaveRoom(RoomPayload),
    SendMessage(SendMessagePayload),
    Typing(RoomPayload),
    StopTyping(RoomPayload),
}

impl ClientEvent {
    /// Parses a text frame, rejecting unknown types, missing fields and blank room IDs
    pub fn parse(frame: &str) -> Result<Self, String> {
        let event: ClientEvent =
            serde_json::from_str(frame).map_err(|e| format!("Malformed event: {}", e))?;

        if event.room_id().trim().is_empty() {
            return Err("roomId is required".to_string());
        }
        Ok(event)
    }

    pub fn room_id(&self) -> &str {
        match self {
            ClientEvent::JoinRoom(p)
            | ClientEvent::LeaveRoom(p)
            | ClientEvent::Typing(p)
            | ClientEvent::StopTyping(p) => &p.room_id,
            ClientEvent::SendMessage(p) => &p.room_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "joinRoom",
            ClientEvent::LeaveRoom(_) => "leaveRoom",
            ClientEvent::SendMessage(_) => "sendMessage",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::StopTyping(_) => "stopTyping",
        }
    }
}

/// Events the relay delivers to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    UserStatusChange(UserStatusPayload),
    /// Payload is the room ID
    JoinedRoom(String),
    /// Payload is the room ID
    LeftRoom(String),
    NewMessage(MessageView),
    UserTyping(UserTypingPayload),
    UserStopTyping(UserStopTypingPayload),
    MessageError(ErrorPayload),
    RoomError(RoomErrorPayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn user_status(user_id: &str, username: &str, is_online: bool) -> Self {
        ServerEvent::UserStatusChange(UserStatusPayload {
            user_id: user_id.to_string(),
            username: username.to_string(),
            is_online,
        })
    }

    pub fn message_error(message: impl Into<String>) -> Self {
        ServerEvent::MessageError(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn room_error(room_id: &str, message: impl Into<String>) -> Self {
        ServerEvent::RoomError(RoomErrorPayload {
            room_id: room_id.to_string(),
            message: message.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub content: String,
    pub room_id: String,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusPayload {
    pub user_id: String,
    pub username: String,
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingPayload {
    pub user_id: String,
    pub username: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStopTypingPayload {
    pub user_id: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomErrorPayload {
    pub room_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_events() {
        let join = ClientEvent::parse(r#"{"type":"joinRoom","payload":{"roomId":"r1"}}"#).unwrap();
        assert_eq!(
            join,
            ClientEvent::JoinRoom(RoomPayload {
                room_id: "r1".into()
            })
        );

        let send = ClientEvent::parse(
            r#"{"type":"sendMessage","payload":{"content":"hello","roomId":"r1"}}"#,
        )
        .unwrap();
        assert_eq!(send.event_type(), "sendMessage");
        assert_eq!(send.room_id(), "r1");

        let stop = ClientEvent::parse(r#"{"type":"stopTyping","payload":{"roomId":"r1"}}"#).unwrap();
        assert_eq!(stop.event_type(), "stopTyping");
    }

    #[test]
    fn test_parse_rejects_malformed_events() {
        let frames = [
            "not json",
            r#"{"type":"dance","payload":{"roomId":"r1"}}"#,
            r#"{"type":"sendMessage","payload":{"roomId":"r1"}}"#,
            r#"{"type":"joinRoom","payload":{}}"#,
            r#"{"type":"typing","payload":{"roomId":"  "}}"#,
        ];

        for frame in frames {
            assert!(ClientEvent::parse(frame).is_err(), "accepted {frame}");
        }
    }

    #[test]
    fn test_server_event_wire_format() {
        let status = ServerEvent::user_status("u1", "alice", true).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "userStatusChange",
                "payload": {"userId": "u1", "username": "alice", "isOnline": true}
            })
        );

        let joined = ServerEvent::JoinedRoom("r1".into()).to_json().unwrap();
        assert_eq!(joined, r#"{"type":"joinedRoom","payload":"r1"}"#);

        let stop = ServerEvent::UserStopTyping(UserStopTypingPayload {
            user_id: "u1".into(),
            room_id: "r1".into(),
        });
        let value = serde_json::to_value(&stop).unwrap();
        assert_eq!(value["type"], "userStopTyping");
        assert_eq!(value["payload"]["roomId"], "r1");

        let error = serde_json::to_value(ServerEvent::message_error("Failed to send message")).unwrap();
        assert_eq!(error["type"], "messageError");
        assert_eq!(error["payload"]["message"], "Failed to send message");
    }
}
