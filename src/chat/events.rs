use serde::{Deserialize, Serialize};

use crate::models::messages::{Message, SendMessageRequest};

/// Frames a connected client may send, as `{"event": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    UserOnline,
    SendMessage(OutgoingMessage),
    TypingStart { receiver_id: i32 },
    TypingStop { receiver_id: i32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutgoingMessage {
    pub receiver_id: i32,
    pub content: Option<String>,
    pub attachment_url: Option<String>,
    /// Client generated id used to drop resends of the same message.
    pub client_id: Option<String>,
}

impl OutgoingMessage {
    pub fn to_request(&self) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id: self.receiver_id,
            content: self.content.clone(),
            attachment_url: self.attachment_url.clone(),
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageReceived {
        message: Message,
    },
    MessageSent {
        message: Message,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    TypingStart {
        sender_id: i32,
    },
    TypingStop {
        sender_id: i32,
    },
    UserStatusChange {
        user_id: i32,
        is_online: bool,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize socket event: {}", e);
            r#"{"event":"error","data":{"message":"internal error"}}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_use_event_and_data_fields() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "typing_start", "data": {"receiver_id": 7}}))
                .unwrap();
        assert_eq!(event, ClientEvent::TypingStart { receiver_id: 7 });

        let event: ClientEvent = serde_json::from_value(json!({"event": "user_online"})).unwrap();
        assert_eq!(event, ClientEvent::UserOnline);
    }

    #[test]
    fn send_message_payload_is_parsed() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": {"receiver_id": 3, "content": "hello", "client_id": " abc "}
        }))
        .unwrap();

        match event {
            ClientEvent::SendMessage(payload) => {
                assert_eq!(payload.receiver_id, 3);
                assert_eq!(payload.client_id(), Some("abc"));
                assert_eq!(payload.to_request().content.as_deref(), Some("hello"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn unknown_events_are_rejected() {
        let parsed = serde_json::from_value::<ClientEvent>(json!({"event": "dance", "data": {}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn server_events_serialize_with_snake_case_names() {
        let value: serde_json::Value = serde_json::from_str(
            &ServerEvent::UserStatusChange {
                user_id: 4,
                is_online: true,
            }
            .to_json(),
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "user_status_change", "data": {"user_id": 4, "is_online": true}})
        );
    }
}
