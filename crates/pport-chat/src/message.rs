// SPDX-License-Identifier: MIT
//
// Wire model shared with the relay server.
//
// Field names are the JSON names on the wire. `time` is milliseconds
// since the Unix epoch, stamped by the sender.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use pport_term::text::strip_control_and_style;

/// A message as stored and relayed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub username: String,
    pub uuid: String,
    pub text: String,
    pub time: i64,
}

impl Message {
    /// Copy with escape sequences and control characters removed from
    /// the fields that reach the screen.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            username: strip_control_and_style(&self.username),
            uuid: self.uuid.clone(),
            text: strip_control_and_style(&self.text),
            time: self.time,
        }
    }
}

/// A message on its way to the server. The server assigns the uuid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub time: i64,
    pub username: String,
    pub text: String,
}

impl Draft {
    #[must_use]
    pub fn new(username: impl Into<String>, text: impl Into<String>, time: i64) -> Self {
        Self {
            time,
            username: username.into(),
            text: text.into(),
        }
    }

    /// Stamped with the current wall-clock time.
    #[must_use]
    pub fn now(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(username, text, Utc::now().timestamp_millis())
    }
}

/// Body of `POST /messages`: the latest messages, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatch {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_uses_wire_field_names() {
        let json = r#"{"username":"ann","uuid":"u-1","text":"hi","time":1700000000000}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            Message {
                username: "ann".into(),
                uuid: "u-1".into(),
                text: "hi".into(),
                time: 1_700_000_000_000,
            }
        );
    }

    #[test]
    fn draft_serializes_without_uuid() {
        let draft = Draft::new("bob", "hello", 42);
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value, serde_json::json!({"time": 42, "username": "bob", "text": "hello"}));
    }

    #[test]
    fn draft_now_is_recent() {
        let before = Utc::now().timestamp_millis();
        let draft = Draft::now("a", "b");
        assert!(draft.time >= before);
    }

    #[test]
    fn batch_tolerates_missing_messages_field() {
        let batch: MessageBatch = serde_json::from_str("{}").unwrap();
        assert!(batch.messages.is_empty());
    }

    #[test]
    fn sanitized_strips_styles_and_controls() {
        let msg = Message {
            username: "\x1b[31mevil\x1b[0m".into(),
            uuid: "\x1b[2J".into(),
            text: "line\nbreak\x07".into(),
            time: 1,
        };
        let clean = msg.sanitized();
        assert_eq!(clean.username, "evil");
        assert_eq!(clean.text, "linebreak");
        // The id is never drawn, so it stays as the server sent it.
        assert_eq!(clean.uuid, "\x1b[2J");
    }
}
