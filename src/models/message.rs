use chrono::Local;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Destination meaning "everyone in the room"
pub const BROADCAST_TARGET: &str = "Todos";

/// Text of the notice posted when a participant joins
pub const ARRIVAL_TEXT: &str = "entra na sala...";

/// Text of the notice posted when a participant is pruned for inactivity
pub const DEPARTURE_TEXT: &str = "sai da sala...";

/// Kind of chat message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    Message,
    PrivateMessage,
    /// System generated join/leave notice
    Status,
}

/// A message in the room log. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Wall clock time of the write, `HH:MM:SS`
    pub time: String,
}

/// Request to post a message; the sender comes from the `user` header
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl Message {
    /// Notice appended when `name` joins the room
    pub fn arrival(name: impl Into<String>, time: impl Into<String>) -> Self {
        Self::status(name, ARRIVAL_TEXT, time)
    }

    /// Notice appended when `name` is pruned by the liveness sweep
    pub fn departure(name: impl Into<String>, time: impl Into<String>) -> Self {
        Self::status(name, DEPARTURE_TEXT, time)
    }

    fn status(name: impl Into<String>, text: &str, time: impl Into<String>) -> Self {
        Self {
            from: name.into(),
            to: BROADCAST_TARGET.to_string(),
            text: text.to_string(),
            kind: MessageKind::Status,
            time: time.into(),
        }
    }

    /// Whether `participant` should see this message when reading the log
    pub fn is_visible_to(&self, participant: &str) -> bool {
        self.from == participant || self.to == participant || self.to == BROADCAST_TARGET
    }
}

impl PostMessageRequest {
    /// Validate the request and build the message sent by `from`
    pub fn into_message(self, from: &str, time: impl Into<String>) -> Result<Message, String> {
        let to = self.to.trim();
        if to.is_empty() {
            return Err("Message destination must not be empty".to_string());
        }

        let text = self.text.trim();
        if text.is_empty() {
            return Err("Message text must not be empty".to_string());
        }

        if self.kind == MessageKind::Status {
            return Err("Status messages are reserved for the server".to_string());
        }

        Ok(Message {
            from: from.to_string(),
            to: to.to_string(),
            text: text.to_string(),
            kind: self.kind,
            time: time.into(),
        })
    }
}

/// Human readable time stamped on messages at write time
pub fn clock_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Most recent first, keeping at most `limit` entries
pub fn most_recent_first(mut messages: Vec<Message>, limit: Option<usize>) -> Vec<Message> {
    messages.reverse();
    if let Some(limit) = limit {
        messages.truncate(limit);
    }
    messages
}
