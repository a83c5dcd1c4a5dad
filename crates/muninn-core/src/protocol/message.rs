//! Outgoing `m.room.message` content.
//!
//! Messages are built as HTML with a plain-text fallback body. Mentions are
//! explicit (`m.mentions`); an empty list serializes as `{}` so the message
//! pings nobody.

use serde_json::{json, Map, Value};

use crate::protocol::ids::{EventId, UserId};

pub const HTML_FORMAT: &str = "org.matrix.custom.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Notice,
}

impl MsgType {
    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::Text => "m.text",
            MsgType::Notice => "m.notice",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub msgtype: MsgType,
    pub body: String,
    pub formatted_body: Option<String>,
    pub mentions: Vec<UserId>,
    pub reply_to: Option<EventId>,
    /// Extra top-level content fields (markers, machine-readable payloads).
    pub extra: Map<String, Value>,
}

impl OutgoingMessage {
    pub fn html(msgtype: MsgType, body: impl Into<String>, formatted_body: impl Into<String>) -> Self {
        Self {
            msgtype,
            body: body.into(),
            formatted_body: Some(formatted_body.into()),
            mentions: Vec::new(),
            reply_to: None,
            extra: Map::new(),
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<UserId>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn reply_to(mut self, event_id: EventId) -> Self {
        self.reply_to = Some(event_id);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Serialize into event content.
    pub fn to_content(&self) -> Value {
        let mut content = self.extra.clone();
        content.insert("msgtype".into(), json!(self.msgtype.as_str()));
        content.insert("body".into(), json!(self.body));
        if let Some(html) = &self.formatted_body {
            content.insert("format".into(), json!(HTML_FORMAT));
            content.insert("formatted_body".into(), json!(html));
        }
        let mentions = if self.mentions.is_empty() {
            json!({})
        } else {
            json!({ "user_ids": self.mentions })
        };
        content.insert("m.mentions".into(), mentions);
        if let Some(reply_to) = &self.reply_to {
            content.insert(
                "m.relates_to".into(),
                json!({ "m.in_reply_to": { "event_id": reply_to } }),
            );
        }
        Value::Object(content)
    }
}
