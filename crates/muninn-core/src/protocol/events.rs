//! Room events and typed content views.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BotError, Result};
use crate::protocol::ids::{EventId, RoomId, UserId};

pub const EVENT_MEMBER: &str = "m.room.member";
pub const EVENT_MESSAGE: &str = "m.room.message";
pub const EVENT_REACTION: &str = "m.reaction";

/// Relation type of reactions.
pub const REL_ANNOTATION: &str = "m.annotation";

/// A room event as returned by `/sync` or `/rooms/{room}/event/{event}`.
///
/// Sync timeline events carry no `room_id`; the sync decoder fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    pub event_id: EventId,
    pub sender: UserId,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default)]
    pub origin_server_ts: u64,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<Value>,
}

impl RoomEvent {
    pub fn is_member(&self) -> bool {
        self.event_type == EVENT_MEMBER
    }

    pub fn is_reaction(&self) -> bool {
        self.event_type == EVENT_REACTION
    }

    pub fn is_message(&self) -> bool {
        self.event_type == EVENT_MESSAGE
    }

    /// Decode the content of an `m.room.member` event.
    pub fn member(&self) -> Result<Member> {
        if !self.is_member() {
            return Err(BotError::Decode(format!("{} is not a member event", self.event_id)));
        }
        decode_content(&self.content, &self.event_id)
    }

    /// Membership before this event, from `unsigned.prev_content`.
    pub fn prev_membership(&self) -> Option<Membership> {
        self.unsigned
            .as_ref()?
            .get("prev_content")?
            .get("membership")?
            .as_str()
            .map(|s| Membership::from(s.to_string()))
    }

    /// Membership became join. Profile updates of an already joined member
    /// (join -> join) are not transitions.
    pub fn is_join_transition(&self) -> bool {
        matches!(self.member(), Ok(m) if m.membership == Membership::Join)
            && self.prev_membership() != Some(Membership::Join)
    }

    /// The user a member event is about (its state key).
    pub fn member_subject(&self) -> Option<&str> {
        self.state_key.as_deref().filter(|s| !s.is_empty())
    }

    /// Decode the relation of an `m.reaction` event.
    pub fn reaction(&self) -> Result<Relation> {
        if !self.is_reaction() {
            return Err(BotError::Decode(format!("{} is not a reaction", self.event_id)));
        }
        let content: ReactionContent = decode_content(&self.content, &self.event_id)?;
        Ok(content.relates_to)
    }

    /// Body of an `m.room.message` event, if any.
    pub fn message_body(&self) -> Option<&str> {
        if !self.is_message() {
            return None;
        }
        self.content.get("body").and_then(Value::as_str)
    }

    /// String field in the content, used for custom markers.
    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

fn decode_content<T: serde::de::DeserializeOwned>(content: &Value, event_id: &EventId) -> Result<T> {
    T::deserialize(content)
        .map_err(|e| BotError::Decode(format!("invalid content in {event_id}: {e}")))
}

/// Membership state of a member event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Membership {
    Join,
    Leave,
    Ban,
    Invite,
    Knock,
    Other(String),
}

impl From<String> for Membership {
    fn from(s: String) -> Self {
        match s.as_str() {
            "join" => Membership::Join,
            "leave" => Membership::Leave,
            "ban" => Membership::Ban,
            "invite" => Membership::Invite,
            "knock" => Membership::Knock,
            _ => Membership::Other(s),
        }
    }
}

impl From<Membership> for String {
    fn from(m: Membership) -> Self {
        m.as_str().to_string()
    }
}

impl Membership {
    pub fn as_str(&self) -> &str {
        match self {
            Membership::Join => "join",
            Membership::Leave => "leave",
            Membership::Ban => "ban",
            Membership::Invite => "invite",
            Membership::Knock => "knock",
            Membership::Other(s) => s,
        }
    }

    /// Leave or ban: the user is no longer in the room.
    pub fn is_departure(&self) -> bool {
        matches!(self, Membership::Leave | Membership::Ban)
    }
}

/// `m.room.member` content, also used as the mirrored member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub membership: Membership,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Member {
    pub fn joined(displayname: Option<String>, avatar_url: Option<String>) -> Self {
        Self {
            membership: Membership::Join,
            displayname,
            avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReactionContent {
    #[serde(rename = "m.relates_to")]
    relates_to: Relation,
}

/// `m.relates_to` of a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub rel_type: Option<String>,
    pub event_id: EventId,
    #[serde(default)]
    pub key: Option<String>,
}

impl Relation {
    pub fn annotation(event_id: EventId, key: impl Into<String>) -> Self {
        Self {
            rel_type: Some(REL_ANNOTATION.to_string()),
            event_id,
            key: Some(key.into()),
        }
    }

    pub fn is_annotation(&self) -> bool {
        self.rel_type.as_deref() == Some(REL_ANNOTATION)
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or("")
    }
}
