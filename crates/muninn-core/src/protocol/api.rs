//! Response bodies of the client-server API endpoints the bot calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::protocol::events::{Member, RoomEvent};
use crate::protocol::ids::{EventId, RoomId, UserId};

/// `PUT .../send/...` and `PUT .../redact/...`
#[derive(Debug, Deserialize)]
pub struct EventIdResponse {
    pub event_id: EventId,
}

/// `GET /rooms/{room}/joined_members`
///
/// Entries keep the order the homeserver listed them in; the name index
/// uses it as its first-sighting order.
#[derive(Debug, Deserialize)]
pub struct JoinedMembersResponse {
    #[serde(default, deserialize_with = "in_document_order")]
    pub joined: Vec<(UserId, JoinedMember)>,
}

fn in_document_order<'de, D>(de: D) -> std::result::Result<Vec<(UserId, JoinedMember)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(UserId, JoinedMember)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of user ids to members")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    de.deserialize_map(Entries)
}

#[derive(Debug, Deserialize)]
pub struct JoinedMember {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl JoinedMembersResponse {
    pub fn into_members(self) -> Vec<(UserId, Member)> {
        self.joined
            .into_iter()
            .map(|(user_id, m)| (user_id, Member::joined(m.display_name, m.avatar_url)))
            .collect()
    }
}

/// Which part of a sync batch an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// `state` block: state at the start of the timeline gap.
    State,
    /// `timeline` block: live events in order.
    Timeline,
}

/// One event out of a sync batch, tagged with room and source.
#[derive(Debug, Clone)]
pub struct SyncedEvent {
    pub room_id: RoomId,
    pub source: EventSource,
    pub event: RoomEvent,
}

/// `GET /sync` (only the parts the bot reads).
#[derive(Debug, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: BTreeMap<RoomId, JoinedRoom>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: EventList,
}

/// Events are kept raw so one malformed event does not fail the batch.
#[derive(Debug, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<Value>,
}

impl SyncResponse {
    /// Flatten into typed events: per room, state first, then timeline.
    /// Returns the events plus the number of entries that failed to decode.
    pub fn into_events(self) -> (Vec<SyncedEvent>, usize) {
        let mut out = Vec::new();
        let mut skipped = 0;
        for (room_id, room) in self.rooms.join {
            let blocks = [
                (EventSource::State, room.state.events),
                (EventSource::Timeline, room.timeline.events),
            ];
            for (source, events) in blocks {
                for raw in events {
                    match serde_json::from_value::<RoomEvent>(raw) {
                        Ok(mut event) => {
                            event.room_id = Some(room_id.clone());
                            out.push(SyncedEvent {
                                room_id: room_id.clone(),
                                source,
                                event,
                            });
                        }
                        Err(_) => skipped += 1,
                    }
                }
            }
        }
        (out, skipped)
    }
}
