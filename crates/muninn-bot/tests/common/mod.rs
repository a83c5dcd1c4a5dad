//! In-memory doubles for the homeserver and the well-known fetcher.
#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use muninn_bot::client::ChatClient;
use muninn_bot::config::{self, BotConfig};
use muninn_bot::wellknown::{support_url, FetchFailure, SupportFetcher};
use muninn_core::error::{BotError, Result};
use muninn_core::protocol::api::{EventSource, SyncedEvent};
use muninn_core::protocol::{EventId, Member, OutgoingMessage, RoomEvent, RoomId, SupportDocument, UserId};

pub const BOT: &str = "@muninn:example.org";
pub const SCREENING: &str = "!screening:example.org";
pub const SPACE: &str = "!space:example.org";
pub const MAIN: &str = "!main:example.org";
pub const ALERTS: &str = "!alerts:example.org";

pub const CONFIG: &str = r#"
version: 1
homeserver:
  url: "https://matrix.example.org"
  access_token: "secret"
  user_id: "@muninn:example.org"
rooms:
  screening_room: "!screening:example.org"
  space_room: "!space:example.org"
  main_room: "!main:example.org"
  alerts_room: "!alerts:example.org"
  room_via: ["example.org"]
application_pings: ["@mod:example.org"]
excluded_members: ["@muninn:example.org"]
messages:
  prefix: "Welcome {user}!"
  recheck_prefix: "Rechecked {user}."
  suffix: "Please be patient."
  new_is_listed_support: "You are listed as support for <code>{server}</code>. React with 👍 to apply."
  new_not_listed_support: "You are not listed as support for <code>{server}</code>."
  new_well_known_missing: "<code>{server}</code> has no support well-known."
  name_not_set: "{mentions_html}: please add your server to your name. See {alerts_link}."
"#;

pub fn cfg() -> BotConfig {
    config::load_from_str(CONFIG).unwrap()
}

pub fn user(s: &str) -> UserId {
    UserId::parse(s).unwrap()
}

pub fn room(s: &str) -> RoomId {
    RoomId::parse(s).unwrap()
}

pub fn event_id(s: &str) -> EventId {
    EventId::parse(s).unwrap()
}

/// Records every write; serves canned members and events.
pub struct MockClient {
    user_id: UserId,
    seq: AtomicU64,
    pub sent: Mutex<Vec<(RoomId, OutgoingMessage)>>,
    pub reactions: Mutex<Vec<(RoomId, EventId, String)>>,
    pub redactions: Mutex<Vec<(RoomId, EventId, Option<String>)>>,
    pub members: Mutex<HashMap<RoomId, Vec<(UserId, Member)>>>,
    pub events: Mutex<HashMap<EventId, RoomEvent>>,
    pub event_lookups: AtomicUsize,
    fail_next_lookup: AtomicBool,
    lookup_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            user_id: user(BOT),
            seq: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            redactions: Mutex::new(Vec::new()),
            members: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
            event_lookups: AtomicUsize::new(0),
            fail_next_lookup: AtomicBool::new(false),
            lookup_gate: Mutex::new(None),
        })
    }

    /// The next `get_event` waits for the returned gate, then fails.
    pub fn fail_next_lookup(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.lookup_gate.lock().unwrap() = Some(Arc::clone(&gate));
        self.fail_next_lookup.store(true, Ordering::SeqCst);
        gate
    }

    pub fn set_members(&self, room_id: &str, members: &[(&str, Option<&str>)]) {
        let list = members
            .iter()
            .map(|(u, name)| (user(u), Member::joined(name.map(str::to_string), None)))
            .collect();
        self.members.lock().unwrap().insert(room(room_id), list);
    }

    pub fn insert_event(&self, event: RoomEvent) {
        self.events.lock().unwrap().insert(event.event_id.clone(), event);
    }

    pub fn sent(&self) -> Vec<(RoomId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn redactions(&self) -> Vec<(RoomId, EventId, Option<String>)> {
        self.redactions.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<(RoomId, EventId, String)> {
        self.reactions.lock().unwrap().clone()
    }

    fn next_id(&self) -> EventId {
        event_id(&format!("$sent{}", self.seq.fetch_add(1, Ordering::Relaxed)))
    }
}

#[async_trait]
impl ChatClient for MockClient {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    async fn joined_members(&self, room_id: &RoomId) -> Result<Vec<(UserId, Member)>> {
        self.members
            .lock()
            .unwrap()
            .get(room_id)
            .cloned()
            .ok_or_else(|| BotError::Homeserver(format!("M_FORBIDDEN: not in {room_id}")))
    }

    async fn send_message(&self, room_id: &RoomId, msg: &OutgoingMessage) -> Result<EventId> {
        let id = self.next_id();
        self.sent.lock().unwrap().push((room_id.clone(), msg.clone()));
        Ok(id)
    }

    async fn react(&self, room_id: &RoomId, target: &EventId, key: &str) -> Result<EventId> {
        let id = self.next_id();
        self.reactions
            .lock()
            .unwrap()
            .push((room_id.clone(), target.clone(), key.to_string()));
        Ok(id)
    }

    async fn redact(&self, room_id: &RoomId, event_id: &EventId, reason: Option<&str>) -> Result<()> {
        tokio::task::yield_now().await;
        self.redactions
            .lock()
            .unwrap()
            .push((room_id.clone(), event_id.clone(), reason.map(str::to_string)));
        Ok(())
    }

    async fn get_event(&self, _room_id: &RoomId, event_id: &EventId) -> Result<RoomEvent> {
        self.event_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_lookup.swap(false, Ordering::SeqCst) {
            let gate = self.lookup_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            return Err(BotError::EventLookup(format!("M_UNKNOWN: timed out fetching {event_id}")));
        }
        self.events
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .ok_or_else(|| BotError::EventLookup(format!("M_NOT_FOUND: {event_id}")))
    }
}

/// Serves support documents per server; unknown servers answer 404.
#[derive(Default)]
pub struct MockFetcher {
    docs: Mutex<HashMap<String, SupportDocument>>,
    pub fetches: AtomicUsize,
    pub in_flight: AtomicUsize,
    /// Most fetches observed running at once.
    pub max_in_flight: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish a document listing `admins` as admin contacts of `server`.
    pub fn publish(&self, server: &str, admins: &[&str]) {
        let contacts: Vec<Value> = admins
            .iter()
            .map(|id| json!({ "role": "m.role.admin", "matrix_id": id }))
            .collect();
        let doc: SupportDocument = serde_json::from_value(json!({ "contacts": contacts })).unwrap();
        self.docs.lock().unwrap().insert(server.to_string(), doc);
    }

    /// Every fetch takes `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Fetches block until the returned gate is notified, one per fetch.
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl SupportFetcher for MockFetcher {
    async fn fetch(&self, server_name: &str) -> std::result::Result<SupportDocument, FetchFailure> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let hold = self.hold.lock().unwrap().clone();
        if let Some(gate) = hold {
            gate.notified().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .docs
            .lock()
            .unwrap()
            .get(server_name)
            .cloned()
            .ok_or(FetchFailure::Status { url: support_url(server_name), status: 404 });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn member_event(id: &str, subject: &str, membership: &str, displayname: Option<&str>) -> RoomEvent {
    let mut content = json!({ "membership": membership });
    if let Some(name) = displayname {
        content["displayname"] = json!(name);
    }
    serde_json::from_value(json!({
        "type": "m.room.member",
        "event_id": id,
        "sender": subject,
        "state_key": subject,
        "content": content,
    }))
    .unwrap()
}

/// A member event whose previous membership was `prev`.
pub fn member_change(id: &str, subject: &str, membership: &str, displayname: Option<&str>, prev: &str) -> RoomEvent {
    let mut ev = member_event(id, subject, membership, displayname);
    ev.unsigned = Some(json!({ "prev_content": { "membership": prev } }));
    ev
}

pub fn reaction_event(id: &str, sender: &str, target: &str, key: &str) -> RoomEvent {
    serde_json::from_value(json!({
        "type": "m.reaction",
        "event_id": id,
        "sender": sender,
        "content": {
            "m.relates_to": { "rel_type": "m.annotation", "event_id": target, "key": key }
        },
    }))
    .unwrap()
}

pub fn message_event(id: &str, sender: &str, body: &str) -> RoomEvent {
    serde_json::from_value(json!({
        "type": "m.room.message",
        "event_id": id,
        "sender": sender,
        "content": { "msgtype": "m.text", "body": body },
    }))
    .unwrap()
}

pub fn timeline(room_id: &str, event: RoomEvent) -> SyncedEvent {
    SyncedEvent { room_id: room(room_id), source: EventSource::Timeline, event }
}

pub fn state(room_id: &str, event: RoomEvent) -> SyncedEvent {
    SyncedEvent { room_id: room(room_id), source: EventSource::State, event }
}
