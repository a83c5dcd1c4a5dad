//! Chat-protocol client seam.
//!
//! The bot only needs a handful of client-server operations; they are
//! collected in `ChatClient` so the screening engine and the name monitor
//! can run against the real homeserver (`HttpChatClient`) or an in-memory
//! double in tests.

pub mod http;
pub mod sync;

use async_trait::async_trait;

use muninn_core::error::Result;
use muninn_core::protocol::{EventId, Member, OutgoingMessage, RoomEvent, RoomId, UserId};

pub use http::HttpChatClient;
pub use sync::SyncLoop;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// The bot's own user id.
    fn user_id(&self) -> &UserId;

    /// Snapshot of the room's joined members.
    async fn joined_members(&self, room_id: &RoomId) -> Result<Vec<(UserId, Member)>>;

    async fn send_message(&self, room_id: &RoomId, msg: &OutgoingMessage) -> Result<EventId>;

    /// Annotate `target` with `key`.
    async fn react(&self, room_id: &RoomId, target: &EventId, key: &str) -> Result<EventId>;

    async fn redact(&self, room_id: &RoomId, event_id: &EventId, reason: Option<&str>) -> Result<()>;

    async fn get_event(&self, room_id: &RoomId, event_id: &EventId) -> Result<RoomEvent>;
}
