//! Protocol modules (Matrix client-server shapes + support well-known).
//!
//! - `ids`: sigil-checked identifier newtypes.
//! - `events`: room events as delivered by sync / event lookup, with typed
//!   views over the content of the event types the bot cares about.
//! - `message`: outgoing message content builder.
//! - `api`: response bodies of the client-server endpoints the bot calls.
//! - `support`: the `/.well-known/matrix/support` document.
//!
//! All parsers are panic-free: malformed input is reported as `BotError`.

pub mod api;
pub mod events;
pub mod ids;
pub mod message;
pub mod support;

pub use events::{Member, Membership, Relation, RoomEvent, EVENT_MEMBER, EVENT_MESSAGE, EVENT_REACTION};
pub use ids::{EventId, RoomId, UserId};
pub use message::{MsgType, OutgoingMessage};
pub use support::{SupportContact, SupportDocument, SupportRole};
