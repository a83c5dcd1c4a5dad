//! muninn bot library entry.
//!
//! Wires the homeserver client, the dispatcher, the join screening engine,
//! the space roster cache and the name index into one bot. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod client;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod render;
pub mod router;
pub mod screening;
pub mod services;
pub mod space;
pub mod wellknown;
