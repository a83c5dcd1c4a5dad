//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and handler traits so downstream consumers can
//! depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{Command, CommandHandler, Dispatcher, EventHandler};
