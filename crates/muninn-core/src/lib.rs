//! muninn core: Matrix protocol primitives, support documents, and the shared
//! error type.
//!
//! This crate defines the wire-level shapes consumed by the bot (identifiers,
//! room events, sync batches, `.well-known/matrix/support` documents). It
//! carries no transport or runtime dependencies so the shapes can be tested
//! and reused without a homeserver.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! All fallible paths surface as `BotError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{BotError, ErrorKind, Result};
