//! Shared error type across muninn crates.

use thiserror::Error;

/// Stable error codes, used in log fields and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration.
    Config,
    /// Malformed Matrix identifier.
    InvalidId,
    /// Homeserver request failed (transport or non-success status).
    Homeserver,
    /// Support well-known document could not be fetched or decoded.
    FetchFailure,
    /// A referenced event could not be retrieved.
    EventLookup,
    /// Payload did not match the expected shape.
    Decode,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::InvalidId => "INVALID_ID",
            ErrorKind::Homeserver => "HOMESERVER",
            ErrorKind::FetchFailure => "FETCH_FAILURE",
            ErrorKind::EventLookup => "EVENT_LOOKUP",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BotError>;

/// Unified error type used by core and bot.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("config: {0}")]
    Config(String),
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    #[error("homeserver request failed: {0}")]
    Homeserver(String),
    #[error("support well-known fetch failed: {0}")]
    FetchFailure(String),
    #[error("event lookup failed: {0}")]
    EventLookup(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl BotError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::Config(_) => ErrorKind::Config,
            BotError::InvalidId(_) => ErrorKind::InvalidId,
            BotError::Homeserver(_) => ErrorKind::Homeserver,
            BotError::FetchFailure(_) => ErrorKind::FetchFailure,
            BotError::EventLookup(_) => ErrorKind::EventLookup,
            BotError::Decode(_) => ErrorKind::Decode,
            BotError::Internal(_) => ErrorKind::Internal,
        }
    }
}
