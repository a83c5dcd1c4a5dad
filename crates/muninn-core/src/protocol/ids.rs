//! Matrix identifiers.
//!
//! Validation is limited to the sigil (and the server part for user ids).
//! Values deserialized from the wire are taken as-is; only config input and
//! explicit `parse` calls are checked.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $sigil:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Leading sigil of this identifier kind.
            pub const SIGIL: char = $sigil;

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// `@localpart:server.name`
    UserId,
    '@'
);
define_id!(
    /// `!opaque` or `!opaque:server.name`
    RoomId,
    '!'
);
define_id!(
    /// `$opaque`
    EventId,
    '$'
);

impl UserId {
    /// Parse a user id, requiring the `@` sigil and a non-empty server part.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let Some(rest) = s.strip_prefix(Self::SIGIL) else {
            return Err(BotError::InvalidId(format!("user id must start with '@': {s}")));
        };
        match rest.split_once(':') {
            Some((local, server)) if !local.is_empty() && !server.is_empty() => Ok(Self(s)),
            _ => Err(BotError::InvalidId(format!("user id must be @localpart:server: {s}"))),
        }
    }

    /// Everything between the sigil and the first `:`.
    pub fn localpart(&self) -> &str {
        let rest = self.0.strip_prefix(Self::SIGIL).unwrap_or(&self.0);
        rest.split_once(':').map_or(rest, |(local, _)| local)
    }

    /// Everything after the first `:`. Empty for ids without a server part.
    pub fn server_name(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, server)| server)
    }
}

impl RoomId {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.len() > 1 && s.starts_with(Self::SIGIL) {
            Ok(Self(s))
        } else {
            Err(BotError::InvalidId(format!("room id must start with '!': {s}")))
        }
    }
}

impl EventId {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.len() > 1 && s.starts_with(Self::SIGIL) {
            Ok(Self(s))
        } else {
            Err(BotError::InvalidId(format!("event id must start with '$': {s}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_name_splits_at_first_colon() {
        let u = UserId::parse("@alice:example.com:8448").unwrap();
        assert_eq!(u.localpart(), "alice");
        assert_eq!(u.server_name(), "example.com:8448");
    }

    #[test]
    fn rejects_malformed_user_ids() {
        for bad in ["alice:example.com", "@alice", "@:example.com", "@alice:"] {
            assert!(UserId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn room_and_event_sigils() {
        assert!(RoomId::parse("!abc:example.com").is_ok());
        assert!(RoomId::parse("#alias:example.com").is_err());
        assert!(EventId::parse("$abc").is_ok());
        assert!(EventId::parse("$").is_err());
    }
}
