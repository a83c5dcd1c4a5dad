use std::path::PathBuf;

use serde::Deserialize;

use muninn_core::error::{BotError, Result};
use muninn_core::protocol::{RoomId, UserId};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub version: u32,

    pub homeserver: HomeserverSection,

    #[serde(default)]
    pub bot: BotSection,

    pub rooms: RoomsSection,

    /// Users pinged on every application.
    #[serde(default)]
    pub application_pings: Vec<UserId>,

    /// Members never tracked by the name index.
    #[serde(default)]
    pub excluded_members: Vec<UserId>,

    pub messages: Messages,
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BotError::Config(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }

        self.homeserver.validate()?;
        self.bot.validate()?;
        self.rooms.validate()?;

        for (field, ids) in [
            ("application_pings", &self.application_pings),
            ("excluded_members", &self.excluded_members),
        ] {
            for id in ids {
                UserId::parse(id.as_str())
                    .map_err(|e| BotError::Config(format!("{field}: {e}")))?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomeserverSection {
    /// Client-server API base URL, e.g. `https://matrix.example.org`.
    pub url: String,
    pub access_token: String,
    /// The bot's own user id.
    pub user_id: UserId,
}

impl HomeserverSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(BotError::Config("homeserver.url must be an http(s) URL".into()));
        }
        if self.access_token.is_empty() {
            return Err(BotError::Config("homeserver.access_token must not be empty".into()));
        }
        UserId::parse(self.user_id.as_str())
            .map_err(|e| BotError::Config(format!("homeserver.user_id: {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotSection {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Listen address of the ops endpoints (`/healthz`, `/readyz`, `/metrics`).
    #[serde(default = "default_ops_listen")]
    pub ops_listen: String,

    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    #[serde(default = "default_support_fetch_timeout_secs")]
    pub support_fetch_timeout_secs: u64,

    /// TLD allow-list override; the bundled list is used when unset.
    #[serde(default)]
    pub tld_file: Option<PathBuf>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            ops_listen: default_ops_listen(),
            sync_timeout_ms: default_sync_timeout_ms(),
            support_fetch_timeout_secs: default_support_fetch_timeout_secs(),
            tld_file: None,
        }
    }
}

impl BotSection {
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.trim().is_empty() {
            return Err(BotError::Config("bot.command_prefix must not be empty".into()));
        }
        if !(1000..=120000).contains(&self.sync_timeout_ms) {
            return Err(BotError::Config(
                "bot.sync_timeout_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(1..=300).contains(&self.support_fetch_timeout_secs) {
            return Err(BotError::Config(
                "bot.support_fetch_timeout_secs must be between 1 and 300".into(),
            ));
        }
        Ok(())
    }
}

fn default_command_prefix() -> String {
    "!".into()
}
fn default_ops_listen() -> String {
    "127.0.0.1:8090".into()
}
fn default_sync_timeout_ms() -> u64 {
    30000
}
fn default_support_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsSection {
    /// Where new participants land and get screened.
    pub screening_room: RoomId,
    /// Reference roster: members here are already vetted.
    pub space_room: RoomId,
    /// Room whose members' display names feed the name index.
    pub main_room: RoomId,
    /// Linked from the "name not set" message.
    pub alerts_room: RoomId,
    /// Routing hints for room links.
    #[serde(default)]
    pub room_via: Vec<String>,
}

impl RoomsSection {
    pub fn validate(&self) -> Result<()> {
        for (field, id) in [
            ("screening_room", &self.screening_room),
            ("space_room", &self.space_room),
            ("main_room", &self.main_room),
            ("alerts_room", &self.alerts_room),
        ] {
            RoomId::parse(id.as_str()).map_err(|e| BotError::Config(format!("rooms.{field}: {e}")))?;
        }
        Ok(())
    }
}

/// Message templates. Placeholders: `{user}`, `{server}`,
/// `{mentions_html}`, `{alerts_link}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Messages {
    pub prefix: String,
    pub recheck_prefix: String,
    pub suffix: String,
    pub new_is_listed_support: String,
    pub new_not_listed_support: String,
    pub new_well_known_missing: String,
    pub name_not_set: String,
}
