//! Keeps the name index in sync with the main room and answers the
//! directory commands.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::json;
use tokio::task::JoinHandle;

use muninn_core::error::Result;
use muninn_core::protocol::{EventId, Member, Membership, MsgType, OutgoingMessage, RoomEvent, RoomId, UserId};

use crate::client::ChatClient;
use crate::config::BotConfig;
use crate::directory::index::NameIndex;
use crate::directory::parse::{parse_name, TldSet};
use crate::render::{escape_html, format_template, html_to_plain, mention_html, room_link};

pub const MEMBER_DIRECTORY_KEY: &str = "com.muninn-hall.member_directory";

const ALL_SET_REACTION: &str = "\u{2705}\u{FE0F}";

/// The slice of config the monitor reads.
#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub main_room: RoomId,
    pub alerts_room: RoomId,
    pub room_via: Vec<String>,
    pub name_not_set: String,
}

impl DirectorySettings {
    pub fn from_config(cfg: &BotConfig) -> Self {
        Self {
            main_room: cfg.rooms.main_room.clone(),
            alerts_room: cfg.rooms.alerts_room.clone(),
            room_via: cfg.rooms.room_via.clone(),
            name_not_set: cfg.messages.name_not_set.clone(),
        }
    }
}

pub struct NameMonitor {
    client: Arc<dyn ChatClient>,
    settings: DirectorySettings,
    tlds: TldSet,
    /// Forward and inverse maps change together under this one lock.
    index: Mutex<NameIndex>,
    excluded: RwLock<Arc<HashSet<UserId>>>,
}

impl NameMonitor {
    pub fn new(client: Arc<dyn ChatClient>, settings: DirectorySettings, tlds: TldSet, excluded: Vec<UserId>) -> Self {
        Self {
            client,
            settings,
            tlds,
            index: Mutex::new(NameIndex::new()),
            excluded: RwLock::new(Arc::new(excluded.into_iter().collect())),
        }
    }

    pub fn main_room(&self) -> &RoomId {
        &self.settings.main_room
    }

    /// Swap the exclusion list. Readers see either the old or the new set.
    /// Already indexed members that are now excluded stay until their next
    /// membership change.
    pub fn set_excluded(&self, excluded: Vec<UserId>) {
        let next = Arc::new(excluded.into_iter().collect::<HashSet<_>>());
        let count = next.len();
        *self.excluded.write().unwrap_or_else(PoisonError::into_inner) = next;
        tracing::info!(excluded = count, "exclusion list updated");
    }

    fn excluded(&self) -> Arc<HashSet<UserId>> {
        Arc::clone(&self.excluded.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_excluded(&self, user_id: &UserId) -> bool {
        self.excluded().contains(user_id)
    }

    /// Run `f` against the index.
    pub fn with_index<R>(&self, f: impl FnOnce(&NameIndex) -> R) -> R {
        f(&self.lock_index())
    }

    fn lock_index(&self) -> MutexGuard<'_, NameIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index a joined-members snapshot, skipping excluded members.
    pub fn seed(&self, members: Vec<(UserId, Member)>) -> usize {
        let excluded = self.excluded();
        let mut index = self.lock_index();
        let mut seeded = 0;
        for (user_id, member) in members {
            if excluded.contains(&user_id) {
                continue;
            }
            let servers = parse_name(member.displayname.as_deref().unwrap_or(""), &self.tlds);
            index.update_member(&user_id, member.displayname, servers);
            seeded += 1;
        }
        seeded
    }

    pub async fn load_members(&self) -> Result<usize> {
        let members = self.client.joined_members(&self.settings.main_room).await?;
        let seeded = self.seed(members);
        tracing::info!(members = seeded, room = %self.settings.main_room, "name index seeded");
        Ok(seeded)
    }

    /// Seed in the background; startup does not wait for large rooms.
    pub fn spawn_load(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.load_members().await {
                tracing::error!(error = %e, kind = e.kind().as_str(), "failed to load main room members");
            }
        })
    }

    /// Apply an `m.room.member` event from the main room.
    pub fn apply_member_event(&self, event: &RoomEvent) -> Result<()> {
        let Some(subject) = event.member_subject() else {
            return Ok(());
        };
        let user_id = UserId::parse(subject)?;
        if self.is_excluded(&user_id) {
            return Ok(());
        }
        let member = event.member()?;

        let mut index = self.lock_index();
        if member.membership != Membership::Join {
            index.remove_member(&user_id);
            return Ok(());
        }
        let servers = parse_name(member.displayname.as_deref().unwrap_or(""), &self.tlds);
        index.update_member(&user_id, member.displayname, servers);
        Ok(())
    }

    /// `member-directory`: reply with the full directory.
    pub async fn member_directory(&self, room_id: &RoomId, reply_to: &EventId) -> Result<EventId> {
        let (html, server_map) = {
            let index = self.lock_index();
            let mut html = String::from("<details><summary>Member Directory</summary><ul>");
            for entry in index.directory() {
                let label = escape_html(entry.displayname.as_deref().unwrap_or(entry.user_id.as_str()));
                html.push_str("<li>");
                html.push_str(&mention_html(&entry.user_id, &label));
                html.push_str(": ");
                if entry.servers.is_empty() {
                    html.push_str("<em>none found</em>");
                } else {
                    let servers: Vec<String> = entry
                        .servers
                        .iter()
                        .map(|s| format!("<code>{}</code>", escape_html(s)))
                        .collect();
                    html.push_str(&servers.join(", "));
                }
                html.push_str("</li>");
            }
            html.push_str("</ul></details>");
            (html, index.server_map())
        };

        let content = OutgoingMessage::html(MsgType::Notice, "Member Directory - plaintext body not available", html)
            .reply_to(reply_to.clone())
            .with_extra(MEMBER_DIRECTORY_KEY, json!(server_map));
        self.client.send_message(room_id, &content).await
    }

    /// `ping-users-without-server-in-name`: mention everyone without a
    /// declared server, or react ✅️ when there is nobody. Returns the number
    /// of users pinged.
    pub async fn ping_users_without_server(&self, room_id: &RoomId, reply_to: &EventId) -> Result<usize> {
        let unset = self.with_index(|index| index.members_without_server());
        if unset.is_empty() {
            self.client.react(room_id, reply_to, ALL_SET_REACTION).await?;
            return Ok(0);
        }

        let mentions: Vec<String> = unset
            .iter()
            .map(|e| {
                let label = escape_html(e.displayname.as_deref().unwrap_or(e.user_id.as_str()));
                mention_html(&e.user_id, &label)
            })
            .collect();
        let mentions_html = mentions.join(", ");
        let alerts_link = room_link(&self.settings.alerts_room, &self.settings.room_via);
        let html = format_template(
            &self.settings.name_not_set,
            &[("mentions_html", mentions_html.as_str()), ("alerts_link", alerts_link.as_str())],
        );

        let user_ids: Vec<UserId> = unset.into_iter().map(|e| e.user_id).collect();
        let count = user_ids.len();
        let content = OutgoingMessage::html(MsgType::Notice, html_to_plain(&html), html)
            .with_mentions(user_ids)
            .reply_to(reply_to.clone());
        self.client.send_message(room_id, &content).await?;
        Ok(count)
    }
}
