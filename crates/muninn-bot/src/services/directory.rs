use std::sync::Arc;

use async_trait::async_trait;

use muninn_core::error::Result;
use muninn_core::protocol::api::SyncedEvent;

use crate::directory::NameMonitor;
use crate::dispatch::{Command, CommandHandler, EventHandler};

/// Feeds main-room membership into the name index.
pub struct NameIndexService {
    monitor: Arc<NameMonitor>,
}

impl NameIndexService {
    pub fn new(monitor: Arc<NameMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl EventHandler for NameIndexService {
    fn name(&self) -> &'static str {
        "name_index"
    }

    async fn handle_event(&self, ev: &SyncedEvent) -> Result<()> {
        if ev.room_id == *self.monitor.main_room() && ev.event.is_member() {
            self.monitor.apply_member_event(&ev.event)?;
        }
        Ok(())
    }
}

pub struct MemberDirectoryCommand {
    monitor: Arc<NameMonitor>,
}

impl MemberDirectoryCommand {
    pub fn new(monitor: Arc<NameMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl CommandHandler for MemberDirectoryCommand {
    fn command(&self) -> &'static str {
        "member-directory"
    }

    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        self.monitor
            .member_directory(&cmd.room_id, &cmd.event_id)
            .await
            .map(|_| ())
    }
}

pub struct PingUnsetCommand {
    monitor: Arc<NameMonitor>,
}

impl PingUnsetCommand {
    pub fn new(monitor: Arc<NameMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl CommandHandler for PingUnsetCommand {
    fn command(&self) -> &'static str {
        "ping-users-without-server-in-name"
    }

    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        let pinged = self
            .monitor
            .ping_users_without_server(&cmd.room_id, &cmd.event_id)
            .await?;
        tracing::info!(pinged, "users without server in name");
        Ok(())
    }
}
