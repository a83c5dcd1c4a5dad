use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use muninn_core::error::Result;
use muninn_core::protocol::api::{EventSource, SyncedEvent};
use muninn_core::protocol::{EventId, RoomId, UserId};

/// Consumers of the room event stream.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle_event(&self, ev: &SyncedEvent) -> Result<()>;
}

/// `!name args...` message commands.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn command(&self) -> &'static str;
    async fn handle_command(&self, cmd: &Command) -> Result<()>;
}

/// A parsed command invocation.
#[derive(Debug, Clone)]
pub struct Command {
    pub room_id: RoomId,
    pub event_id: EventId,
    pub sender: UserId,
    pub name: String,
    /// Raw text after the command name, trimmed.
    pub args: String,
}

impl Command {
    /// Parse `body` as a command. `None` unless it starts with `prefix`
    /// followed directly by a name.
    pub fn parse(prefix: &str, body: &str, room_id: RoomId, event_id: EventId, sender: UserId) -> Option<Self> {
        let rest = body.trim_start().strip_prefix(prefix)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest.trim_end(), ""),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            room_id,
            event_id,
            sender,
            name: name.to_lowercase(),
            args: args.to_string(),
        })
    }
}

/// Fans each event out to every event handler and routes commands by name.
/// Handler errors stop at this boundary: they are logged, never surfaced to
/// the room.
pub struct Dispatcher {
    bot_user: UserId,
    command_prefix: String,
    events: DashMap<&'static str, Arc<dyn EventHandler>>,
    commands: DashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl Dispatcher {
    pub fn new(bot_user: UserId, command_prefix: impl Into<String>) -> Self {
        Self {
            bot_user,
            command_prefix: command_prefix.into(),
            events: DashMap::new(),
            commands: DashMap::new(),
        }
    }

    pub fn register_events(&self, handler: Arc<dyn EventHandler>) {
        self.events.insert(handler.name(), handler);
    }

    pub fn register_command(&self, handler: Arc<dyn CommandHandler>) {
        self.commands.insert(handler.command(), handler);
    }

    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.commands.iter().map(|e| *e.key()).collect()
    }

    pub fn registered_event_handlers(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| *e.key()).collect()
    }

    pub async fn dispatch_event(&self, ev: &SyncedEvent) {
        // Clone handlers out so no map guard is held across an await.
        let handlers: Vec<Arc<dyn EventHandler>> =
            self.events.iter().map(|e| Arc::clone(e.value())).collect();
        for handler in handlers {
            if let Err(e) = handler.handle_event(ev).await {
                tracing::error!(
                    handler = handler.name(),
                    event_id = %ev.event.event_id,
                    room = %ev.room_id,
                    kind = e.kind().as_str(),
                    error = %e,
                    "event handler failed"
                );
            }
        }

        if let Some(cmd) = self.parse_command(ev) {
            self.dispatch_command(&cmd).await;
        }
    }

    pub async fn dispatch_command(&self, cmd: &Command) {
        let Some(handler) = self.commands.get(cmd.name.as_str()).map(|h| Arc::clone(h.value())) else {
            tracing::debug!(command = %cmd.name, "unknown command");
            return;
        };
        tracing::info!(command = %cmd.name, sender = %cmd.sender, room = %cmd.room_id, "command");
        if let Err(e) = handler.handle_command(cmd).await {
            tracing::error!(
                command = %cmd.name,
                sender = %cmd.sender,
                kind = e.kind().as_str(),
                error = %e,
                "command failed"
            );
        }
    }

    fn parse_command(&self, ev: &SyncedEvent) -> Option<Command> {
        if ev.source != EventSource::Timeline || ev.event.sender == self.bot_user {
            return None;
        }
        let body = ev.event.message_body()?;
        Command::parse(
            &self.command_prefix,
            body,
            ev.room_id.clone(),
            ev.event.event_id.clone(),
            ev.event.sender.clone(),
        )
    }
}
