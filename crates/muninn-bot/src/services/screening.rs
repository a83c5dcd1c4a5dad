use std::sync::Arc;

use async_trait::async_trait;

use muninn_core::error::Result;
use muninn_core::protocol::api::{EventSource, SyncedEvent};
use muninn_core::protocol::{Membership, UserId};

use crate::dispatch::{Command, CommandHandler, EventHandler};
use crate::screening::{ScreeningEngine, ScreeningJob, ScreeningQueue};

/// Routes screening-room membership into the screening queue and handles
/// reactions inline.
pub struct ScreeningService {
    engine: Arc<ScreeningEngine>,
    queue: ScreeningQueue,
}

impl ScreeningService {
    pub fn new(engine: Arc<ScreeningEngine>, queue: ScreeningQueue) -> Self {
        Self { engine, queue }
    }
}

#[async_trait]
impl EventHandler for ScreeningService {
    fn name(&self) -> &'static str {
        "screening"
    }

    async fn handle_event(&self, ev: &SyncedEvent) -> Result<()> {
        let event = &ev.event;
        if event.is_reaction() {
            self.engine.on_reaction(&ev.room_id, event).await?;
            return Ok(());
        }
        if !event.is_member() || ev.room_id != *self.engine.screening_room() {
            return Ok(());
        }
        let Some(subject) = event.member_subject() else {
            return Ok(());
        };
        let user = UserId::parse(subject)?;

        match event.member()?.membership {
            // State-block joins are backfill, not arrivals.
            Membership::Join if ev.source == EventSource::Timeline && event.is_join_transition() => {
                self.queue.submit(ScreeningJob::Join {
                    user,
                    event_id: event.event_id.clone(),
                })?;
            }
            ref m if m.is_departure() => {
                self.queue.submit(ScreeningJob::Leave { user })?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Queued behind pending joins and leaves.
pub struct RecheckCommand {
    queue: ScreeningQueue,
}

impl RecheckCommand {
    pub fn new(queue: ScreeningQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl CommandHandler for RecheckCommand {
    fn command(&self) -> &'static str {
        "recheck"
    }

    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        self.queue.submit(ScreeningJob::Recheck {
            room_id: cmd.room_id.clone(),
            user: cmd.sender.clone(),
            event_id: cmd.event_id.clone(),
        })
    }
}

/// `apply [message]`; the message text is accepted and ignored.
pub struct ApplyCommand {
    engine: Arc<ScreeningEngine>,
}

impl ApplyCommand {
    pub fn new(engine: Arc<ScreeningEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl CommandHandler for ApplyCommand {
    fn command(&self) -> &'static str {
        "apply"
    }

    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        self.engine
            .apply(&cmd.room_id, &cmd.sender, &cmd.event_id)
            .await
            .map(|_| ())
    }
}
