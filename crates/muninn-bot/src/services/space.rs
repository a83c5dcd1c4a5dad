use std::sync::Arc;

use async_trait::async_trait;

use muninn_core::error::Result;
use muninn_core::protocol::api::SyncedEvent;
use muninn_core::protocol::RoomId;

use crate::dispatch::EventHandler;
use crate::space::SpaceMembers;

pub struct SpaceService {
    space_room: RoomId,
    members: Arc<SpaceMembers>,
}

impl SpaceService {
    pub fn new(space_room: RoomId, members: Arc<SpaceMembers>) -> Self {
        Self { space_room, members }
    }
}

#[async_trait]
impl EventHandler for SpaceService {
    fn name(&self) -> &'static str {
        "space"
    }

    async fn handle_event(&self, ev: &SyncedEvent) -> Result<()> {
        if ev.room_id == self.space_room && ev.event.is_member() {
            self.members.apply(&ev.event);
        }
        Ok(())
    }
}
