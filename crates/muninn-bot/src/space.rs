//! Space roster cache: users already admitted to the space are not screened.

use dashmap::DashMap;

use muninn_core::protocol::{Member, Membership, RoomEvent, UserId};

#[derive(Default)]
pub struct SpaceMembers {
    members: DashMap<UserId, Member>,
}

impl SpaceMembers {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
        }
    }

    /// Replace the cache with a joined-members snapshot.
    pub fn load(&self, snapshot: Vec<(UserId, Member)>) {
        self.members.clear();
        for (user_id, member) in snapshot {
            self.members.insert(user_id, member);
        }
        tracing::info!(members = self.members.len(), "space members loaded");
    }

    /// Apply a member event from the space room. Join upserts, leave/ban
    /// removes, other memberships are ignored.
    pub fn apply(&self, event: &RoomEvent) {
        let Some(subject) = event.member_subject() else { return; };
        let Ok(member) = event.member() else { return; };
        let Ok(user_id) = UserId::parse(subject) else { return; };

        match member.membership {
            Membership::Join => {
                self.members.insert(user_id, member);
            }
            ref m if m.is_departure() => {
                self.members.remove(&user_id);
            }
            _ => {}
        }
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
