use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use muninn_core::protocol::{EventId, UserId};

/// What a reacted-to message resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationTarget {
    /// Never looked at; the event has to be fetched.
    Unknown,
    /// Resolved: reactions on it do nothing (not ours, no marker, lookup
    /// failed, or already confirmed).
    Nobody,
    /// Resolved: a 👍 from this user confirms their application.
    Applicant(UserId),
}

/// `event_id -> ApplicationTarget` cache. Entries are never evicted.
#[derive(Debug, Default)]
pub struct PendingApplications {
    inner: Mutex<HashMap<EventId, ApplicationTarget>>,
}

impl PendingApplications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, event_id: &EventId) -> ApplicationTarget {
        self.lock()
            .get(event_id)
            .cloned()
            .unwrap_or(ApplicationTarget::Unknown)
    }

    /// Store a resolution. `Unknown` is not stored.
    pub fn resolve(&self, event_id: EventId, target: ApplicationTarget) {
        if target == ApplicationTarget::Unknown {
            return;
        }
        self.lock().insert(event_id, target);
    }

    /// Resolve only if nothing is stored yet. Returns the stored value.
    pub fn resolve_if_unknown(&self, event_id: EventId, target: ApplicationTarget) -> ApplicationTarget {
        if target == ApplicationTarget::Unknown {
            return self.lookup(&event_id);
        }
        self.lock().entry(event_id).or_insert(target).clone()
    }

    /// If `event_id` is pending for `reactor`, mark it `Nobody` and return
    /// true. At most one caller wins per entry.
    pub fn claim(&self, event_id: &EventId, reactor: &UserId) -> bool {
        let mut map = self.lock();
        match map.get_mut(event_id) {
            Some(slot) if *slot == ApplicationTarget::Applicant(reactor.clone()) => {
                *slot = ApplicationTarget::Nobody;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EventId, ApplicationTarget>> {
        // The map stays consistent even if a holder panicked; keep serving.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
