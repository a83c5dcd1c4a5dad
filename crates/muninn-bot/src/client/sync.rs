//! Sync loop: long-polls `/sync` and feeds the dispatcher.
//!
//! The first response is the initial sync. Its timeline is room history, so
//! it is only used for the `next_batch` token; nothing is dispatched until
//! the second round. Events are dispatched one at a time in batch order;
//! screening work is queued by its handler, so this loop does not wait on
//! support fetches.

use std::sync::Arc;
use std::time::Duration;

use crate::client::HttpChatClient;
use crate::dispatch::Dispatcher;
use crate::ops::Health;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub struct SyncLoop {
    client: Arc<HttpChatClient>,
    dispatcher: Arc<Dispatcher>,
    health: Arc<Health>,
    timeout_ms: u64,
}

impl SyncLoop {
    pub fn new(
        client: Arc<HttpChatClient>,
        dispatcher: Arc<Dispatcher>,
        health: Arc<Health>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            dispatcher,
            health,
            timeout_ms,
        }
    }

    /// Runs until the task is dropped.
    pub async fn run(self) {
        let mut since: Option<String> = None;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let resp = match self.client.sync(since.as_deref(), self.timeout_ms).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), backoff_ms = backoff.as_millis() as u64, "sync failed");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };
            backoff = INITIAL_BACKOFF;

            let next_batch = resp.next_batch.clone();
            if since.is_none() {
                tracing::info!(next_batch = %next_batch, "initial sync complete, history skipped");
                self.health.mark_synced();
            } else {
                let (events, skipped) = resp.into_events();
                if skipped > 0 {
                    tracing::warn!(skipped, "sync batch contained undecodable events");
                }
                for ev in &events {
                    self.dispatcher.dispatch_event(ev).await;
                }
            }
            since = Some(next_batch);
        }
    }
}
