//! Matrix client-server API (v3) over reqwest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use muninn_core::error::{BotError, Result};
use muninn_core::protocol::api::{EventIdResponse, JoinedMembersResponse, SyncResponse};
use muninn_core::protocol::events::{Relation, EVENT_REACTION};
use muninn_core::protocol::{EventId, Member, OutgoingMessage, RoomEvent, RoomId, UserId, EVENT_MESSAGE};

use crate::client::ChatClient;
use crate::config::HomeserverSection;

/// Extra allowance on top of the server-side long-poll timeout.
const SYNC_GRACE: Duration = Duration::from_secs(30);

pub struct HttpChatClient {
    http: reqwest::Client,
    base: Url,
    access_token: String,
    user_id: UserId,
    txn_prefix: u64,
    txn_seq: AtomicU64,
}

impl HttpChatClient {
    pub fn new(cfg: &HomeserverSection, http: reqwest::Client) -> Result<Self> {
        let base = Url::parse(&cfg.url)
            .map_err(|e| BotError::Config(format!("homeserver.url invalid: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BotError::Config("homeserver.url cannot be a base URL".into()));
        }
        let txn_prefix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(Self {
            http,
            base,
            access_token: cfg.access_token.clone(),
            user_id: cfg.user_id.clone(),
            txn_prefix,
            txn_seq: AtomicU64::new(1),
        })
    }

    /// `{base}/_matrix/client/v3/{segments...}` with each segment encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BotError::Internal("homeserver url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn next_txn_id(&self) -> String {
        let seq = self.txn_seq.fetch_add(1, Ordering::Relaxed);
        format!("muninn.{}.{}", self.txn_prefix, seq)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.access_token)
    }

    async fn execute<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
        let resp = req
            .send()
            .await
            .map_err(|e| BotError::Homeserver(format!("{what}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Homeserver(format!("{what}: status {status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| BotError::Decode(format!("{what}: {e}")))
    }

    async fn send_event(&self, room_id: &RoomId, event_type: &str, content: Value) -> Result<EventId> {
        let txn = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id.as_str(), "send", event_type, &txn])?;
        let resp: EventIdResponse = self
            .execute("send", self.request(Method::PUT, url).json(&content))
            .await?;
        Ok(resp.event_id)
    }

    /// One long-poll round. `since = None` requests an initial sync.
    pub async fn sync(&self, since: Option<&str>, timeout_ms: u64) -> Result<SyncResponse> {
        let mut url = self.endpoint(&["sync"])?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("timeout", &timeout_ms.to_string());
            if let Some(since) = since {
                q.append_pair("since", since);
            }
        }
        let req = self
            .request(Method::GET, url)
            .timeout(Duration::from_millis(timeout_ms) + SYNC_GRACE);
        self.execute("sync", req).await
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    async fn joined_members(&self, room_id: &RoomId) -> Result<Vec<(UserId, Member)>> {
        let url = self.endpoint(&["rooms", room_id.as_str(), "joined_members"])?;
        let resp: JoinedMembersResponse = self
            .execute("joined_members", self.request(Method::GET, url))
            .await?;
        Ok(resp.into_members())
    }

    async fn send_message(&self, room_id: &RoomId, msg: &OutgoingMessage) -> Result<EventId> {
        self.send_event(room_id, EVENT_MESSAGE, msg.to_content()).await
    }

    async fn react(&self, room_id: &RoomId, target: &EventId, key: &str) -> Result<EventId> {
        let relation = Relation::annotation(target.clone(), key);
        self.send_event(room_id, EVENT_REACTION, json!({ "m.relates_to": relation }))
            .await
    }

    async fn redact(&self, room_id: &RoomId, event_id: &EventId, reason: Option<&str>) -> Result<()> {
        let txn = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id.as_str(), "redact", event_id.as_str(), &txn])?;
        let body = match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        let _: EventIdResponse = self
            .execute("redact", self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(())
    }

    async fn get_event(&self, room_id: &RoomId, event_id: &EventId) -> Result<RoomEvent> {
        let url = self.endpoint(&["rooms", room_id.as_str(), "event", event_id.as_str()])?;
        self.execute::<RoomEvent>("get_event", self.request(Method::GET, url))
            .await
            .map_err(|e| BotError::EventLookup(format!("{event_id}: {e}")))
    }
}
