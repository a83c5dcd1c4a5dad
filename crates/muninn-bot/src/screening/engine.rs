use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Instant;

use muninn_core::error::Result;
use muninn_core::protocol::{EventId, MsgType, OutgoingMessage, RoomEvent, RoomId, UserId};

use crate::client::ChatClient;
use crate::config::{BotConfig, Messages};
use crate::obs::BotMetrics;
use crate::render::{escape_html, format_template, html_to_plain, user_mention};
use crate::screening::applications::{ApplicationTarget, PendingApplications};
use crate::screening::limiter::JoinLimiter;
use crate::space::SpaceMembers;
use crate::wellknown::SupportFetcher;

/// Content key naming the applicant on listed-support welcome messages.
pub const VERIFIED_APPLICATION_SENDER_KEY: &str = "com.muninn-hall.verified_application_sender";

const THUMBS_UP: char = '\u{1F44D}';
const LEFT_REASON: &str = "User left";

/// Classification of a screened user's home server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    NewIsListedSupport,
    NewNotListedSupport,
    NewWellKnownMissing,
}

impl JoinType {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinType::NewIsListedSupport => "new_is_listed_support",
            JoinType::NewNotListedSupport => "new_not_listed_support",
            JoinType::NewWellKnownMissing => "new_well_known_missing",
        }
    }

    fn template(self, messages: &Messages) -> &str {
        match self {
            JoinType::NewIsListedSupport => &messages.new_is_listed_support,
            JoinType::NewNotListedSupport => &messages.new_not_listed_support,
            JoinType::NewWellKnownMissing => &messages.new_well_known_missing,
        }
    }
}

/// What the join path did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Space member, the bot itself, or already welcomed.
    Skipped,
    /// Window ceiling reached; nothing sent, nothing recorded.
    RateLimited,
    Screened(JoinType),
}

/// The slice of config the engine reads.
#[derive(Debug, Clone)]
pub struct ScreeningSettings {
    pub screening_room: RoomId,
    pub application_pings: Vec<UserId>,
    pub messages: Messages,
}

impl ScreeningSettings {
    pub fn from_config(cfg: &BotConfig) -> Self {
        Self {
            screening_room: cfg.rooms.screening_room.clone(),
            application_pings: cfg.application_pings.clone(),
            messages: cfg.messages.clone(),
        }
    }
}

/// Guarded by the screening lock.
#[derive(Debug, Default)]
struct ScreeningState {
    limiter: JoinLimiter,
    /// `None` once the welcome has been redacted.
    welcomed: HashMap<UserId, Option<EventId>>,
}

pub struct ScreeningEngine {
    client: Arc<dyn ChatClient>,
    fetcher: Arc<dyn SupportFetcher>,
    space: Arc<SpaceMembers>,
    metrics: Arc<BotMetrics>,
    settings: ScreeningSettings,
    /// Serializes the limiter, every `check_member` run and the leave-side
    /// read-and-clear. Held across the fetch and the send.
    state: Mutex<ScreeningState>,
    pending: PendingApplications,
}

impl ScreeningEngine {
    pub fn new(
        client: Arc<dyn ChatClient>,
        fetcher: Arc<dyn SupportFetcher>,
        space: Arc<SpaceMembers>,
        metrics: Arc<BotMetrics>,
        settings: ScreeningSettings,
    ) -> Self {
        Self {
            client,
            fetcher,
            space,
            metrics,
            settings,
            state: Mutex::new(ScreeningState::default()),
            pending: PendingApplications::new(),
        }
    }

    pub fn screening_room(&self) -> &RoomId {
        &self.settings.screening_room
    }

    pub fn pending(&self) -> &PendingApplications {
        &self.pending
    }

    /// `None`: never welcomed. `Some(None)`: welcome already redacted.
    pub async fn welcome_of(&self, user: &UserId) -> Option<Option<EventId>> {
        self.state.lock().await.welcomed.get(user).cloned()
    }

    pub async fn welcomed_count(&self) -> usize {
        self.state.lock().await.welcomed.len()
    }

    /// A user joined the screening room.
    pub async fn on_join(&self, user: &UserId, event_id: &EventId) -> Result<JoinOutcome> {
        if self.space.contains(user) || user == self.client.user_id() {
            tracing::debug!(user = %user, "join skipped: space member or self");
            return Ok(JoinOutcome::Skipped);
        }

        let mut state = self.state.lock().await;
        if state.welcomed.contains_key(user) {
            tracing::debug!(user = %user, "join skipped: already welcomed");
            return Ok(JoinOutcome::Skipped);
        }

        if !state.limiter.admit(Instant::now()) {
            tracing::warn!(user = %user, count = state.limiter.count(), "Not checking joined member due to rate limiting");
            self.metrics.screenings_dropped.inc(&[("reason", "rate_limited")]);
            return Ok(JoinOutcome::RateLimited);
        }

        let room = self.settings.screening_room.clone();
        let join_type = self.check_member(&mut state, &room, user, event_id, true).await?;
        state.limiter.record();
        Ok(JoinOutcome::Screened(join_type))
    }

    /// `recheck` command: screen again with the recheck prefix. Not rate
    /// limited; keeps the original welcome id for redaction.
    pub async fn recheck(&self, room_id: &RoomId, user: &UserId, event_id: &EventId) -> Result<JoinType> {
        let mut state = self.state.lock().await;
        self.check_member(&mut state, room_id, user, event_id, false).await
    }

    /// A user left or was banned from the screening room. Returns whether a
    /// welcome message was redacted.
    pub async fn on_leave(&self, user: &UserId) -> Result<bool> {
        let claimed = {
            let mut state = self.state.lock().await;
            match state.welcomed.get_mut(user) {
                Some(slot) => slot.take(),
                None => return Ok(false),
            }
        };
        let Some(message_id) = claimed else {
            return Ok(false);
        };

        self.client
            .redact(&self.settings.screening_room, &message_id, Some(LEFT_REASON))
            .await?;
        self.metrics.redactions.inc(&[]);
        tracing::info!(user = %user, event_id = %message_id, "welcome redacted");
        Ok(true)
    }

    /// Reaction anywhere. Returns whether it confirmed an application.
    pub async fn on_reaction(&self, room_id: &RoomId, event: &RoomEvent) -> Result<bool> {
        if event.sender == *self.client.user_id() {
            return Ok(false);
        }
        let Ok(relation) = event.reaction() else {
            return Ok(false);
        };
        if !relation.is_annotation() || !relation.key().starts_with(THUMBS_UP) {
            return Ok(false);
        }

        let target_id = relation.event_id;
        if self.pending.lookup(&target_id) == ApplicationTarget::Unknown {
            let resolved = match self.client.get_event(room_id, &target_id).await {
                Ok(target) => self.applicant_of(&target),
                Err(e) => {
                    tracing::warn!(event_id = %target_id, error = %e, "failed to get event to check reaction target");
                    // A concurrent lookup may already have found the applicant.
                    self.pending.resolve_if_unknown(target_id, ApplicationTarget::Nobody);
                    return Ok(false);
                }
            };
            self.pending.resolve_if_unknown(target_id.clone(), resolved);
        }

        if !self.pending.claim(&target_id, &event.sender) {
            return Ok(false);
        }
        let content = self.application_content(&event.sender);
        self.client.send_message(room_id, &content).await?;
        self.metrics.applications.inc(&[("source", "reaction")]);
        tracing::info!(user = %event.sender, event_id = %target_id, "application confirmed by reaction");
        Ok(true)
    }

    /// `apply` command: post the application message, no gating.
    pub async fn apply(&self, room_id: &RoomId, user: &UserId, event_id: &EventId) -> Result<EventId> {
        let content = self.application_content(user).reply_to(event_id.clone());
        let sent = self.client.send_message(room_id, &content).await?;
        self.metrics.applications.inc(&[("source", "command")]);
        Ok(sent)
    }

    fn applicant_of(&self, event: &RoomEvent) -> ApplicationTarget {
        if event.sender != *self.client.user_id() {
            return ApplicationTarget::Nobody;
        }
        match event
            .content_str(VERIFIED_APPLICATION_SENDER_KEY)
            .and_then(|s| UserId::parse(s).ok())
        {
            Some(user) => ApplicationTarget::Applicant(user),
            None => ApplicationTarget::Nobody,
        }
    }

    async fn classify(&self, user: &UserId) -> JoinType {
        let server_name = user.server_name();
        match self.fetcher.fetch(server_name).await {
            Ok(doc) => {
                self.metrics.support_fetch.inc(&[("result", "ok")]);
                if doc.has_contact(user) {
                    JoinType::NewIsListedSupport
                } else {
                    JoinType::NewNotListedSupport
                }
            }
            Err(e) => {
                self.metrics.support_fetch.inc(&[("result", "failed")]);
                tracing::warn!(server = %server_name, error = %e, "Failed to fetch support .well-known");
                JoinType::NewWellKnownMissing
            }
        }
    }

    async fn check_member(
        &self,
        state: &mut ScreeningState,
        room_id: &RoomId,
        user: &UserId,
        reply_to: &EventId,
        is_join: bool,
    ) -> Result<JoinType> {
        let join_type = self.classify(user).await;
        let content = self.welcome_content(user, join_type, is_join, reply_to);

        let sent = self.client.send_message(room_id, &content).await?;
        state.welcomed.entry(user.clone()).or_insert_with(|| Some(sent.clone()));
        if join_type == JoinType::NewIsListedSupport {
            self.pending
                .resolve(sent.clone(), ApplicationTarget::Applicant(user.clone()));
        }

        self.metrics.screenings.inc(&[("join_type", join_type.as_str())]);
        tracing::info!(user = %user, join_type = join_type.as_str(), is_join, event_id = %sent, "member checked");
        Ok(join_type)
    }

    fn welcome_content(&self, user: &UserId, join_type: JoinType, is_join: bool, reply_to: &EventId) -> OutgoingMessage {
        let messages = &self.settings.messages;
        let mention = user_mention(user);
        let server_html = escape_html(user.server_name());

        let vars = [("user", mention.as_str()), ("server", server_html.as_str())];

        let prefix_template = if is_join { &messages.prefix } else { &messages.recheck_prefix };
        let prefix = format_template(prefix_template, &vars);
        let body = format_template(join_type.template(messages), &vars);
        let suffix = format_template(&messages.suffix, &vars);
        let html = format!("<p>{prefix}</p><p>{body}</p><p>{suffix}</p>");

        let mut content = OutgoingMessage::html(MsgType::Notice, html_to_plain(&html), html)
            .with_mentions(vec![user.clone()])
            .reply_to(reply_to.clone());
        if join_type == JoinType::NewIsListedSupport {
            content = content.with_extra(VERIFIED_APPLICATION_SENDER_KEY, json!(user));
        }
        content
    }

    fn application_content(&self, user: &UserId) -> OutgoingMessage {
        let html = format!(
            "{} Application received, please wait for manual review. \
             Feel free to send messages with additional details if necessary.",
            user_mention(user)
        );
        let mut mentions = vec![user.clone()];
        mentions.extend(self.settings.application_pings.iter().cloned());
        OutgoingMessage::html(MsgType::Text, html_to_plain(&html), html).with_mentions(mentions)
    }
}
