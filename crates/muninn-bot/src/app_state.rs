//! Shared application state for the bot.
//!
//! Builds the screening engine, the name monitor and the space cache from
//! the config, and registers their handlers with the dispatcher. Startup
//! errors are returned, not panicked.

use std::sync::Arc;

use tokio::task::JoinHandle;

use muninn_core::error::Result;

use crate::client::ChatClient;
use crate::config::BotConfig;
use crate::directory::monitor::DirectorySettings;
use crate::directory::{NameMonitor, TldSet};
use crate::dispatch::Dispatcher;
use crate::obs::BotMetrics;
use crate::ops::Health;
use crate::screening::{ScreeningEngine, ScreeningQueue, ScreeningSettings};
use crate::services::{
    ApplyCommand, MemberDirectoryCommand, NameIndexService, PingUnsetCommand, RecheckCommand,
    ScreeningService, SpaceService,
};
use crate::space::SpaceMembers;
use crate::wellknown::SupportFetcher;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: BotConfig,
    client: Arc<dyn ChatClient>,
    dispatcher: Arc<Dispatcher>,
    engine: Arc<ScreeningEngine>,
    screening: ScreeningQueue,
    monitor: Arc<NameMonitor>,
    space: Arc<SpaceMembers>,
    metrics: Arc<BotMetrics>,
    health: Arc<Health>,
}

impl AppState {
    /// Build application state. The TLD list comes from `bot.tld_file` or
    /// the bundled copy. Spawns the screening worker, so it must run inside
    /// a tokio runtime.
    pub fn new(cfg: BotConfig, client: Arc<dyn ChatClient>, fetcher: Arc<dyn SupportFetcher>) -> Result<Self> {
        let tlds = match &cfg.bot.tld_file {
            Some(path) => TldSet::load(path)?,
            None => TldSet::bundled(),
        };
        Ok(Self::with_tlds(cfg, client, fetcher, tlds))
    }

    pub fn with_tlds(
        cfg: BotConfig,
        client: Arc<dyn ChatClient>,
        fetcher: Arc<dyn SupportFetcher>,
        tlds: TldSet,
    ) -> Self {
        tracing::info!(tlds = tlds.len(), "TLD allow-list loaded");

        // 1) Core components
        let metrics = Arc::new(BotMetrics::new());
        let health = Arc::new(Health::new());
        let space = Arc::new(SpaceMembers::new());
        let engine = Arc::new(ScreeningEngine::new(
            Arc::clone(&client),
            fetcher,
            Arc::clone(&space),
            Arc::clone(&metrics),
            ScreeningSettings::from_config(&cfg),
        ));
        let (screening, _worker) = ScreeningQueue::spawn(Arc::clone(&engine));
        let monitor = Arc::new(NameMonitor::new(
            Arc::clone(&client),
            DirectorySettings::from_config(&cfg),
            tlds,
            cfg.excluded_members.clone(),
        ));

        // 2) Handlers
        let dispatcher = Dispatcher::new(client.user_id().clone(), cfg.bot.command_prefix.clone());
        dispatcher.register_events(Arc::new(SpaceService::new(
            cfg.rooms.space_room.clone(),
            Arc::clone(&space),
        )));
        dispatcher.register_events(Arc::new(ScreeningService::new(
            Arc::clone(&engine),
            screening.clone(),
        )));
        dispatcher.register_events(Arc::new(NameIndexService::new(Arc::clone(&monitor))));

        dispatcher.register_command(Arc::new(RecheckCommand::new(screening.clone())));
        dispatcher.register_command(Arc::new(ApplyCommand::new(Arc::clone(&engine))));
        dispatcher.register_command(Arc::new(MemberDirectoryCommand::new(Arc::clone(&monitor))));
        dispatcher.register_command(Arc::new(PingUnsetCommand::new(Arc::clone(&monitor))));

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                client,
                dispatcher: Arc::new(dispatcher),
                engine,
                screening,
                monitor,
                space,
                metrics,
                health,
            }),
        }
    }

    /// Load the space roster (awaited) and start seeding the name index in
    /// the background. Returns the seeding task.
    pub async fn start(&self) -> Result<JoinHandle<()>> {
        let snapshot = self
            .inner
            .client
            .joined_members(&self.inner.cfg.rooms.space_room)
            .await?;
        self.inner.space.load(snapshot);
        self.inner.health.mark_space_loaded();

        Ok(self.inner.monitor.spawn_load())
    }

    /// Apply the live-reloadable part of a freshly loaded config.
    pub fn reload(&self, cfg: &BotConfig) {
        self.inner.monitor.set_excluded(cfg.excluded_members.clone());
    }

    pub fn cfg(&self) -> &BotConfig {
        &self.inner.cfg
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        Arc::clone(&self.inner.client)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.inner.dispatcher)
    }

    pub fn engine(&self) -> Arc<ScreeningEngine> {
        Arc::clone(&self.inner.engine)
    }

    /// Wait for queued joins, leaves and rechecks to finish.
    pub async fn flush_screening(&self) -> Result<()> {
        self.inner.screening.flush().await
    }

    pub fn monitor(&self) -> Arc<NameMonitor> {
        Arc::clone(&self.inner.monitor)
    }

    pub fn space(&self) -> Arc<SpaceMembers> {
        Arc::clone(&self.inner.space)
    }

    pub fn metrics(&self) -> Arc<BotMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn health(&self) -> Arc<Health> {
        Arc::clone(&self.inner.health)
    }

    pub async fn render_metrics(&self) -> String {
        let (indexed, servers) = self
            .inner
            .monitor
            .with_index(|idx| (idx.len() as u64, idx.server_count() as u64));
        let welcomed = self.inner.engine.welcomed_count().await as u64;
        let pending = self.inner.engine.pending().len() as u64;
        let space = self.inner.space.len() as u64;

        self.inner.metrics.render(&[
            ("muninn_space_members", "Members of the space room.", space),
            ("muninn_indexed_members", "Members tracked by the name index.", indexed),
            ("muninn_indexed_servers", "Distinct servers declared in display names.", servers),
            ("muninn_welcomed_users", "Users who received a welcome message.", welcomed),
            ("muninn_application_targets", "Cached reaction targets.", pending),
        ])
    }
}
