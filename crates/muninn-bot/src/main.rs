//! muninn bot binary.
//!
//! - Strict config load from the path in argv[1] (default `muninnbot.yaml`)
//! - Ops endpoints on `bot.ops_listen`
//! - Sync loop until Ctrl-C; SIGHUP reloads the exclusion list

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use muninn_bot::client::{ChatClient, HttpChatClient, SyncLoop};
use muninn_bot::wellknown::HttpSupportFetcher;
use muninn_bot::{app_state, config, router};
use muninn_core::error::{BotError, Result};

const DEFAULT_CONFIG: &str = "muninnbot.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let cfg = config::load_from_file(&config_path)?;
    let listen: SocketAddr = cfg
        .bot
        .ops_listen
        .parse()
        .map_err(|e| BotError::Config(format!("bot.ops_listen must be a valid SocketAddr: {e}")))?;

    // HTTP clients: the homeserver one relies on per-request timeouts (long
    // polls), the well-known one carries the configured fetch timeout.
    let homeserver_http = reqwest::Client::builder()
        .build()
        .map_err(|e| BotError::Internal(format!("http client: {e}")))?;
    let fetch_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.bot.support_fetch_timeout_secs))
        .build()
        .map_err(|e| BotError::Internal(format!("http client: {e}")))?;

    let client = Arc::new(HttpChatClient::new(&cfg.homeserver, homeserver_http)?);
    let fetcher = Arc::new(HttpSupportFetcher::new(fetch_http));
    let sync_timeout_ms = cfg.bot.sync_timeout_ms;

    let state = app_state::AppState::new(cfg, client.clone(), fetcher)?;
    tracing::info!(
        user = %client.user_id(),
        commands = ?state.dispatcher().registered_commands(),
        handlers = ?state.dispatcher().registered_event_handlers(),
        "muninnbot starting"
    );

    // Ops server first so /healthz answers while the roster loads.
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| BotError::Config(format!("failed to bind {listen}: {e}")))?;
    let app = router::build_router(state.clone());
    tracing::info!(%listen, "ops endpoints listening");
    let ops = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "ops server failed");
        }
    });

    let _seeding = state.start().await?;

    #[cfg(unix)]
    spawn_reload_on_hangup(state.clone(), config_path.clone())?;

    let sync = SyncLoop::new(client, state.dispatcher(), state.health(), sync_timeout_ms);
    tokio::select! {
        _ = sync.run() => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        }
    }

    ops.abort();
    Ok(())
}

/// Re-read the config on SIGHUP and apply the reloadable parts. A broken
/// file keeps the previous settings.
#[cfg(unix)]
fn spawn_reload_on_hangup(state: app_state::AppState, path: PathBuf) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())
        .map_err(|e| BotError::Internal(format!("SIGHUP handler: {e}")))?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match config::load_from_file(&path) {
                Ok(cfg) => state.reload(&cfg),
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), path = %path.display(), "config reload failed");
                }
            }
        }
    });
    Ok(())
}
