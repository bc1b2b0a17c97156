//! Binary entry point: wires up the Durable Store, the Ephemeral Store, the
//! episode catalog, and the Session Gateway's axum router, then serves
//! WebSocket connections until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio::time::{interval, MissedTickBehavior};
use tokio::{pin, signal};
use tracing::info;
use tracing_subscriber::fmt::time::Uptime;
use tracing_subscriber::EnvFilter;

use jeopardy_coordinator::catalog::StaticCatalog;
use jeopardy_coordinator::config::CoordinatorConfig;
use jeopardy_coordinator::game::GameCoordinator;
use jeopardy_coordinator::gateway::{router, AppState};
use jeopardy_coordinator::store::{EphemeralStore, PgDurableStore};

const LOG_TARGET: &str = "jeopardy::main";

#[tokio::main]
async fn main() -> Result<()> {
    let config = CoordinatorConfig::load();
    init_tracing(config.log_json)?;

    info!(target: LOG_TARGET, bind = %config.bind, "starting jeopardy coordinator");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the durable store")?;

    let coordinator = Arc::new(GameCoordinator {
        ephemeral: Arc::new(EphemeralStore::new()),
        durable: Arc::new(PgDurableStore::new(pool)),
        catalog: Arc::new(StaticCatalog::new(Vec::new())),
    });
    let state = Arc::new(AppState::new(coordinator.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let gc_coordinator = coordinator.clone();
    let gc_interval = Duration::from_secs(config.gc_interval_secs);
    let gc_task = tokio::spawn(async move {
        let mut ticker = interval(gc_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            gc_coordinator.ephemeral.sweep_expired().await;
        }
    });

    let shutdown = signal::ctrl_c();
    pin!(shutdown);

    let serve = axum::serve(listener, router(state));
    tokio::select! {
        result = serve => {
            result.context("server loop exited unexpectedly")?;
        }
        _ = &mut shutdown => {
            info!(target: LOG_TARGET, "received shutdown signal");
        }
    }

    gc_task.abort();
    info!(target: LOG_TARGET, "jeopardy coordinator shut down");
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jeopardy_coordinator=info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_timer(Uptime::default())
            .with_ansi(false)
            .json()
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_timer(Uptime::default())
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    }
    Ok(())
}
