//! garden-watch: Grow a Garden stock watcher.
//!
//! Single-binary Tokio application that:
//! 1. Polls the public stock API on a fixed interval
//! 2. Keeps the latest per-shop snapshot in memory
//! 3. Announces watched items once per restock
//! 4. Serves the snapshot over HTTP for the web UI

mod config;
mod notifier;
mod server;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use gag_client::GagClient;
use stock::{ManagerSettings, StockManager, StockUpdate, UpdateCallback};

/// Grow a Garden stock watcher
#[derive(Parser)]
#[command(name = "garden-watch", about = "Grow a Garden stock watcher")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Address for the HTTP server, e.g. 127.0.0.1:8001.
    #[arg(long)]
    listen: Option<String>,

    /// Seconds between polls.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Log restocks instead of sending desktop notifications.
    #[arg(long)]
    no_notify: bool,

    /// Poll once, print the snapshot as JSON, and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "garden_watch=info,gag_client=info,stock=info,tower_http=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🌱 garden-watch starting up...");

    let overrides = config::Overrides {
        listen: cli.listen.clone(),
        interval_secs: cli.interval_secs,
        no_notify: cli.no_notify,
    };
    let cfg = match config::load_config(&cli.config, &overrides) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Upstream: {}", cfg.upstream.url);
    info!(
        "Polling: every {}s, force_notify={}, timerless={:?}",
        cfg.polling.interval_secs, cfg.polling.force_notify, cfg.polling.timerless_policy
    );
    info!("Watching {} items", cfg.watch_list.len());

    let client = GagClient::new(&cfg.upstream)?;
    let settings = ManagerSettings::from_config(&cfg);

    if cli.once {
        let manager = StockManager::start(client, settings, None).await;
        let update = manager.handle().current().await;
        println!("{}", serde_json::to_string_pretty(&update)?);
        return Ok(());
    }

    let sink = notifier::from_config(&cfg.notify);
    let on_update: UpdateCallback<StockUpdate> =
        Box::new(move |update: &StockUpdate| notifier::announce(sink.as_ref(), update));

    let manager = StockManager::start(client, settings, Some(on_update)).await;
    let state = server::AppState::new(manager.handle(), cfg.watch_list.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = manager.spawn(shutdown_rx.clone());

    let listener = TcpListener::bind(&cfg.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen))?;
    info!("HTTP server listening on {}", cfg.server.listen);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let app = server::router(state, cfg.server.static_dir.as_deref());
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await
        .context("HTTP server failed")?;

    if let Err(e) = poller.await {
        warn!("Stock poller ended abnormally: {}", e);
    }

    info!("garden-watch stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
