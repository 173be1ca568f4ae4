//! kv-proxy agent daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   topology file ──▶ TopologyWatcher ──▶ ingest loop ──spawn_blocking──▶ on_new_config
//!        ▲                                                                     │
//!      SIGHUP                                                                  ▼
//!                                                         control thread: apply_config
//!                                                           ├─ on_config_pool (per pool)
//!                                                           │    └─ refresh_mirrors ──▶ workers 1..N
//!                                                           └─ close_outdated_proxies
//!
//!   admin API ──▶ ProxyMain (stats, proxies, mirrors)
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use kv_proxy::admin::{setup_admin_router, AdminState};
use kv_proxy::config::{load_config, TopologyWatcher};
use kv_proxy::error::AgentError;
use kv_proxy::lifecycle::{shutdown_signal, start_agent, ReloadSignal, Shutdown};
use kv_proxy::observability::{logging, metrics};
use kv_proxy::proxy::TcpListenerSet;

#[derive(Parser)]
#[command(name = "kv-proxy", version, about = "Dynamically reconfigured key-value proxy agent")]
struct Args {
    /// Agent configuration file.
    #[arg(short, long, default_value = "kv-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kv-proxy starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        worker_threads = config.agent.worker_threads,
        encoding = ?config.agent.encoding,
        topology = ?config.agent.topology_path,
        "Configuration loaded"
    );

    let listeners = Arc::new(TcpListenerSet::new(config.agent.listen_host.clone()));
    let startup_config = config.clone();
    let agent = tokio::task::spawn_blocking(move || start_agent(&startup_config, listeners)).await??;

    let shutdown = Arc::new(Shutdown::new());

    // Topology updates: file changes and SIGHUP feed one channel.
    let topology_path = config
        .agent
        .topology_path
        .as_deref()
        .ok_or(AgentError::MissingConfig)?;
    let (watcher, mut updates) = TopologyWatcher::new(topology_path, config.agent.encoding);
    let _watch_guard = if config.agent.watch {
        Some(watcher.run()?)
    } else {
        None
    };

    let ingest = {
        let agent = agent.clone();
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(update) = updates.recv() => {
                        let agent = agent.clone();
                        match tokio::task::spawn_blocking(move || agent.on_new_config(update)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => tracing::error!(error = %e, "Failed to deliver topology"),
                            Err(e) => tracing::error!(error = %e, "Topology task failed"),
                        }
                    }
                    _ = stop.recv() => break,
                }
            }
        })
    };

    let admin = if config.admin.enabled {
        let router = setup_admin_router(AdminState::new(agent.clone(), &config.admin.api_key));
        let listener = tokio::net::TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");

        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let mut reload = ReloadSignal::new();
    let stop = shutdown_signal();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = reload.recv() => {
                watcher.reload();
            }
        }
    }

    shutdown.trigger();
    let _ = ingest.await;
    if let Some(admin) = admin {
        let _ = admin.await;
    }

    let workers = agent.workers().clone();
    tokio::task::spawn_blocking(move || workers.shutdown()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
