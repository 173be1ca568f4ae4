use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::ConfigEncoding;
use crate::proxy::{MirrorSnapshot, ProxyKey, StatsSnapshot};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub worker_threads: usize,
    pub encoding: ConfigEncoding,
    pub proxies: usize,
}

#[derive(Serialize)]
pub struct ProxyStatus {
    pub name: String,
    pub port: u16,
    pub config_version: u32,
    pub tombstone: bool,
    pub config: Option<String>,
    pub servers: Vec<String>,
    pub front_cache_running: bool,
    pub front_cache_items: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        worker_threads: state.main.workers().thread_count(),
        encoding: state.main.encoding(),
        proxies: state.main.proxies().len(),
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    Json(state.main.stats().snapshot())
}

pub async fn reset_stats(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    let before = state.main.stats().snapshot();
    state.main.stats().reset();
    tracing::info!(configs = before.configs, "Stats reset");
    Json(before)
}

pub async fn get_proxies(State(state): State<AdminState>) -> Json<Vec<ProxyStatus>> {
    let statuses = state
        .main
        .proxies()
        .iter()
        .map(|p| {
            let snap = p.snapshot();
            ProxyStatus {
                name: p.name().to_string(),
                port: p.port(),
                config_version: snap.config_version,
                tombstone: snap.is_tombstone(),
                servers: snap
                    .behavior_pool
                    .entries
                    .iter()
                    .filter_map(|b| b.server_token())
                    .collect(),
                config: snap.raw_config,
                front_cache_running: p.front_cache().is_running(),
                front_cache_items: p.front_cache().len(),
            }
        })
        .collect();

    Json(statuses)
}

/// Every serving thread's mirror of one proxy.
pub async fn get_mirrors(
    State(state): State<AdminState>,
    Path((name, port)): Path<(String, u16)>,
) -> Result<Json<Vec<MirrorSnapshot>>, StatusCode> {
    let key = ProxyKey::new(name, port);
    if state.main.find(&key.name, key.port).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let workers = state.main.workers();
    let mut mirrors = Vec::with_capacity(workers.thread_count().saturating_sub(1));
    for thread in 1..workers.thread_count() {
        let rx = workers
            .inspect_mirror(thread, &key)
            .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
        match rx.await {
            Ok(Some(mirror)) => mirrors.push(mirror),
            Ok(None) => {}
            Err(_) => return Err(StatusCode::SERVICE_UNAVAILABLE),
        }
    }

    Ok(Json(mirrors))
}
