//! Admin HTTP API.
//!
//! # Routes
//! - `GET  /admin/status`: version, thread count, encoding, proxy count
//! - `GET  /admin/stats`: reconfiguration counters
//! - `POST /admin/stats/reset`: zero the counters, returning their last values
//! - `GET  /admin/proxies`: every proxy with its version and servers
//! - `GET  /admin/proxies/{name}/{port}/mirrors`: per-thread mirrors
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::proxy::ProxyMain;

use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub main: Arc<ProxyMain>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(main: Arc<ProxyMain>, api_key: &str) -> Self {
        Self {
            main,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/stats/reset", post(reset_stats))
        .route("/admin/proxies", get(get_proxies))
        .route("/admin/proxies/{name}/{port}/mirrors", get(get_mirrors))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
