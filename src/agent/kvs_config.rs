//! Key-multivalue topology parsing.
//!
//! An update looks roughly like:
//!
//! ```text
//! pools              customer1-a customer1-b
//! bindings           11221 11331
//! pool-customer1-a   svrname3
//! pool-customer1-b   svrname1 svrname2
//! svr-svrname1       host=mc1.foo.net port=11211 weight=1 bucket=buck1
//! behavior-customer1-a  wait_queue_timeout=1000 downstream_max=10
//! behavior           downstream_max=4
//! ```

use crate::agent::ingest::PassReport;
use crate::agent::kvs::KvPairs;
use crate::behavior::{Behavior, BehaviorPool};
use crate::error::AgentError;
use crate::proxy::ProxyMain;

/// Apply the `<prefix>-<name>` property section to `behavior`.
///
/// Returns false when the section is absent.
pub fn parse_kvs_behavior(
    kvs: &KvPairs,
    prefix: &str,
    name: &str,
    behavior: &mut Behavior,
) -> bool {
    match kvs.get_values(&format!("{}-{}", prefix, name)) {
        Some(props) => {
            behavior.apply_all(props);
            true
        }
        None => false,
    }
}

/// Build one entry per server, each inheriting `base` and then applying its
/// own `<prefix>-<server>` section.
pub fn parse_kvs_servers(
    kvs: &KvPairs,
    prefix: &str,
    pool_name: &str,
    servers: &[String],
    base: &Behavior,
) -> BehaviorPool {
    let mut pool = BehaviorPool::empty(base.clone());

    for server in servers {
        let server = server.trim();
        let entry = pool.push_inherited();
        parse_kvs_behavior(kvs, prefix, server, entry);

        if entry.server_token().is_none() {
            tracing::warn!(pool = %pool_name, server = %server, "Missing host:port for server");
        }
    }

    pool
}

/// Reconcile every pool in a key-multivalue update.
///
/// Structural errors are returned before any proxy is touched. Per-pool
/// problems are logged and recorded in `report`.
pub(crate) fn on_config_kvs(
    main: &ProxyMain,
    kvs: &KvPairs,
    report: &mut PassReport,
) -> Result<(), AgentError> {
    let pools = kvs.get_values("pools").ok_or(AgentError::MissingPools)?;
    let bindings = kvs.get_values("bindings").unwrap_or_default();

    if !bindings.is_empty() && bindings.len() != pools.len() {
        return Err(AgentError::MismatchedBindings {
            pools: pools.len(),
            bindings: bindings.len(),
        });
    }

    if let Some(props) = kvs.get_values("behavior") {
        let mut behavior = main.behavior();
        behavior.apply_all(props);
        tracing::debug!(?behavior, "Default behavior updated");
        main.set_behavior(behavior);
    }

    for (i, pool_name) in pools.iter().enumerate() {
        let pool_name = pool_name.trim();
        if pool_name.is_empty() {
            malformed(main, report, pool_name, "missing pool name");
            continue;
        }

        let Some(servers) = kvs.get_values(&format!("pool-{}", pool_name)) else {
            // Left at its old version, so the sweep retires it.
            tracing::debug!(pool = %pool_name, "Pool has no server list");
            report.skipped += 1;
            continue;
        };

        let mut base = main.behavior();
        if parse_kvs_behavior(kvs, "behavior", pool_name, &mut base) {
            tracing::trace!(pool = %pool_name, behavior = ?base, "Pool behavior");
        }

        let port = match bindings.get(i) {
            Some(binding) => binding.trim().parse().unwrap_or(0),
            None => base.port_listen,
        };
        if port == 0 {
            malformed(main, report, pool_name, "missing pool port");
            continue;
        }

        if servers.is_empty() {
            tracing::debug!(pool = %pool_name, "Pool has no servers");
            report.skipped += 1;
            continue;
        }

        let behavior_pool = parse_kvs_servers(kvs, "svr", pool_name, servers, &base);
        let config = behavior_pool.connection_string();
        if config.is_empty() {
            tracing::debug!(pool = %pool_name, "Pool renders no servers");
            report.skipped += 1;
            continue;
        }

        tracing::debug!(pool = %pool_name, port, config = %config, "Pool config");
        let result =
            main.on_config_pool(pool_name, port, Some(&config), report.version, &behavior_pool);
        report.record(pool_name, result.map(Some));
    }

    Ok(())
}

fn malformed(main: &ProxyMain, report: &mut PassReport, pool: &str, reason: &'static str) {
    main.stats().pool_failed();
    report.record(
        pool,
        Err(AgentError::MalformedPool {
            pool: pool.to_string(),
            reason,
        }),
    );
}
