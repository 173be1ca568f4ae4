//! Ingestion entry point: one reconciliation pass per configuration update.

use std::sync::Arc;

use serde::Serialize;

use crate::agent::kvs::KvPairs;
use crate::agent::{json_config, kvs_config};
use crate::config::ConfigEncoding;
use crate::error::AgentError;
use crate::proxy::{PoolOutcome, ProxyMain};
use crate::work::{current_worker, WorkCollect, WorkItem, CONTROL_THREAD};

/// What one reconciliation pass did, pool by pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub version: u32,
    pub started: usize,
    pub updated: usize,
    pub changed: usize,
    pub shutdown: usize,
    pub failed: usize,
    pub skipped: usize,
    pub retired: usize,
    pub removed: usize,
}

impl PassReport {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Tally one pool's result. Errors are logged here and go no further.
    pub(crate) fn record(&mut self, pool: &str, result: Result<Option<PoolOutcome>, AgentError>) {
        match result {
            Ok(Some(PoolOutcome::Started)) => self.started += 1,
            Ok(Some(PoolOutcome::Updated(outcome))) => {
                if outcome.shutdown {
                    self.shutdown += 1;
                } else {
                    self.updated += 1;
                }
                if outcome.changed {
                    self.changed += 1;
                }
            }
            Ok(None) => self.skipped += 1,
            Err(e) => {
                tracing::warn!(pool = %pool, version = self.version, error = %e, "Pool config skipped");
                self.failed += 1;
            }
        }
    }
}

impl ProxyMain {
    /// Run one reconciliation pass over `update` on the calling thread.
    ///
    /// Parse, then reconcile each pool in order, then sweep. A structural
    /// error fails the whole update before any proxy is touched; per-pool
    /// failures only skip that pool.
    pub fn apply_config(&self, update: &KvPairs) -> Result<PassReport, AgentError> {
        self.stats().config_received();

        let version = self.next_config_version();
        tracing::debug!(version, "New config version");

        let mut report = PassReport::new(version);
        let parsed = match self.encoding() {
            ConfigEncoding::KeyValues => kvs_config::on_config_kvs(self, update, &mut report),
            ConfigEncoding::Document => json_config::on_config_document(self, update, &mut report),
        };

        if let Err(e) = parsed {
            let fails = self.stats().config_failed();
            tracing::warn!(version, config_fails = fails, error = %e, "Configuration update rejected");
            return Err(e);
        }

        report.removed = self.remove_drained_proxies(version);
        report.retired = self.close_outdated_proxies(version);

        tracing::info!(
            version,
            started = report.started,
            updated = report.updated,
            changed = report.changed,
            shutdown = report.shutdown,
            failed = report.failed,
            skipped = report.skipped,
            retired = report.retired,
            removed = report.removed,
            "Configuration applied"
        );
        Ok(report)
    }

    /// Hand `update` to the control thread and block until it has been
    /// fully reconciled.
    ///
    /// Returns once the pass is done whether or not it succeeded; outcomes
    /// are visible through stats and logs.
    pub fn on_new_config(self: &Arc<Self>, update: KvPairs) -> Result<(), AgentError> {
        debug_assert!(
            current_worker().is_none(),
            "configuration delivered from a pool thread"
        );

        let completion = Arc::new(WorkCollect::new(1, self.clone()));
        self.workers().submit_to(
            CONTROL_THREAD,
            WorkItem::ApplyConfig {
                update,
                completion: completion.clone(),
            },
        )?;

        completion.wait();
        Ok(())
    }
}
