//! Topology file watcher for hot reconfiguration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::agent::KvPairs;
use crate::config::loader::load_topology;
use crate::config::schema::ConfigEncoding;

/// A watcher that monitors the topology file for changes.
pub struct TopologyWatcher {
    path: PathBuf,
    encoding: ConfigEncoding,
    update_tx: mpsc::UnboundedSender<KvPairs>,
}

impl TopologyWatcher {
    /// Create a new TopologyWatcher.
    ///
    /// Returns the watcher and a receiver for topology updates.
    pub fn new(path: &Path, encoding: ConfigEncoding) -> (Self, mpsc::UnboundedReceiver<KvPairs>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                encoding,
                update_tx,
            },
            update_rx,
        )
    }

    /// Re-read the file now and queue the result.
    pub fn reload(&self) -> bool {
        reload(&self.path, self.encoding, &self.update_tx)
    }

    /// Start watching the file in a background thread.
    pub fn run(&self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let encoding = self.encoding;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Topology change detected, reloading");
                        reload(&path, encoding, &tx);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Topology watcher started");
        Ok(watcher)
    }
}

fn reload(path: &Path, encoding: ConfigEncoding, tx: &mpsc::UnboundedSender<KvPairs>) -> bool {
    match load_topology(path, encoding) {
        Ok(update) => tx.send(update).is_ok(),
        Err(e) => {
            tracing::error!("Failed to reload topology: {}. Keeping current configuration.", e);
            false
        }
    }
}
