//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use kv_proxy::config::ConfigEncoding;
use kv_proxy::proxy::{ListenError, MirrorSnapshot, ProxyKey, ProxyListener, ProxyMain};
use kv_proxy::{Behavior, KvPairs, WorkerPool};

/// Listener that records every listen and fails on chosen ports.
#[derive(Debug, Default)]
pub struct MockListener {
    listens: Mutex<Vec<ProxyKey>>,
    failing: Mutex<HashSet<u16>>,
}

impl MockListener {
    pub fn fail_port(&self, port: u16) {
        self.failing.lock().unwrap().insert(port);
    }

    pub fn listens(&self) -> Vec<ProxyKey> {
        self.listens.lock().unwrap().clone()
    }
}

impl ProxyListener for MockListener {
    fn listen(&self, key: &ProxyKey) -> Result<usize, ListenError> {
        if self.failing.lock().unwrap().contains(&key.port) {
            return Err(ListenError::Bind {
                host: "mock".to_string(),
                port: key.port,
                source: io::Error::new(io::ErrorKind::AddrInUse, "mock port in use"),
            });
        }
        self.listens.lock().unwrap().push(key.clone());
        Ok(1)
    }
}

/// A registry over `threads` worker threads and a mock listener.
pub fn agent_with(
    threads: usize,
    encoding: ConfigEncoding,
    behavior: Behavior,
) -> (Arc<ProxyMain>, Arc<MockListener>) {
    let listener = Arc::new(MockListener::default());
    let workers = Arc::new(WorkerPool::start(threads).unwrap());
    let main = Arc::new(ProxyMain::new(behavior, encoding, workers, listener.clone()));
    (main, listener)
}

pub fn agent(threads: usize) -> (Arc<ProxyMain>, Arc<MockListener>) {
    agent_with(threads, ConfigEncoding::KeyValues, Behavior::default())
}

/// Build an update from `(key, values)` pairs.
pub fn kvs(pairs: &[(&str, &[&str])]) -> KvPairs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string())))
        .collect()
}

/// One pool `p1` on 11300 with one server at 127.0.0.1:`port`.
pub fn single_pool(server_port: u16) -> KvPairs {
    let port = format!("port={}", server_port);
    kvs(&[
        ("pools", &["p1"]),
        ("bindings", &["11300"]),
        ("pool-p1", &["s1"]),
        ("svr-s1", &["host=127.0.0.1", port.as_str()]),
        ("behavior-p1", &["key_stats_max=16", "key_stats_lifespan=60000"]),
    ])
}

/// Every serving thread's mirror of `key`.
pub fn mirrors(main: &ProxyMain, key: &ProxyKey) -> Vec<Option<MirrorSnapshot>> {
    let workers = main.workers();
    (1..workers.thread_count())
        .map(|thread| workers.inspect_mirror(thread, key).unwrap().blocking_recv().unwrap())
        .collect()
}

pub fn config_of(main: &ProxyMain, name: &str, port: u16) -> Option<String> {
    main.find(name, port).unwrap().snapshot().raw_config
}
