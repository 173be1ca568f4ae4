//! Reconciliation passes over the structured-document form.

use kv_proxy::agent::DEFAULT_BUCKET;
use kv_proxy::config::ConfigEncoding;
use kv_proxy::error::AgentError;
use kv_proxy::proxy::ProxyKey;
use kv_proxy::{Behavior, KvPairs};
use serde_json::json;

mod common;

use common::{agent_with, mirrors, MockListener};

fn document_agent(threads: usize) -> (std::sync::Arc<kv_proxy::ProxyMain>, std::sync::Arc<MockListener>) {
    let behavior = Behavior {
        port_listen: 11211,
        ..Behavior::default()
    };
    agent_with(threads, ConfigEncoding::Document, behavior)
}

fn bucket(name: &str, servers: &[&str]) -> serde_json::Value {
    json!({
        "name": name,
        "nodes": [],
        "vBucketServerMap": {
            "hashAlgorithm": "CRC",
            "serverList": servers,
        }
    })
}

#[test]
fn test_default_bucket_first() {
    let (main, listener) = document_agent(3);

    let mut default = bucket(DEFAULT_BUCKET, &["10.0.0.2:11210", "10.0.0.3:11210"]);
    default["vBucketServerMap"]["user"] = json!("usr1");
    default["vBucketServerMap"]["password"] = json!("pwd1");

    let doc = json!({
        "buckets": [
            bucket("b1", &["10.0.0.1:11210"]),
            default,
            bucket("bad", &["no-port-here"]),
            {"name": "broken"},
        ]
    });

    let report = main
        .apply_config(&KvPairs::from_document(doc.to_string()))
        .unwrap();
    assert_eq!(report.started, 2);
    assert_eq!(report.failed, 2);

    assert_eq!(
        listener.listens(),
        vec![
            ProxyKey::new(DEFAULT_BUCKET, 11211),
            ProxyKey::new("b1", 11211),
        ]
    );

    // A bad bucket is skipped without counting against the update.
    let stats = main.stats().snapshot();
    assert_eq!(stats.config_fails, 0);
    assert_eq!(stats.pool_fails, 0);

    let state = main.find(DEFAULT_BUCKET, 11211).unwrap().snapshot();
    assert_eq!(state.behavior_pool.len(), 2);
    assert_eq!(state.behavior_pool.base.username, "usr1");
    assert_eq!(state.behavior_pool.entries[1].password, "pwd1");

    let raw: serde_json::Value = serde_json::from_str(state.raw_config.as_deref().unwrap()).unwrap();
    assert_eq!(raw["name"], DEFAULT_BUCKET);

    for mirror in mirrors(&main, &ProxyKey::new("b1", 11211)) {
        assert_eq!(mirror.unwrap().servers, 1);
    }

    main.workers().shutdown();
}

#[test]
fn test_single_bucket_document() {
    let (main, _) = document_agent(2);

    let doc = json!({"vBucketServerMap": {"serverList": ["10.0.0.1:11210"]}});
    let report = main
        .apply_config(&KvPairs::from_document(doc.to_string()))
        .unwrap();
    assert_eq!(report.started, 1);

    let proxy = main.find(DEFAULT_BUCKET, 11211).unwrap();
    assert_eq!(
        proxy.snapshot().behavior_pool.connection_string(),
        "10.0.0.1:11210"
    );

    main.workers().shutdown();
}

#[test]
fn test_removed_bucket_retired() {
    let (main, _) = document_agent(2);

    let both = json!({"buckets": [bucket("default", &["h:1"]), bucket("b1", &["h:2"])]});
    main.apply_config(&KvPairs::from_document(both.to_string())).unwrap();

    let one = json!({"buckets": [bucket("default", &["h:1"])]});
    let report = main
        .apply_config(&KvPairs::from_document(one.to_string()))
        .unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.retired, 1);
    assert!(main.find("b1", 11211).unwrap().is_tombstone());
    assert_eq!(main.stats().snapshot().proxy_shutdowns, 1);

    main.workers().shutdown();
}

#[test]
fn test_unparseable_document_rejected() {
    let (main, listener) = document_agent(2);

    let err = main
        .apply_config(&KvPairs::from_document("{\"buckets\": ["))
        .unwrap_err();
    assert!(matches!(err, AgentError::BadDocument(_)));

    let err = main.apply_config(&KvPairs::new()).unwrap_err();
    assert!(matches!(err, AgentError::MissingContents));

    assert_eq!(main.stats().snapshot().config_fails, 2);
    assert!(listener.listens().is_empty());

    main.workers().shutdown();
}

#[test]
fn test_bucket_without_servers_skipped() {
    let (main, listener) = document_agent(2);

    let doc = json!({"buckets": [bucket("empty", &[])]});
    let report = main
        .apply_config(&KvPairs::from_document(doc.to_string()))
        .unwrap();
    assert_eq!(report.skipped, 1);
    assert!(listener.listens().is_empty());

    main.workers().shutdown();
}
