//! Structured-document topology parsing.
//!
//! The document is either a single bucket or `{"buckets": [...]}`. Each
//! bucket carries its servers under `vBucketServerMap`:
//!
//! ```text
//! {"name": "default",
//!  "vBucketServerMap": {
//!     "user": "optionalUsr",
//!     "password": "optionalPwd",
//!     "serverList": ["10.17.1.46:11212", ...]}}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::agent::ingest::PassReport;
use crate::agent::kvs::KvPairs;
use crate::behavior::{Behavior, BehaviorPool};
use crate::error::AgentError;
use crate::proxy::{PoolOutcome, ProxyMain};

/// Bucket name processed ahead of every other bucket.
pub const DEFAULT_BUCKET: &str = "default";

#[derive(Debug, Deserialize)]
struct BucketDocument {
    #[serde(rename = "vBucketServerMap")]
    server_map: ServerMap,
}

#[derive(Debug, Deserialize)]
struct ServerMap {
    #[serde(rename = "serverList", default)]
    server_list: Vec<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Reconcile every bucket in a document update.
pub(crate) fn on_config_document(
    main: &ProxyMain,
    kvs: &KvPairs,
    report: &mut PassReport,
) -> Result<(), AgentError> {
    let text = kvs
        .first_value("contents")
        .map(str::trim)
        .ok_or(AgentError::MissingContents)?;
    let doc: Value = serde_json::from_str(text)?;

    let Some(buckets) = doc.get("buckets").and_then(Value::as_array) else {
        let result = on_config_bucket(main, report.version, text, &doc, DEFAULT_BUCKET);
        report.record(DEFAULT_BUCKET, result);
        return Ok(());
    };

    // The default bucket is created before any other.
    for want_default in [true, false] {
        for bucket in buckets.iter().filter(|b| b.is_object()) {
            let name = bucket
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_BUCKET);
            if (name == DEFAULT_BUCKET) != want_default {
                continue;
            }

            let raw_config = serde_json::to_string(bucket)?;
            let result = on_config_bucket(main, report.version, &raw_config, bucket, name);
            report.record(name, result);
        }
    }

    Ok(())
}

/// Reconcile one bucket. `Ok(None)` means the bucket was skipped.
fn on_config_bucket(
    main: &ProxyMain,
    version: u32,
    raw_config: &str,
    bucket: &Value,
    name: &str,
) -> Result<Option<PoolOutcome>, AgentError> {
    let bad = |reason: String| AgentError::BadServerDocument {
        bucket: name.to_string(),
        reason,
    };

    let doc = BucketDocument::deserialize(bucket).map_err(|e| bad(e.to_string()))?;
    let base = main.behavior();
    let port = base.port_listen;

    if port == 0 || doc.server_map.server_list.is_empty() {
        tracing::debug!(bucket = %name, port, "Bucket has no listen port or servers");
        return Ok(None);
    }

    let behavior_pool = bucket_pool(base, &doc.server_map).map_err(bad)?;
    main.on_config_pool(name, port, Some(raw_config), version, &behavior_pool)
        .map(Some)
}

fn bucket_pool(mut base: Behavior, map: &ServerMap) -> Result<BehaviorPool, String> {
    // A password without a user is ignored.
    if let Some(user) = &map.user {
        base.apply_key_val(&format!("usr={}", user));
        if let Some(password) = &map.password {
            base.apply_key_val(&format!("pwd={}", password));
        }
    }

    let mut pool = BehaviorPool::empty(base);
    for host_port in &map.server_list {
        let (host, port) = split_host_port(host_port)
            .ok_or_else(|| format!("bad host:port {:?}", host_port))?;
        let entry = pool.push_inherited();
        entry.apply_key_val(&format!("host={}", host));
        entry.port = port;
    }
    Ok(pool)
}

fn split_host_port(s: &str) -> Option<(&str, u16)> {
    let (host, port) = s.trim().split_once(':')?;
    let port: u16 = port.parse().ok()?;
    (!host.is_empty() && port > 0).then_some((host, port))
}
