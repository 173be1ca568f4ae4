//! The per-connection tuning record.

use serde::{Deserialize, Serialize};

/// Capacity of the host field, including the terminator slot.
pub const HOST_CAPACITY: usize = 300;
/// Capacity of the username field.
pub const USERNAME_CAPACITY: usize = 250;
/// Capacity of the password field.
pub const PASSWORD_CAPACITY: usize = 900;
/// Capacity of the bucket field.
pub const BUCKET_CAPACITY: usize = 250;
/// Capacity of every matcher spec field.
pub const SPEC_CAPACITY: usize = 300;

/// Tuning parameters for one backend connection.
///
/// Timeouts and lifespans are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    // Identity.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub bucket: String,

    // Operational.
    pub downstream_weight: u32,
    pub downstream_max: u32,
    pub downstream_conn_max: u32,
    pub downstream_timeout: u64,
    pub wait_queue_timeout: u64,
    pub connect_timeout: u64,
    pub port_listen: u16,

    // Cache control.
    pub front_cache_max: u32,
    pub front_cache_lifespan: u64,
    pub front_cache_spec: String,
    pub front_cache_unspec: String,
    pub key_stats_max: u32,
    pub key_stats_lifespan: u64,
    pub key_stats_spec: String,
    pub key_stats_unspec: String,
    pub optimize_set: String,
}

impl Behavior {
    /// Apply one `key=value` property line.
    ///
    /// Returns false when the line has no `=` or names an unknown key; the
    /// behavior is left untouched in that case.
    pub fn apply_key_val(&mut self, line: &str) -> bool {
        let Some((key, val)) = line.split_once('=') else {
            return false;
        };
        let key = key.trim();
        let val = val.trim();

        match key {
            "host" => self.host = bounded(val, HOST_CAPACITY),
            "port" => self.port = number(key, val),
            "usr" | "username" => self.username = bounded(val, USERNAME_CAPACITY),
            "pwd" | "password" => self.password = bounded(val, PASSWORD_CAPACITY),
            "bucket" => self.bucket = bounded(val, BUCKET_CAPACITY),
            "weight" | "downstream_weight" => self.downstream_weight = number(key, val),
            "downstream_max" => self.downstream_max = number(key, val),
            "downstream_conn_max" => self.downstream_conn_max = number(key, val),
            "downstream_timeout" => self.downstream_timeout = number(key, val),
            "wait_queue_timeout" => self.wait_queue_timeout = number(key, val),
            "connect_timeout" => self.connect_timeout = number(key, val),
            "port_listen" => self.port_listen = number(key, val),
            "front_cache_max" => self.front_cache_max = number(key, val),
            "front_cache_lifespan" => self.front_cache_lifespan = number(key, val),
            "front_cache_spec" => self.front_cache_spec = bounded(val, SPEC_CAPACITY),
            "front_cache_unspec" => self.front_cache_unspec = bounded(val, SPEC_CAPACITY),
            "key_stats_max" => self.key_stats_max = number(key, val),
            "key_stats_lifespan" => self.key_stats_lifespan = number(key, val),
            "key_stats_spec" => self.key_stats_spec = bounded(val, SPEC_CAPACITY),
            "key_stats_unspec" => self.key_stats_unspec = bounded(val, SPEC_CAPACITY),
            "optimize_set" => self.optimize_set = bounded(val, SPEC_CAPACITY),
            _ => {
                if !key.is_empty() && !key.starts_with('#') {
                    tracing::debug!(key = %key, "Unknown behavior key");
                }
                return false;
            }
        }
        true
    }

    /// Apply a sequence of property lines, in order.
    pub fn apply_all<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for line in lines {
            self.apply_key_val(line);
        }
    }

    /// Whether the response cache should run for this behavior.
    pub fn front_cache_enabled(&self) -> bool {
        self.front_cache_max > 0 && self.front_cache_lifespan > 0
    }

    /// Whether the per-key statistics cache should run for this behavior.
    pub fn key_stats_enabled(&self) -> bool {
        self.key_stats_max > 0 && self.key_stats_lifespan > 0
    }

    /// The `host:port[:weight]` token for this server, if host and port are set.
    pub fn server_token(&self) -> Option<String> {
        if self.host.is_empty() || self.port == 0 {
            return None;
        }
        let mut token = format!("{}:{}", self.host, self.port);
        if self.downstream_weight > 0 {
            token.push_str(&format!(":{}", self.downstream_weight));
        }
        Some(token)
    }
}

/// Truncate to `capacity - 1` bytes, on a char boundary.
fn bounded(val: &str, capacity: usize) -> String {
    let limit = capacity.saturating_sub(1);
    if val.len() <= limit {
        return val.to_string();
    }
    let mut end = limit;
    while !val.is_char_boundary(end) {
        end -= 1;
    }
    val[..end].to_string()
}

/// Numeric property values that fail to parse read as zero.
fn number<T>(key: &str, val: &str) -> T
where
    T: std::str::FromStr + Default,
{
    val.parse().unwrap_or_else(|_| {
        tracing::warn!(key = %key, value = %val, "Non-numeric behavior value, using 0");
        T::default()
    })
}
